//! Snapshot pricing with default-price fallback and a freshness window.

use crate::core::cache::{CacheState, TimedSlot};
use crate::core::error::PortfolioError;
use crate::core::price::{PriceProvider, PriceQuote, PriceResult, QuoteOutcome};
use crate::core::registry::{Registry, StockEntry};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_FRESHNESS: Duration = Duration::from_secs(300);
pub const DEFAULT_PACING: Duration = Duration::from_millis(100);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Timing constants of a refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingPolicy {
    /// How long a snapshot is served from cache.
    pub freshness: Duration,
    /// Delay between consecutive provider calls.
    pub pacing: Duration,
    /// Upper bound on a single provider call.
    pub request_timeout: Duration,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        PricingPolicy {
            freshness: DEFAULT_FRESHNESS,
            pacing: DEFAULT_PACING,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEntry {
    pub stock: StockEntry,
    pub quote: PriceQuote,
    pub value: Decimal,
    /// Why the default price was used, if the provider failed.
    pub fallback: Option<PortfolioError>,
}

/// Point-in-time valuation of every registry entry.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioSnapshot {
    pub entries: Vec<SnapshotEntry>,
    pub total_value: Decimal,
    pub fetched_at: DateTime<Utc>,
}

impl PortfolioSnapshot {
    pub fn new(entries: Vec<SnapshotEntry>, fetched_at: DateTime<Utc>) -> Self {
        let total_value = entries
            .iter()
            .fold(Decimal::ZERO, |acc, e| acc.saturating_add(e.value));
        PortfolioSnapshot {
            entries,
            total_value,
            fetched_at,
        }
    }

    /// Tickers that fell back to their default price.
    pub fn failed_tickers(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.fallback.is_some())
            .map(|e| e.stock.ticker.as_str())
            .collect()
    }

    pub fn live_count(&self) -> usize {
        self.entries.iter().filter(|e| e.quote.is_live).count()
    }

    pub fn market_priced_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.stock.is_market_priced())
            .count()
    }
}

pub struct PortfolioEngine {
    registry: Arc<Registry>,
    provider: Arc<dyn PriceProvider>,
    policy: PricingPolicy,
    cache: TimedSlot<Arc<PortfolioSnapshot>>,
}

impl PortfolioEngine {
    pub fn new(
        registry: Arc<Registry>,
        provider: Arc<dyn PriceProvider>,
        policy: PricingPolicy,
    ) -> Self {
        Self {
            registry,
            provider,
            cache: TimedSlot::new(policy.freshness),
            policy,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn policy(&self) -> PricingPolicy {
        self.policy
    }

    /// Prices a single registry entry. Only an unknown ticker is an error; every provider
    /// failure degrades to the entry's default price.
    pub async fn get_price(&self, ticker: &str) -> Result<QuoteOutcome, PortfolioError> {
        let entry = self.registry.find_stock(ticker)?;
        Ok(self.quote_entry(entry).await)
    }

    async fn quote_entry(&self, entry: &StockEntry) -> QuoteOutcome {
        if !entry.is_market_priced() {
            return QuoteOutcome::Fixed(PriceQuote::fallback(&entry.ticker, entry.price));
        }

        let timeout = self.policy.request_timeout;
        let fetched =
            tokio::time::timeout(timeout, self.provider.fetch_price(&entry.ticker)).await;
        let result = match fetched {
            Err(_) => Err(PortfolioError::ProviderTimeout {
                ticker: entry.ticker.clone(),
                timeout,
            }),
            Ok(Err(e)) => Err(PortfolioError::ProviderError {
                ticker: entry.ticker.clone(),
                message: format!("{e:#}"),
            }),
            Ok(Ok(price_result)) => live_quote(entry, &price_result),
        };

        match result {
            Ok(quote) => {
                debug!(ticker = %entry.ticker, price = %quote.price, "Live quote");
                QuoteOutcome::Live(quote)
            }
            Err(reason) => {
                warn!(ticker = %entry.ticker, %reason, "Using default price");
                QuoteOutcome::Fallback {
                    quote: PriceQuote::fallback(&entry.ticker, entry.price),
                    reason,
                }
            }
        }
    }

    pub async fn refresh_snapshot(&self, force: bool) -> Arc<PortfolioSnapshot> {
        self.refresh_snapshot_with_progress(force, &|_| {}).await
    }

    /// Like [`Self::refresh_snapshot`], calling `on_fetch` with each ticker once its provider call
    /// has completed.
    #[instrument(name = "SnapshotRefresh", skip(self, on_fetch))]
    pub async fn refresh_snapshot_with_progress(
        &self,
        force: bool,
        on_fetch: &(dyn Fn(&str) + Sync),
    ) -> Arc<PortfolioSnapshot> {
        // The guard is held for the whole cycle so concurrent refreshes run one after another.
        let mut slot = self.cache.lock().await;
        if !force {
            if let Some(snapshot) = slot.fresh() {
                debug!(fetched_at = %snapshot.fetched_at, "Serving cached snapshot");
                return snapshot;
            }
        }

        info!(state = ?slot.state(), "Fetching prices");
        let snapshot = Arc::new(self.fetch_cycle(on_fetch).await);
        slot.put(Arc::clone(&snapshot));

        info!(
            total = %snapshot.total_value,
            live = snapshot.live_count(),
            priced = snapshot.market_priced_count(),
            "Snapshot refreshed"
        );
        snapshot
    }

    async fn fetch_cycle(&self, on_fetch: &(dyn Fn(&str) + Sync)) -> PortfolioSnapshot {
        let stocks = self.registry.list_stocks();
        let mut entries = Vec::with_capacity(stocks.len());
        let mut first_call = true;

        for stock in stocks {
            let market_priced = stock.is_market_priced();
            if market_priced {
                if !first_call && !self.policy.pacing.is_zero() {
                    tokio::time::sleep(self.policy.pacing).await;
                }
                first_call = false;
            }

            let (quote, fallback) = self.quote_entry(stock).await.into_parts();
            if market_priced {
                on_fetch(&stock.ticker);
            }

            // Live prices are checked against the position, defaults when the registry is built.
            let value = stock.value_at(quote.price).unwrap_or_default();
            entries.push(SnapshotEntry {
                stock: stock.clone(),
                quote,
                value,
                fallback,
            });
        }

        PortfolioSnapshot::new(entries, Utc::now())
    }

    pub async fn cache_state(&self) -> CacheState {
        self.cache.state().await
    }

    /// Drops the cached snapshot so the next refresh fetches again.
    pub async fn invalidate(&self) {
        self.cache.clear().await;
    }
}

/// `None` for prices that are not finite or not positive once converted.
fn positive_decimal(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_f64(value).filter(|d| *d > Decimal::ZERO)
}

fn live_quote(entry: &StockEntry, result: &PriceResult) -> Result<PriceQuote, PortfolioError> {
    let ticker = &entry.ticker;
    let invalid = || PortfolioError::InvalidQuote {
        ticker: ticker.to_string(),
        price: result.price,
    };
    let price = positive_decimal(result.price).ok_or_else(invalid)?;
    entry.value_at(price).ok_or_else(invalid)?;

    let reference_prices = result
        .historical_prices
        .iter()
        .filter_map(|(period, p)| positive_decimal(*p).map(|d| (*period, d)))
        .collect();

    Ok(PriceQuote {
        ticker: ticker.to_string(),
        price,
        is_live: true,
        fetched_at: Utc::now(),
        reference_prices,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::price::HistoricalPeriod;
    use crate::core::registry::tests::{cash, stock, user};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;
    use tokio::time::sleep;

    #[derive(Clone, Copy)]
    pub(crate) enum Reply {
        Price(f64),
        Fail,
        Hang,
    }

    pub(crate) struct ScriptedProvider {
        replies: HashMap<String, Reply>,
        pub(crate) calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ScriptedProvider {
        pub(crate) fn new(replies: &[(&str, Reply)]) -> Arc<Self> {
            Arc::new(Self {
                replies: replies
                    .iter()
                    .map(|(t, r)| (t.to_string(), *r))
                    .collect(),
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PriceProvider for ScriptedProvider {
        async fn fetch_price(&self, symbol: &str) -> anyhow::Result<PriceResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let reply = self.replies.get(symbol).copied().unwrap_or(Reply::Fail);
            if let Reply::Hang = reply {
                sleep(Duration::from_secs(5)).await;
            }

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            sleep(Duration::from_millis(2)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match reply {
                Reply::Price(price) => Ok(PriceResult {
                    price,
                    historical_prices: HashMap::from([(HistoricalPeriod::OneDay, price - 1.0)]),
                }),
                _ => Err(anyhow!("Request error for symbol: {}", symbol)),
            }
        }
    }

    pub(crate) fn fast_policy() -> PricingPolicy {
        PricingPolicy {
            freshness: Duration::from_secs(60),
            pacing: Duration::ZERO,
            request_timeout: Duration::from_millis(200),
        }
    }

    fn engine_with(
        stocks: Vec<StockEntry>,
        provider: &Arc<ScriptedProvider>,
        policy: PricingPolicy,
    ) -> PortfolioEngine {
        let registry = Registry::new(stocks, vec![user("alice", Decimal::ONE_HUNDRED)]).unwrap();
        PortfolioEngine::new(
            Arc::new(registry),
            Arc::clone(provider) as Arc<dyn PriceProvider>,
            policy,
        )
    }

    #[tokio::test]
    async fn test_live_price_is_used() {
        let provider = ScriptedProvider::new(&[("C", Reply::Price(55.0))]);
        let engine = engine_with(vec![stock("C", 50, 10)], &provider, fast_policy());

        let snapshot = engine.refresh_snapshot(false).await;

        let entry = &snapshot.entries[0];
        assert!(entry.quote.is_live);
        assert_eq!(entry.quote.price, Decimal::from(55));
        assert_eq!(entry.value, Decimal::from(550));
        assert_eq!(entry.quote.previous_close(), Some(Decimal::from(54)));
        assert!(entry.fallback.is_none());
        assert_eq!(snapshot.total_value, Decimal::from(550));
    }

    #[tokio::test]
    async fn test_provider_error_falls_back_to_default() {
        let provider = ScriptedProvider::new(&[("C", Reply::Fail)]);
        let engine = engine_with(vec![stock("C", 50, 10)], &provider, fast_policy());

        let snapshot = engine.refresh_snapshot(false).await;

        let entry = &snapshot.entries[0];
        assert!(!entry.quote.is_live);
        assert_eq!(entry.quote.price, Decimal::from(50));
        assert_eq!(entry.value, Decimal::from(500));
        assert!(matches!(
            entry.fallback,
            Some(PortfolioError::ProviderError { .. })
        ));
        assert_eq!(snapshot.total_value, Decimal::from(500));
        assert_eq!(snapshot.failed_tickers(), vec!["C"]);
    }

    #[tokio::test]
    async fn test_timeout_falls_back_to_default() {
        let provider = ScriptedProvider::new(&[("C", Reply::Hang)]);
        let policy = PricingPolicy {
            request_timeout: Duration::from_millis(20),
            ..fast_policy()
        };
        let engine = engine_with(vec![stock("C", 50, 10)], &provider, policy);

        let outcome = engine.get_price("C").await.unwrap();

        match outcome {
            QuoteOutcome::Fallback { quote, reason } => {
                assert_eq!(quote.price, Decimal::from(50));
                assert!(!quote.is_live);
                assert!(matches!(reason, PortfolioError::ProviderTimeout { .. }));
            }
            other => panic!("Expected a fallback quote, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unusable_prices_fall_back() {
        for bad in [0.0, -3.5, 1e-30, f64::NAN, f64::INFINITY] {
            let provider = ScriptedProvider::new(&[("C", Reply::Price(bad))]);
            let engine = engine_with(vec![stock("C", 50, 10)], &provider, fast_policy());

            let (quote, reason) = engine.get_price("C").await.unwrap().into_parts();
            assert_eq!(quote.price, Decimal::from(50));
            assert!(!quote.is_live);
            assert!(matches!(reason, Some(PortfolioError::InvalidQuote { .. })));
        }
    }

    #[tokio::test]
    async fn test_out_of_range_value_falls_back_without_aborting_refresh() {
        let provider = ScriptedProvider::new(&[("C", Reply::Price(1e25)), ("D", Reply::Price(55.0))]);
        let engine = engine_with(
            vec![stock("C", 50, 100_000), stock("D", 50, 10)],
            &provider,
            fast_policy(),
        );

        let snapshot = engine.refresh_snapshot(false).await;

        let c = &snapshot.entries[0];
        assert!(!c.quote.is_live);
        assert_eq!(c.value, Decimal::from(5_000_000));
        assert!(matches!(c.fallback, Some(PortfolioError::InvalidQuote { .. })));

        let d = &snapshot.entries[1];
        assert!(d.quote.is_live);
        assert_eq!(d.value, Decimal::from(550));
        assert_eq!(snapshot.total_value, Decimal::from(5_000_550));
    }

    #[tokio::test]
    async fn test_get_price_lookups() {
        let provider = ScriptedProvider::new(&[]);
        let engine = engine_with(vec![cash(1000)], &provider, fast_policy());

        assert_eq!(
            engine.get_price("GS").await.unwrap_err(),
            PortfolioError::TickerNotInRegistry("GS".to_string())
        );

        let outcome = engine.get_price("CASH").await.unwrap();
        assert!(matches!(outcome, QuoteOutcome::Fixed(_)));
        assert_eq!(outcome.quote().price, Decimal::ONE);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_single_failure_does_not_abort_refresh() {
        let provider = ScriptedProvider::new(&[("C", Reply::Price(55.0)), ("BP", Reply::Fail)]);
        let engine = engine_with(
            vec![stock("C", 50, 10), stock("BP", 4, 100), cash(1000)],
            &provider,
            fast_policy(),
        );

        let snapshot = engine.refresh_snapshot(false).await;

        assert_eq!(snapshot.entries.len(), 3);
        assert_eq!(snapshot.total_value, Decimal::from(550 + 400 + 1000));
        assert_eq!(snapshot.failed_tickers(), vec!["BP"]);
        assert_eq!(snapshot.live_count(), 1);
        assert_eq!(snapshot.market_priced_count(), 2);
        // Cash is never sent to the provider
        assert_eq!(provider.calls(), 2);
        assert_eq!(engine.cache_state().await, CacheState::Fresh);
    }

    #[tokio::test]
    async fn test_total_is_independent_of_order() {
        let replies = [("C", Reply::Price(55.0)), ("WFC", Reply::Price(70.5))];
        let forward = engine_with(
            vec![stock("C", 50, 10), stock("WFC", 70, 4), cash(250)],
            &ScriptedProvider::new(&replies),
            fast_policy(),
        );
        let backward = engine_with(
            vec![cash(250), stock("WFC", 70, 4), stock("C", 50, 10)],
            &ScriptedProvider::new(&replies),
            fast_policy(),
        );

        let a = forward.refresh_snapshot(false).await;
        let b = backward.refresh_snapshot(false).await;
        assert_eq!(a.total_value, b.total_value);
        assert_eq!(a.total_value, Decimal::from(1082));
    }

    #[tokio::test]
    async fn test_refresh_within_window_is_cached() {
        let provider = ScriptedProvider::new(&[("C", Reply::Price(55.0))]);
        let engine = engine_with(vec![stock("C", 50, 10)], &provider, fast_policy());
        assert_eq!(engine.cache_state().await, CacheState::Empty);

        let first = engine.refresh_snapshot(false).await;
        let second = engine.refresh_snapshot(false).await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.fetched_at, second.fetched_at);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_refresh_after_window_fetches_again() {
        let provider = ScriptedProvider::new(&[("C", Reply::Price(55.0))]);
        let policy = PricingPolicy {
            freshness: Duration::from_millis(30),
            ..fast_policy()
        };
        let engine = engine_with(vec![stock("C", 50, 10)], &provider, policy);

        let first = engine.refresh_snapshot(false).await;
        sleep(Duration::from_millis(60)).await;
        assert_eq!(engine.cache_state().await, CacheState::Stale);

        let second = engine.refresh_snapshot(false).await;
        assert_eq!(provider.calls(), 2);
        assert!(second.fetched_at > first.fetched_at);
        assert_eq!(engine.cache_state().await, CacheState::Fresh);
    }

    #[tokio::test]
    async fn test_forced_refresh_ignores_cache() {
        let provider = ScriptedProvider::new(&[("C", Reply::Price(55.0))]);
        let engine = engine_with(vec![stock("C", 50, 10)], &provider, fast_policy());

        let first = engine.refresh_snapshot(false).await;
        let forced = engine.refresh_snapshot(true).await;

        assert_eq!(provider.calls(), 2);
        assert!(!Arc::ptr_eq(&first, &forced));

        // The forced snapshot replaced the cached one
        let cached = engine.refresh_snapshot(false).await;
        assert!(Arc::ptr_eq(&forced, &cached));
    }

    #[tokio::test]
    async fn test_invalidate_empties_cache() {
        let provider = ScriptedProvider::new(&[("C", Reply::Price(55.0))]);
        let engine = engine_with(vec![stock("C", 50, 10)], &provider, fast_policy());

        engine.refresh_snapshot(false).await;
        engine.invalidate().await;
        assert_eq!(engine.cache_state().await, CacheState::Empty);

        engine.refresh_snapshot(false).await;
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_calls_are_paced() {
        let provider = ScriptedProvider::new(&[
            ("A", Reply::Price(1.0)),
            ("B", Reply::Price(2.0)),
            ("C", Reply::Price(3.0)),
        ]);
        let policy = PricingPolicy {
            pacing: Duration::from_millis(30),
            ..fast_policy()
        };
        let engine = engine_with(
            vec![stock("A", 1, 1), cash(5), stock("B", 1, 1), stock("C", 1, 1)],
            &provider,
            policy,
        );

        let fetched = std::sync::Mutex::new(Vec::new());
        let started = Instant::now();
        engine
            .refresh_snapshot_with_progress(false, &|ticker| {
                fetched.lock().unwrap().push(ticker.to_string())
            })
            .await;

        // Two gaps between three provider calls
        assert!(started.elapsed() >= Duration::from_millis(60));
        assert_eq!(*fetched.lock().unwrap(), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_progress_is_reported_after_each_call() {
        let provider = ScriptedProvider::new(&[("A", Reply::Price(1.0)), ("B", Reply::Fail)]);
        let engine = engine_with(
            vec![stock("A", 1, 1), cash(5), stock("B", 1, 1)],
            &provider,
            fast_policy(),
        );

        let completed = std::sync::Mutex::new(Vec::new());
        engine
            .refresh_snapshot_with_progress(false, &|ticker| {
                completed.lock().unwrap().push((ticker.to_string(), provider.calls()))
            })
            .await;

        assert_eq!(
            *completed.lock().unwrap(),
            vec![("A".to_string(), 1), ("B".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn test_concurrent_forced_refreshes_do_not_interleave() {
        let provider = ScriptedProvider::new(&[("A", Reply::Price(1.0)), ("B", Reply::Price(2.0))]);
        let engine = engine_with(vec![stock("A", 1, 1), stock("B", 1, 1)], &provider, fast_policy());

        let (first, second) = tokio::join!(engine.refresh_snapshot(true), engine.refresh_snapshot(true));

        assert_eq!(provider.calls(), 4);
        assert_eq!(provider.max_in_flight.load(Ordering::SeqCst), 1);
        assert!(!Arc::ptr_eq(&first, &second));
    }
}
