//! Pricing abstractions and core types

use crate::core::error::PortfolioError;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum HistoricalPeriod {
    OneDay,
    OneWeek,
    OneMonth,
    OneYear,
}

impl Display for HistoricalPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                HistoricalPeriod::OneDay => "1D",
                HistoricalPeriod::OneWeek => "1W",
                HistoricalPeriod::OneMonth => "1M",
                HistoricalPeriod::OneYear => "1Y",
            }
        )
    }
}

impl HistoricalPeriod {
    pub const ALL: [HistoricalPeriod; 4] = [
        HistoricalPeriod::OneDay,
        HistoricalPeriod::OneWeek,
        HistoricalPeriod::OneMonth,
        HistoricalPeriod::OneYear,
    ];

    pub fn to_duration(&self) -> Duration {
        match self {
            HistoricalPeriod::OneDay => Duration::days(1),
            HistoricalPeriod::OneWeek => Duration::days(7),
            HistoricalPeriod::OneMonth => Duration::days(30),
            HistoricalPeriod::OneYear => Duration::days(365),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HistoricalPeriod::OneDay => "1 Day",
            HistoricalPeriod::OneWeek => "1 Week",
            HistoricalPeriod::OneMonth => "1 Month",
            HistoricalPeriod::OneYear => "1 Year",
        }
    }
}

impl FromStr for HistoricalPeriod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "1D" => Ok(HistoricalPeriod::OneDay),
            "1W" => Ok(HistoricalPeriod::OneWeek),
            "1M" => Ok(HistoricalPeriod::OneMonth),
            "1Y" => Ok(HistoricalPeriod::OneYear),
            _ => Err(anyhow::anyhow!("Invalid historical period: {}", s)),
        }
    }
}

/// Raw answer of a market data provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceResult {
    pub price: f64,
    /// Closing price one period back from the latest bar.
    pub historical_prices: HashMap<HistoricalPeriod, f64>,
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    async fn fetch_price(&self, symbol: &str) -> Result<PriceResult>;
}

/// Price used for one entry of a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuote {
    pub ticker: String,
    pub price: Decimal,
    pub is_live: bool,
    pub fetched_at: DateTime<Utc>,
    pub reference_prices: HashMap<HistoricalPeriod, Decimal>,
}

impl PriceQuote {
    pub fn fallback(ticker: &str, default_price: Decimal) -> Self {
        PriceQuote {
            ticker: ticker.to_string(),
            price: default_price,
            is_live: false,
            fetched_at: Utc::now(),
            reference_prices: HashMap::new(),
        }
    }

    pub fn previous_close(&self) -> Option<Decimal> {
        self.reference_prices.get(&HistoricalPeriod::OneDay).copied()
    }
}

/// Result of pricing a single entry.
#[derive(Debug, Clone, PartialEq)]
pub enum QuoteOutcome {
    Live(PriceQuote),
    /// The provider could not be used; the quote carries the default price.
    Fallback {
        quote: PriceQuote,
        reason: PortfolioError,
    },
    /// Entry has a fixed value and is never sent to the provider.
    Fixed(PriceQuote),
}

impl QuoteOutcome {
    pub fn quote(&self) -> &PriceQuote {
        match self {
            QuoteOutcome::Live(quote)
            | QuoteOutcome::Fixed(quote)
            | QuoteOutcome::Fallback { quote, .. } => quote,
        }
    }

    pub fn into_parts(self) -> (PriceQuote, Option<PortfolioError>) {
        match self {
            QuoteOutcome::Live(quote) | QuoteOutcome::Fixed(quote) => (quote, None),
            QuoteOutcome::Fallback { quote, reason } => (quote, Some(reason)),
        }
    }
}
