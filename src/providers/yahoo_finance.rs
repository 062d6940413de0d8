use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::core::price::{HistoricalPeriod, PriceProvider, PriceResult};

fn find_closest_price(target_ts: i64, timestamps: &[i64], prices: &[Option<f64>]) -> Option<f64> {
    timestamps
        .iter()
        .position(|ts| *ts >= target_ts)
        .and_then(|index| prices.get(index).and_then(|p| *p))
}

/// Closing prices one day, week, month and year before the latest bar.
fn extract_reference_prices(chart_item: &PriceChartItem) -> HashMap<HistoricalPeriod, f64> {
    let mut reference_prices = HashMap::new();

    if let (Some(timestamps), Some(closes)) = (
        chart_item.timestamp.as_ref(),
        chart_item
            .indicators
            .as_ref()
            .and_then(|inds| inds.quote.first())
            .and_then(|q| q.close.as_ref()),
    ) {
        let reference_date = match timestamps
            .last()
            .and_then(|ts| Utc.timestamp_opt(*ts, 0).single())
        {
            Some(dt) => dt,
            None => return reference_prices,
        };

        for period in HistoricalPeriod::ALL {
            let price = if period == HistoricalPeriod::OneDay {
                // Previous session's close
                closes
                    .len()
                    .checked_sub(2)
                    .and_then(|i| closes[i])
                    .or(chart_item.meta.previous_close)
            } else {
                let target_date = reference_date - period.to_duration();
                find_closest_price(target_date.timestamp(), timestamps, closes)
            };

            if let Some(price) = price.filter(|p| *p > 0.0) {
                reference_prices.insert(period, price);
            }
        }
    } else if let Some(prev_close) = chart_item.meta.previous_close {
        // Handle case where we only have meta data (no historical bars)
        if prev_close > 0.0 {
            reference_prices.insert(HistoricalPeriod::OneDay, prev_close);
        }
    }

    reference_prices
}

pub struct YahooFinanceProvider {
    base_url: String,
}

impl YahooFinanceProvider {
    pub fn new(base_url: &str) -> Self {
        YahooFinanceProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Deserialize, Debug)]
struct YahooPriceResponse {
    chart: PriceChartResult,
}

#[derive(Deserialize, Debug)]
struct PriceChartResult {
    result: Option<Vec<PriceChartItem>>,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Deserialize, Debug)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
}

#[derive(Deserialize, Debug)]
struct PriceChartItem {
    meta: PriceChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug)]
struct PriceChartMeta {
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: Option<f64>,
    #[serde(alias = "chartPreviousClose")]
    previous_close: Option<f64>,
}

#[async_trait]
impl PriceProvider for YahooFinanceProvider {
    #[instrument(
        name = "YahooPriceFetch",
        skip(self),
        fields(symbol = %symbol)
    )]
    async fn fetch_price(&self, symbol: &str) -> Result<PriceResult> {
        let url = format!(
            "{}/v8/finance/chart/{}?interval=1d&range=1y",
            self.base_url, symbol
        );
        debug!("Requesting price data from {}", url);

        let client = reqwest::Client::builder()
            .user_agent("sharefolio/1.0")
            .build()?;
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for symbol: {}", e, symbol))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for symbol: {}",
                response.status(),
                symbol
            ));
        }

        let text = response.text().await?;
        let data: YahooPriceResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", symbol, e))?;

        let item = data
            .chart
            .result
            .as_ref()
            .and_then(|items| items.first())
            .ok_or_else(|| anyhow!("No price data found for symbol: {}", symbol))?;

        let price = item
            .meta
            .regular_market_price
            .ok_or_else(|| anyhow!("No market price for symbol: {}", symbol))?;

        Ok(PriceResult {
            price,
            historical_prices: extract_reference_prices(item),
        })
    }
}
