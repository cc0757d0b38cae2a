//! Precious-metal bars and the FX cross, both from a chart time-series
//! endpoint.
//!
//! Metals trade in USD per troy ounce on fixed futures tickers; the oracle
//! converts to display-currency-per-gram. The FX rate rides the same chart
//! API and is cached for an hour.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::cache::{FX_TTL, QUOTE_TTL, TtlCache};
use crate::currency_provider::CurrencyRateProvider;

/// Grams per troy ounce, for USD/oz to local/gram conversion.
pub const TROY_OUNCE_GRAMS: f64 = 31.1035;

/// Maps a held metal symbol to its futures ticker.
pub fn metal_ticker(symbol: &str) -> Option<&'static str> {
    match symbol.to_uppercase().as_str() {
        "GOLD" => Some("GC=F"),
        "SILVER" => Some("SI=F"),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Vec<ChartItem>,
}

#[derive(Debug, Deserialize)]
struct ChartItem {
    meta: ChartMeta,
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
}

async fn fetch_chart(base_url: &str, symbol: &str, range: &str) -> Result<ChartItem> {
    let url = format!(
        "{base_url}/v8/finance/chart/{symbol}?interval=1m&range={range}"
    );
    debug!("Requesting chart data from {}", url);

    let client = reqwest::Client::builder()
        .user_agent("kakeibo/0.1")
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

    let data = response.json::<ChartResponse>().await?;
    data.chart
        .result
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("No chart data found for symbol: {}", symbol))
}

/// Last filled close among the item's minute bars.
fn last_filled_close(item: &ChartItem) -> Option<f64> {
    item.indicators
        .as_ref()
        .and_then(|inds| inds.quote.first())
        .and_then(|q| q.close.as_ref())
        .and_then(|closes| closes.iter().rev().find_map(|c| *c))
}

pub struct MetalChartProvider {
    base_url: String,
    cache: TtlCache<String, f64>,
}

impl MetalChartProvider {
    pub fn new(base_url: &str) -> Self {
        MetalChartProvider {
            base_url: base_url.to_string(),
            cache: TtlCache::new(QUOTE_TTL),
        }
    }

    /// USD per troy ounce from the most recent filled minute bar.
    #[instrument(name = "MetalBarFetch", skip(self))]
    pub async fn fetch_usd_per_ounce(&self, ticker: &str) -> Result<f64> {
        if let Some(cached) = self.cache.get(&ticker.to_string()).await {
            return Ok(cached);
        }

        let item = fetch_chart(&self.base_url, ticker, "1d").await?;
        let price = last_filled_close(&item)
            .or(item.meta.regular_market_price)
            .ok_or_else(|| anyhow!("No filled bars for ticker: {}", ticker))?;

        self.cache.put(ticker.to_string(), price).await;
        Ok(price)
    }
}

pub struct ChartCurrencyProvider {
    base_url: String,
    cache: TtlCache<String, f64>,
}

impl ChartCurrencyProvider {
    pub fn new(base_url: &str) -> Self {
        ChartCurrencyProvider {
            base_url: base_url.to_string(),
            cache: TtlCache::new(FX_TTL),
        }
    }
}

#[async_trait]
impl CurrencyRateProvider for ChartCurrencyProvider {
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64> {
        let symbol = format!("{from}{to}=X");
        if let Some(cached) = self.cache.get(&symbol).await {
            return Ok(cached);
        }

        let item = fetch_chart(&self.base_url, &symbol, "1d").await?;
        let rate = item
            .meta
            .regular_market_price
            .or_else(|| last_filled_close(&item))
            .ok_or_else(|| anyhow!("No rate data found for currency pair: {}", symbol))?;

        self.cache.put(symbol, rate).await;
        Ok(rate)
    }
}
