//! Best-effort price aggregation across the three upstream sources.
//!
//! The oracle never fails the caller: every upstream error degrades the
//! affected symbols to an `Unavailable` quote at price 0, so valuation can
//! only understate, never abort.

use futures::future::join_all;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::cache::QUOTE_TTL;
use crate::config::AppConfig;
use crate::currency_provider::CurrencyRateProvider;
use crate::quote::{Quote, QuoteSource};
use crate::providers::coingecko::CoinGeckoProvider;
use crate::providers::dexscreener::DexScreenerProvider;
use crate::providers::metals::{
    ChartCurrencyProvider, MetalChartProvider, TROY_OUNCE_GRAMS, metal_ticker,
};

/// USD rate applied when the FX source is down.
pub const FALLBACK_FX_RATE: f64 = 150.0;

pub struct PriceOracle {
    batch: CoinGeckoProvider,
    dex: DexScreenerProvider,
    metals: MetalChartProvider,
    fx: Box<dyn CurrencyRateProvider>,
    /// Uppercased symbol to DEX contract address.
    meme_contracts: HashMap<String, String>,
    currency: String,
}

impl PriceOracle {
    pub fn new(
        batch: CoinGeckoProvider,
        dex: DexScreenerProvider,
        metals: MetalChartProvider,
        fx: Box<dyn CurrencyRateProvider>,
        meme_contracts: HashMap<String, String>,
        currency: &str,
    ) -> Self {
        PriceOracle {
            batch,
            dex,
            metals,
            fx,
            meme_contracts: meme_contracts
                .into_iter()
                .map(|(k, v)| (k.to_uppercase(), v))
                .collect(),
            currency: currency.to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let gecko_url = config
            .providers
            .coingecko
            .as_ref()
            .map_or("https://api.coingecko.com", |p| &p.base_url);
        let dex_url = config
            .providers
            .dexscreener
            .as_ref()
            .map_or("https://api.dexscreener.com", |p| &p.base_url);
        let chart_url = config
            .providers
            .chart
            .as_ref()
            .map_or("https://query1.finance.yahoo.com", |p| &p.base_url);

        PriceOracle::new(
            CoinGeckoProvider::new(gecko_url, &config.currency, config.crypto_ids.clone()),
            DexScreenerProvider::new(dex_url),
            MetalChartProvider::new(chart_url),
            Box::new(ChartCurrencyProvider::new(chart_url)),
            config.meme_contracts.clone(),
            &config.currency,
        )
    }

    /// USD to display-currency rate, falling back to a constant when the FX
    /// source is unreachable.
    async fn usd_rate(&self) -> f64 {
        match self.fx.get_rate("USD", &self.currency).await {
            Ok(rate) => rate,
            Err(e) => {
                warn!("FX rate fetch failed, using fallback {}: {}", FALLBACK_FX_RATE, e);
                FALLBACK_FX_RATE
            }
        }
    }

    /// Resolves a best-effort quote for every requested symbol, keyed by the
    /// uppercased symbol.
    ///
    /// Symbols partition into metal (gold/silver), meme (listed in the
    /// contract table) and normal; normal symbols share one batch request,
    /// the rest fan out per symbol. Quotes sit in a cache for up to ten
    /// minutes (an hour for the FX leg) and are not invalidated by ledger
    /// writes.
    pub async fn fetch_quotes(&self, symbols: &[String]) -> HashMap<String, Quote> {
        let mut metal = Vec::new();
        let mut meme = Vec::new();
        let mut normal = Vec::new();
        for symbol in symbols {
            let key = symbol.to_uppercase();
            if metal.contains(&key) || meme.contains(&key) || normal.contains(&key) {
                continue;
            }
            if metal_ticker(&key).is_some() {
                metal.push(key);
            } else if self.meme_contracts.contains_key(&key) {
                meme.push(key);
            } else {
                normal.push(key);
            }
        }
        debug!(
            normal = normal.len(),
            meme = meme.len(),
            metal = metal.len(),
            ttl_secs = QUOTE_TTL.as_secs(),
            "Partitioned symbols for quote fetch"
        );

        let mut quotes = HashMap::new();

        if !normal.is_empty() {
            match self.batch.fetch_prices(&normal).await {
                Ok(prices) => {
                    for symbol in &normal {
                        let price = prices.get(symbol).copied().unwrap_or(0.0);
                        let quote = if price > 0.0 {
                            Quote::new(symbol, price, QuoteSource::Batch)
                        } else {
                            Quote::unavailable(symbol)
                        };
                        quotes.insert(symbol.clone(), quote);
                    }
                }
                Err(e) => {
                    warn!("Batch quote fetch failed: {}", e);
                    for symbol in &normal {
                        quotes.insert(symbol.clone(), Quote::unavailable(symbol));
                    }
                }
            }
        }

        if meme.is_empty() && metal.is_empty() {
            return quotes;
        }
        let rate = self.usd_rate().await;

        let meme_futures = meme.iter().map(|symbol| async move {
            let address = &self.meme_contracts[symbol];
            match self.dex.fetch_usd_price(address).await {
                Ok(usd) => Quote::new(symbol, usd * rate, QuoteSource::Dex),
                Err(e) => {
                    warn!("DEX quote failed for {}: {}", symbol, e);
                    Quote::unavailable(symbol)
                }
            }
        });
        for quote in join_all(meme_futures).await {
            quotes.insert(quote.symbol.clone(), quote);
        }

        let metal_futures = metal.iter().map(|symbol| async move {
            // metal_ticker() already vetted the symbol during partitioning.
            let ticker = metal_ticker(symbol).unwrap_or_default();
            match self.metals.fetch_usd_per_ounce(ticker).await {
                Ok(usd_per_ounce) => {
                    let per_gram = usd_per_ounce / TROY_OUNCE_GRAMS * rate;
                    Quote::new(symbol, per_gram, QuoteSource::Metal)
                }
                Err(e) => {
                    warn!("Metal quote failed for {}: {}", symbol, e);
                    Quote::unavailable(symbol)
                }
            }
        });
        for quote in join_all(metal_futures).await {
            quotes.insert(quote.symbol.clone(), quote);
        }

        quotes
    }
}
