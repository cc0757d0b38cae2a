//! DEX aggregator lookup for meme tokens priced only by contract address.
//!
//! Takes the USD price of the first listed trading pair; conversion into the
//! display currency happens in the oracle with the shared FX rate.

use anyhow::{Result, anyhow};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::cache::{QUOTE_TTL, TtlCache};

pub struct DexScreenerProvider {
    base_url: String,
    cache: TtlCache<String, f64>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    pairs: Option<Vec<Pair>>,
}

#[derive(Debug, Deserialize)]
struct Pair {
    #[serde(rename = "priceUsd")]
    price_usd: Option<String>,
}

impl DexScreenerProvider {
    pub fn new(base_url: &str) -> Self {
        DexScreenerProvider {
            base_url: base_url.to_string(),
            cache: TtlCache::new(QUOTE_TTL),
        }
    }

    /// USD unit price for a token contract, from its first listed pair.
    #[instrument(name = "DexTokenFetch", skip(self))]
    pub async fn fetch_usd_price(&self, address: &str) -> Result<f64> {
        if let Some(cached) = self.cache.get(&address.to_string()).await {
            return Ok(cached);
        }

        let url = format!("{}/latest/dex/tokens/{}", self.base_url, address);
        debug!("Requesting token price from {}", url);

        let client = reqwest::Client::builder()
            .user_agent("kakeibo/0.1")
            .build()?;
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for contract: {}", e, address))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for contract: {}",
                response.status(),
                address
            ));
        }

        let data: TokenResponse = response.json().await?;
        let price = data
            .pairs
            .as_deref()
            .and_then(|pairs| pairs.first())
            .and_then(|pair| pair.price_usd.as_deref())
            .ok_or_else(|| anyhow!("No trading pair found for contract: {}", address))?
            .parse::<f64>()
            .map_err(|e| anyhow!("Unparseable pair price for {}: {}", address, e))?;

        self.cache.put(address.to_string(), price).await;
        Ok(price)
    }
}
