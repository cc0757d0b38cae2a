//! Batch quote source for fungible crypto symbols.
//!
//! All requested symbols go out in a single round trip; a symbol absent from
//! the response prices at 0. Results are cached per symbol for ten minutes.

use anyhow::{Result, anyhow};
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::cache::{QUOTE_TTL, TtlCache};

pub struct CoinGeckoProvider {
    base_url: String,
    /// Lowercased quote currency, e.g. `jpy`.
    vs_currency: String,
    /// Uppercase ticker to coingecko id; unmapped tickers fall back to
    /// their lowercased form.
    ids: HashMap<String, String>,
    cache: TtlCache<String, f64>,
}

impl CoinGeckoProvider {
    pub fn new(base_url: &str, currency: &str, ids: HashMap<String, String>) -> Self {
        CoinGeckoProvider {
            base_url: base_url.to_string(),
            vs_currency: currency.to_lowercase(),
            ids: ids
                .into_iter()
                .map(|(k, v)| (k.to_uppercase(), v))
                .collect(),
            cache: TtlCache::new(QUOTE_TTL),
        }
    }

    fn id_for(&self, symbol: &str) -> String {
        self.ids
            .get(&symbol.to_uppercase())
            .cloned()
            .unwrap_or_else(|| symbol.to_lowercase())
    }

    /// Fetches quote-currency prices for `symbols`, keyed by the uppercased
    /// symbol. Cached symbols are served locally; the rest share one batch
    /// request. A symbol missing from the response maps to 0.
    #[instrument(name = "CoinGeckoBatchFetch", skip(self, symbols))]
    pub async fn fetch_prices(&self, symbols: &[String]) -> Result<HashMap<String, f64>> {
        let mut prices = HashMap::new();
        let mut misses = Vec::new();
        for symbol in symbols {
            let key = symbol.to_uppercase();
            match self.cache.get(&key).await {
                Some(price) => {
                    prices.insert(key, price);
                }
                None => misses.push(key),
            }
        }
        if misses.is_empty() {
            return Ok(prices);
        }

        let ids_param = misses
            .iter()
            .map(|s| self.id_for(s))
            .collect::<Vec<_>>()
            .join(",");
        let url = format!(
            "{}/api/v3/simple/price?ids={}&vs_currencies={}",
            self.base_url, ids_param, self.vs_currency
        );
        debug!("Requesting batch prices from {}", url);

        let client = reqwest::Client::builder()
            .user_agent("kakeibo/0.1")
            .build()?;
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for symbols: {}", e, misses.join(",")))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for symbols: {}",
                response.status(),
                misses.join(",")
            ));
        }

        let data: HashMap<String, HashMap<String, f64>> = response.json().await?;
        for symbol in misses {
            let id = self.id_for(&symbol);
            let price = data
                .get(&id)
                .and_then(|quotes| quotes.get(&self.vs_currency))
                .copied()
                .unwrap_or(0.0);
            self.cache.put(symbol.clone(), price).await;
            prices.insert(symbol, price);
        }
        Ok(prices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(uri: &str) -> CoinGeckoProvider {
        let ids = [("BTC".to_string(), "bitcoin".to_string())]
            .into_iter()
            .collect();
        CoinGeckoProvider::new(uri, "JPY", ids)
    }

    #[tokio::test]
    async fn test_batch_fetch_maps_ids_back_to_symbols() {
        let mock_server = MockServer::start().await;
        let mock_response = r#"{"bitcoin": {"jpy": 12000000.0}, "iostoken": {"jpy": 0.55}}"#;

        Mock::given(method("GET"))
            .and(path("/api/v3/simple/price"))
            .and(query_param("vs_currencies", "jpy"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server.uri());
        let prices = provider
            .fetch_prices(&["BTC".to_string(), "IOST".to_string()])
            .await
            .unwrap();

        assert_eq!(prices.get("BTC"), Some(&12000000.0));
        assert_eq!(prices.get("IOST"), Some(&0.55));
    }

    #[tokio::test]
    async fn test_symbol_absent_from_response_prices_at_zero() {
        let mock_server = MockServer::start().await;
        let mock_response = r#"{"bitcoin": {"jpy": 12000000.0}}"#;

        Mock::given(method("GET"))
            .and(path("/api/v3/simple/price"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server.uri());
        let prices = provider
            .fetch_prices(&["BTC".to_string(), "NOPE".to_string()])
            .await
            .unwrap();

        assert_eq!(prices.get("BTC"), Some(&12000000.0));
        assert_eq!(prices.get("NOPE"), Some(&0.0));
    }

    #[tokio::test]
    async fn test_second_fetch_is_served_from_cache() {
        let mock_server = MockServer::start().await;
        let mock_response = r#"{"bitcoin": {"jpy": 12000000.0}}"#;

        Mock::given(method("GET"))
            .and(path("/api/v3/simple/price"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server.uri());
        let symbols = vec!["BTC".to_string()];
        provider.fetch_prices(&symbols).await.unwrap();
        let prices = provider.fetch_prices(&symbols).await.unwrap();
        assert_eq!(prices.get("BTC"), Some(&12000000.0));
    }

    #[tokio::test]
    async fn test_http_error_is_surfaced() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v3/simple/price"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server.uri());
        let result = provider.fetch_prices(&["BTC".to_string()]).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("HTTP error: 429"));
    }

    #[tokio::test]
    async fn test_empty_symbol_list_skips_network() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v3/simple/price"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(0)
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server.uri());
        let prices = provider.fetch_prices(&[]).await.unwrap();
        assert!(prices.is_empty());
    }
}
