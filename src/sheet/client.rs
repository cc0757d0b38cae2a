use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::RowStore;

/// HTTP client for a values-API style grid service.
///
/// The service exposes one spreadsheet per id with three endpoints:
/// `GET /v1/sheets/{id}/values/{range}`, `PUT` on the same path with a
/// `{"values": [...]}` body, and `POST .../values/{range}:clear`. Failures
/// surface to the caller as-is; nothing is retried here.
pub struct SheetClient {
    base_url: String,
    sheet_id: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct ValuesBody {
    values: Vec<Vec<String>>,
}

impl SheetClient {
    pub fn new(base_url: &str, sheet_id: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("kakeibo/0.1")
            .build()
            .context("Failed to build HTTP client")?;
        Ok(SheetClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            sheet_id: sheet_id.to_string(),
            client,
        })
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/v1/sheets/{}/values/{}",
            self.base_url, self.sheet_id, range
        )
    }
}

#[async_trait]
impl RowStore for SheetClient {
    async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let url = self.values_url(range);
        debug!("Reading sheet range from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Sheet connection error: {} for range: {}", e, range))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Sheet read failed: HTTP {} for range: {}",
                response.status(),
                range
            ));
        }

        let data: ValuesResponse = response
            .json()
            .await
            .with_context(|| format!("Malformed sheet response for range: {range}"))?;
        Ok(data.values)
    }

    async fn write_range(&self, range: &str, values: Vec<Vec<String>>) -> Result<()> {
        let url = self.values_url(range);
        debug!("Writing {} row(s) to {}", values.len(), url);

        let response = self
            .client
            .put(&url)
            .json(&ValuesBody { values })
            .send()
            .await
            .map_err(|e| anyhow!("Sheet connection error: {} for range: {}", e, range))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Sheet write failed: HTTP {} for range: {}",
                response.status(),
                range
            ));
        }
        Ok(())
    }

    async fn clear_range(&self, range: &str) -> Result<()> {
        let url = format!("{}:clear", self.values_url(range));
        debug!("Clearing sheet range via {}", url);

        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Sheet connection error: {} for range: {}", e, range))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Sheet clear failed: HTTP {} for range: {}",
                response.status(),
                range
            ));
        }
        Ok(())
    }
}
