use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SheetConfig {
    pub base_url: String,
    /// Maps a user name to the spreadsheet it may touch. Access is gated by
    /// this table alone; an unknown user fails before any network call.
    pub users: HashMap<String, String>,
}

impl Default for SheetConfig {
    fn default() -> Self {
        SheetConfig {
            base_url: "http://localhost:8900".to_string(),
            users: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EndpointConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub coingecko: Option<EndpointConfig>,
    pub dexscreener: Option<EndpointConfig>,
    pub chart: Option<EndpointConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            coingecko: Some(EndpointConfig {
                base_url: "https://api.coingecko.com".to_string(),
            }),
            dexscreener: Some(EndpointConfig {
                base_url: "https://api.dexscreener.com".to_string(),
            }),
            chart: Some(EndpointConfig {
                base_url: "https://query1.finance.yahoo.com".to_string(),
            }),
        }
    }
}

fn default_currency() -> String {
    "JPY".to_string()
}

fn default_crypto_ids() -> HashMap<String, String> {
    [
        ("BTC", "bitcoin"),
        ("ETH", "ethereum"),
        ("XRP", "ripple"),
        ("PI", "pi-network"),
        ("IOST", "iostoken"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub sheet: SheetConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Display currency; prices are converted into this before valuation.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Ticker to coingecko id. Symbols absent here are looked up by their
    /// lowercased ticker.
    #[serde(default = "default_crypto_ids")]
    pub crypto_ids: HashMap<String, String>,
    /// Ticker to DEX contract address; anything listed here is priced
    /// through the DEX aggregator instead of the batch quote endpoint.
    #[serde(default)]
    pub meme_contracts: HashMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            sheet: SheetConfig::default(),
            providers: ProvidersConfig::default(),
            currency: default_currency(),
            crypto_ids: default_crypto_ids(),
            meme_contracts: HashMap::new(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "codito", "kakeibo")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Resolves a user name to its spreadsheet id.
    pub fn sheet_for_user(&self, user: &str) -> Result<&str> {
        self.sheet
            .users
            .get(user)
            .map(String::as_str)
            .ok_or_else(|| {
                let mut known: Vec<_> = self.sheet.users.keys().cloned().collect();
                known.sort();
                anyhow!("Unknown user '{}' (known: {})", user, known.join(", "))
            })
    }
}
