//! Quote types shared by the price sources and the valuation engine.

use std::fmt::Display;
use std::time::Instant;

/// Where a quote came from. `Unavailable` marks a symbol every source failed
/// to price, so a zero price is never mistaken for a real market value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteSource {
    Batch,
    Dex,
    Metal,
    Unavailable,
}

impl Display for QuoteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                QuoteSource::Batch => "batch",
                QuoteSource::Dex => "dex",
                QuoteSource::Metal => "metal",
                QuoteSource::Unavailable => "unavailable",
            }
        )
    }
}

/// A best-effort unit price in the display currency.
#[derive(Debug, Clone)]
pub struct Quote {
    pub symbol: String,
    /// Non-negative; 0 with `QuoteSource::Unavailable` means unknown.
    pub price: f64,
    pub source: QuoteSource,
    pub fetched_at: Instant,
}

impl Quote {
    pub fn new(symbol: &str, price: f64, source: QuoteSource) -> Self {
        Quote {
            symbol: symbol.to_string(),
            price,
            source,
            fetched_at: Instant::now(),
        }
    }

    pub fn unavailable(symbol: &str) -> Self {
        Quote::new(symbol, 0.0, QuoteSource::Unavailable)
    }

    pub fn is_known(&self) -> bool {
        self.source != QuoteSource::Unavailable
    }
}
