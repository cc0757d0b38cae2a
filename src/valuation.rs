//! Combines the ledger-derived cash balance with priced holdings into a
//! total-asset snapshot and a proportional breakdown.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use std::collections::HashMap;

use crate::model::{EntryKind, HoldingRecord, LedgerEntry};
use crate::quote::Quote;

/// Components under this share of total assets fold into an "other" bucket.
/// Display-only; totals are unaffected.
pub const FOLD_THRESHOLD: f64 = 0.05;

pub const CASH_LABEL: &str = "Cash";
pub const OTHER_LABEL: &str = "other";

/// Net cash as of a date: income minus expense over entries dated on or
/// before `as_of`. Future-dated rows and transfers do not move cash.
pub fn cash_balance(entries: &[LedgerEntry], as_of: NaiveDate) -> i64 {
    entries
        .iter()
        .filter(|e| e.date <= as_of)
        .map(|e| match e.kind {
            EntryKind::Income => e.amount,
            EntryKind::Expense => -e.amount,
            EntryKind::Transfer => 0,
        })
        .sum()
}

/// One holding priced against the quote map.
#[derive(Debug, Clone)]
pub struct HoldingValuation {
    pub symbol: String,
    pub quantity: f64,
    /// Unit price in the display currency; 0 when no source priced it.
    pub price: f64,
    pub value: f64,
    /// False when the price degraded to 0 on upstream failure.
    pub priced: bool,
}

/// Values each holding at quantity times quote price (missing quote = 0),
/// sorted by value descending.
pub fn value_holdings(
    holdings: &[HoldingRecord],
    quotes: &HashMap<String, Quote>,
) -> Vec<HoldingValuation> {
    let mut valuations: Vec<HoldingValuation> = holdings
        .iter()
        .map(|holding| {
            let quantity = holding.quantity.to_f64().unwrap_or(0.0);
            let quote = quotes.get(&holding.symbol.to_uppercase());
            let price = quote.map_or(0.0, |q| q.price);
            HoldingValuation {
                symbol: holding.symbol.clone(),
                quantity,
                price,
                value: quantity * price,
                priced: quote.is_some_and(Quote::is_known),
            }
        })
        .collect();
    valuations.sort_by(|a, b| b.value.total_cmp(&a.value));
    valuations
}

#[derive(Debug)]
pub struct AssetSnapshot {
    pub cash: i64,
    pub holdings: Vec<HoldingValuation>,
}

impl AssetSnapshot {
    pub fn holdings_total(&self) -> f64 {
        self.holdings.iter().map(|h| h.value).sum()
    }

    /// Cash plus holdings. Understated, never overstated, while any source
    /// is down.
    pub fn total(&self) -> f64 {
        self.cash as f64 + self.holdings_total()
    }

    /// True when some holding could not be priced, so the total is a floor.
    pub fn has_unpriced(&self) -> bool {
        self.holdings.iter().any(|h| !h.priced)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BreakdownSlice {
    pub label: String,
    /// Share of total assets, 0 to 1.
    pub ratio: f64,
}

/// Proportional breakdown of the snapshot: one slice per nonzero component,
/// with sub-threshold slices folded into a trailing "other" bucket.
pub fn breakdown(snapshot: &AssetSnapshot) -> Vec<BreakdownSlice> {
    let total = snapshot.total();
    if total <= 0.0 {
        return Vec::new();
    }

    let mut components: Vec<(String, f64)> = Vec::new();
    if snapshot.cash != 0 {
        components.push((CASH_LABEL.to_string(), snapshot.cash as f64));
    }
    for holding in &snapshot.holdings {
        if holding.value != 0.0 {
            components.push((holding.symbol.clone(), holding.value));
        }
    }

    let mut slices = Vec::new();
    let mut other = 0.0;
    for (label, value) in components {
        let ratio = value / total;
        if ratio < FOLD_THRESHOLD {
            other += ratio;
        } else {
            slices.push(BreakdownSlice { label, ratio });
        }
    }
    if other > 0.0 {
        slices.push(BreakdownSlice {
            label: OTHER_LABEL.to_string(),
            ratio: other,
        });
    }
    slices
}
