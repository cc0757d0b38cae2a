//! Record types shared across the ledger, holdings and subscription trackers.

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fmt::Display;
use std::str::FromStr;

/// Expense categories offered by the entry form.
pub const EXPENSE_CATEGORIES: &[&str] = &[
    "Food",
    "Transport",
    "Household",
    "Hobby",
    "Social",
    "Other",
];

/// Income categories offered by the entry form.
pub const INCOME_CATEGORIES: &[&str] = &["Salary", "Bonus", "Windfall", "Other"];

/// Category recorded for the cash leg of an asset purchase.
pub const INVESTMENT_CATEGORY: &str = "Investment";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Expense,
    Income,
    Transfer,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Expense => "expense",
            EntryKind::Income => "income",
            EntryKind::Transfer => "transfer",
        }
    }
}

impl Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "expense" => Ok(EntryKind::Expense),
            "income" => Ok(EntryKind::Income),
            "transfer" => Ok(EntryKind::Transfer),
            _ => Err(anyhow!("Invalid entry kind: {}", s)),
        }
    }
}

/// One income/expense/transfer record loaded from the sheet.
///
/// `position` is the 1-based ordinal of the row among non-header rows at the
/// time of the load. It is the only identifier the store offers; deleting the
/// entry at position `k` shifts every later position down by one, so callers
/// must reload after every mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub position: usize,
    pub date: NaiveDate,
    pub kind: EntryKind,
    pub category: String,
    pub subcategory: Option<String>,
    /// Whole currency units, never negative.
    pub amount: i64,
    pub memo: String,
}

impl LedgerEntry {
    /// Category cell as stored on the sheet: `category` or
    /// `category/subcategory` when a subcategory is present.
    pub fn category_cell(&self) -> String {
        match &self.subcategory {
            Some(sub) => format!("{}/{}", self.category, sub),
            None => self.category.clone(),
        }
    }

    /// Splits a sheet category cell back into category and subcategory.
    pub fn split_category_cell(cell: &str) -> (String, Option<String>) {
        match cell.split_once('/') {
            Some((cat, sub)) if !sub.is_empty() => (cat.to_string(), Some(sub.to_string())),
            _ => (cell.to_string(), None),
        }
    }
}

/// Accumulated quantity of one tradable symbol.
///
/// Symbols compare case-insensitively; repeated transfers into the same
/// symbol sum into one record, never a duplicate row.
#[derive(Debug, Clone, PartialEq)]
pub struct HoldingRecord {
    pub symbol: String,
    pub quantity: Decimal,
}

impl HoldingRecord {
    pub fn matches(&self, symbol: &str) -> bool {
        self.symbol.eq_ignore_ascii_case(symbol)
    }
}

/// One recurring payment tracked in the subscription side range.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionRecord {
    pub position: usize,
    pub service_name: String,
    pub monthly_amount: i64,
    pub category: String,
    /// Day of month the payment lands, 1 to 31.
    pub pay_day: u8,
    pub memo: String,
}

/// Accumulates `quantity` into the holding for `symbol`, appending a new
/// record when the symbol is not yet held.
pub fn accumulate_holding(holdings: &mut Vec<HoldingRecord>, symbol: &str, quantity: Decimal) {
    match holdings.iter_mut().find(|h| h.matches(symbol)) {
        Some(existing) => existing.quantity += quantity,
        None => holdings.push(HoldingRecord {
            symbol: symbol.to_string(),
            quantity,
        }),
    }
}
