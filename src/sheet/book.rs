//! Typed adapter over the raw grid: ledger, holdings, memo and
//! subscriptions, all addressed positionally.
//!
//! The store has no primary key. A loaded `position` is only valid against
//! the state it was loaded from; every mutation shifts or rewrites rows, so
//! callers reload after each write. Delete is a read-clear-rewrite with no
//! atomicity across the clear boundary.

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{debug, warn};

use super::RowStore;
use crate::model::{EntryKind, HoldingRecord, LedgerEntry, SubscriptionRecord};

const LEDGER_RANGE: &str = "A1:E";
const LEDGER_COLUMNS: &str = "A:E";
const LEDGER_DATE_COLUMN: &str = "A:A";
const DATE_HEADER: &str = "Date";
const DATE_FORMAT: &str = "%Y-%m-%d";

const HOLDINGS_RANGE: &str = "I:J";
const HOLDINGS_ORIGIN: &str = "I1";
const SYMBOL_HEADER: &str = "Symbol";
const QUANTITY_HEADER: &str = "Quantity";

const MEMO_CELL: &str = "G2";

const SUBS_RANGE: &str = "L1:P";
const SUBS_COLUMNS: &str = "L:P";
const SUBS_SERVICE_COLUMN: &str = "L:L";
const SERVICE_HEADER: &str = "Service";

/// Strips thousands separators and parses a currency amount. Malformed
/// cells coerce to 0 rather than failing the load.
fn parse_amount(cell: &str) -> i64 {
    let cleaned = cell.replace(',', "");
    cleaned.trim().parse::<i64>().unwrap_or_else(|_| {
        if !cleaned.trim().is_empty() {
            debug!("Coercing malformed amount cell '{}' to 0", cell);
        }
        0
    })
}

/// Pads or truncates a row to exactly `width` cells.
fn fixed_width(mut row: Vec<String>, width: usize) -> Vec<String> {
    row.truncate(width);
    row.resize(width, String::new());
    row
}

pub struct SheetBook<S: RowStore> {
    store: S,
}

impl<S: RowStore> SheetBook<S> {
    pub fn new(store: S) -> Self {
        SheetBook { store }
    }

    /// Loads every ledger row in store order.
    ///
    /// A header row is skipped when the first cell of the first row equals
    /// the date-column header. Positions are assigned as the 1-based ordinal
    /// among the remaining rows; rows with a blank or unparseable date are
    /// dropped but still consume their ordinal, keeping surviving positions
    /// aligned with the stored block.
    pub async fn load_ledger(&self) -> Result<Vec<LedgerEntry>> {
        let rows = self
            .store
            .read_range(LEDGER_RANGE)
            .await
            .context("Failed to load ledger")?;

        let data = skip_header(&rows, DATE_HEADER);
        let mut entries = Vec::new();
        for (ordinal, row) in data.iter().enumerate() {
            let row = fixed_width(row.clone(), 5);
            let Ok(date) = NaiveDate::parse_from_str(row[0].trim(), DATE_FORMAT) else {
                debug!("Dropping ledger row {} with bad date '{}'", ordinal + 1, row[0]);
                continue;
            };
            // Unknown kinds behave like transfers: present in history,
            // invisible to the cash balance.
            let kind = EntryKind::from_str(&row[1]).unwrap_or(EntryKind::Transfer);
            let (category, subcategory) = LedgerEntry::split_category_cell(&row[2]);
            entries.push(LedgerEntry {
                position: ordinal + 1,
                date,
                kind,
                category,
                subcategory,
                amount: parse_amount(&row[3]),
                memo: row[4].clone(),
            });
        }
        Ok(entries)
    }

    /// Appends one entry as a fixed 5-column block. The next free row is
    /// computed from the count of non-empty date-column cells, so a blank
    /// row left by a manual edit would break addressing.
    pub async fn append_ledger(&self, entry: &LedgerEntry) -> Result<()> {
        let date_cells = self
            .store
            .read_range(LEDGER_DATE_COLUMN)
            .await
            .context("Failed to find next ledger row")?;
        let used = date_cells
            .iter()
            .filter(|row| row.first().is_some_and(|c| !c.is_empty()))
            .count();
        let next_row = used + 1;

        let values = vec![vec![
            entry.date.format(DATE_FORMAT).to_string(),
            entry.kind.to_string(),
            entry.category_cell(),
            entry.amount.to_string(),
            entry.memo.clone(),
        ]];
        self.store
            .write_range(&format!("A{next_row}"), values)
            .await
            .context("Failed to append ledger entry")
    }

    /// Deletes the entry at `position` (1-based, among non-header rows).
    ///
    /// Reads the whole block, removes the row in memory, clears the column
    /// range and rewrites from row 1. A crash between clear and rewrite
    /// loses the block; positions above `position` shift down by one.
    pub async fn delete_ledger(&self, position: usize) -> Result<()> {
        let rows = self
            .store
            .read_range(LEDGER_RANGE)
            .await
            .context("Failed to load ledger for delete")?;

        let header_rows = rows.len() - skip_header(&rows, DATE_HEADER).len();
        let index = header_rows + position.checked_sub(1).context("Position is 1-based")?;
        if index >= rows.len() {
            return Err(anyhow!("No ledger entry at position {}", position));
        }

        let mut rows: Vec<Vec<String>> = rows.into_iter().map(|r| fixed_width(r, 5)).collect();
        rows.remove(index);

        self.store
            .clear_range(LEDGER_COLUMNS)
            .await
            .context("Failed to clear ledger block")?;
        if rows.is_empty() {
            return Ok(());
        }
        self.store
            .write_range("A1", rows)
            .await
            .context("Failed to rewrite ledger block")
    }

    /// Loads the two-column holdings side range.
    pub async fn load_holdings(&self) -> Result<Vec<HoldingRecord>> {
        let rows = self
            .store
            .read_range(HOLDINGS_RANGE)
            .await
            .context("Failed to load holdings")?;

        let mut holdings = Vec::new();
        for row in skip_header(&rows, SYMBOL_HEADER) {
            let row = fixed_width(row.clone(), 2);
            let symbol = row[0].trim();
            if symbol.is_empty() {
                continue;
            }
            let quantity = Decimal::from_str(row[1].trim()).unwrap_or_else(|_| {
                warn!("Coercing malformed quantity '{}' for {} to 0", row[1], symbol);
                Decimal::ZERO
            });
            holdings.push(HoldingRecord {
                symbol: symbol.to_string(),
                quantity,
            });
        }
        Ok(holdings)
    }

    /// Rewrites the entire holdings range, header included.
    pub async fn save_holdings(&self, holdings: &[HoldingRecord]) -> Result<()> {
        let mut values = vec![vec![
            SYMBOL_HEADER.to_string(),
            QUANTITY_HEADER.to_string(),
        ]];
        for holding in holdings {
            values.push(vec![
                holding.symbol.clone(),
                holding.quantity.normalize().to_string(),
            ]);
        }

        self.store
            .clear_range(HOLDINGS_RANGE)
            .await
            .context("Failed to clear holdings range")?;
        self.store
            .write_range(HOLDINGS_ORIGIN, values)
            .await
            .context("Failed to save holdings")
    }

    /// Reads the free-text memo; a missing cell is an empty memo.
    pub async fn get_memo(&self) -> Result<String> {
        let memo = self
            .store
            .read_cell(MEMO_CELL)
            .await
            .context("Failed to read memo")?;
        Ok(memo.unwrap_or_default())
    }

    /// Overwrites the memo cell. Last write wins, no history.
    pub async fn update_memo(&self, text: &str) -> Result<()> {
        self.store
            .write_cell(MEMO_CELL, text)
            .await
            .context("Failed to update memo")
    }

    /// Loads the subscription side range with the same positional scheme as
    /// the ledger. Rows with a blank service name are dropped but consume
    /// their ordinal.
    pub async fn load_subscriptions(&self) -> Result<Vec<SubscriptionRecord>> {
        let rows = self
            .store
            .read_range(SUBS_RANGE)
            .await
            .context("Failed to load subscriptions")?;

        let mut subscriptions = Vec::new();
        for (ordinal, row) in skip_header(&rows, SERVICE_HEADER).iter().enumerate() {
            let row = fixed_width(row.clone(), 5);
            let service_name = row[0].trim();
            if service_name.is_empty() {
                continue;
            }
            let pay_day = row[3].trim().parse::<u8>().unwrap_or(1).clamp(1, 31);
            subscriptions.push(SubscriptionRecord {
                position: ordinal + 1,
                service_name: service_name.to_string(),
                monthly_amount: parse_amount(&row[1]),
                category: row[2].clone(),
                pay_day,
                memo: row[4].clone(),
            });
        }
        Ok(subscriptions)
    }

    pub async fn append_subscription(&self, sub: &SubscriptionRecord) -> Result<()> {
        let service_cells = self
            .store
            .read_range(SUBS_SERVICE_COLUMN)
            .await
            .context("Failed to find next subscription row")?;
        let used = service_cells
            .iter()
            .filter(|row| row.first().is_some_and(|c| !c.is_empty()))
            .count();
        let next_row = used + 1;

        let values = vec![vec![
            sub.service_name.clone(),
            sub.monthly_amount.to_string(),
            sub.category.clone(),
            sub.pay_day.to_string(),
            sub.memo.clone(),
        ]];
        self.store
            .write_range(&format!("L{next_row}"), values)
            .await
            .context("Failed to append subscription")
    }

    pub async fn delete_subscription(&self, position: usize) -> Result<()> {
        let rows = self
            .store
            .read_range(SUBS_RANGE)
            .await
            .context("Failed to load subscriptions for delete")?;

        let header_rows = rows.len() - skip_header(&rows, SERVICE_HEADER).len();
        let index = header_rows + position.checked_sub(1).context("Position is 1-based")?;
        if index >= rows.len() {
            return Err(anyhow!("No subscription at position {}", position));
        }

        let mut rows: Vec<Vec<String>> = rows.into_iter().map(|r| fixed_width(r, 5)).collect();
        rows.remove(index);

        self.store
            .clear_range(SUBS_COLUMNS)
            .await
            .context("Failed to clear subscription block")?;
        if rows.is_empty() {
            return Ok(());
        }
        self.store
            .write_range("L1", rows)
            .await
            .context("Failed to rewrite subscription block")
    }
}

/// Returns the data rows, skipping a leading header row when its first cell
/// equals `header`.
fn skip_header<'a>(rows: &'a [Vec<String>], header: &str) -> &'a [Vec<String>] {
    match rows.first().and_then(|row| row.first()) {
        Some(cell) if cell == header => &rows[1..],
        _ => rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::accumulate_holding;
    use crate::sheet::memory::MemorySheet;

    fn entry(date: &str, kind: EntryKind, category: &str, amount: i64) -> LedgerEntry {
        LedgerEntry {
            position: 0,
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            kind,
            category: category.to_string(),
            subcategory: None,
            amount,
            memo: String::new(),
        }
    }

    async fn book_with_header() -> SheetBook<MemorySheet> {
        let sheet = MemorySheet::new();
        sheet
            .seed(vec![vec!["Date", "Kind", "Category", "Amount", "Memo"]])
            .await;
        SheetBook::new(sheet)
    }

    #[tokio::test]
    async fn test_append_then_load_assigns_positions_in_store_order() {
        let book = book_with_header().await;
        book.append_ledger(&entry("2025-01-05", EntryKind::Income, "Salary", 300000))
            .await
            .unwrap();
        book.append_ledger(&entry("2025-01-10", EntryKind::Expense, "Food", 1200))
            .await
            .unwrap();
        book.append_ledger(&entry("2025-01-11", EntryKind::Expense, "Hobby", 4500))
            .await
            .unwrap();

        let entries = book.load_ledger().await.unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(
            entries.iter().map(|e| e.position).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(entries[0].category, "Salary");
        assert_eq!(entries[2].amount, 4500);
    }

    #[tokio::test]
    async fn test_load_without_header_row() {
        let sheet = MemorySheet::new();
        sheet
            .seed(vec![vec!["2025-01-10", "expense", "Food", "1,200", "lunch"]])
            .await;
        let book = SheetBook::new(sheet);

        let entries = book.load_ledger().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].position, 1);
        assert_eq!(entries[0].amount, 1200);
        assert_eq!(entries[0].memo, "lunch");
    }

    #[tokio::test]
    async fn test_bad_date_rows_are_dropped_but_consume_positions() {
        let sheet = MemorySheet::new();
        sheet
            .seed(vec![
                vec!["2025-01-10", "expense", "Food", "100", ""],
                vec!["not-a-date", "expense", "Food", "200", ""],
                vec!["2025-01-12", "income", "Salary", "300", ""],
            ])
            .await;
        let book = SheetBook::new(sheet);

        let entries = book.load_ledger().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].position, 1);
        assert_eq!(entries[1].position, 3);
    }

    #[tokio::test]
    async fn test_malformed_amount_coerces_to_zero() {
        let sheet = MemorySheet::new();
        sheet
            .seed(vec![vec!["2025-01-10", "expense", "Food", "1.2k", ""]])
            .await;
        let book = SheetBook::new(sheet);

        let entries = book.load_ledger().await.unwrap();
        assert_eq!(entries[0].amount, 0);
    }

    #[tokio::test]
    async fn test_delete_shifts_later_positions_down() {
        let book = book_with_header().await;
        for (date, amount) in [("2025-01-01", 100), ("2025-01-02", 200), ("2025-01-03", 300)] {
            book.append_ledger(&entry(date, EntryKind::Expense, "Food", amount))
                .await
                .unwrap();
        }

        book.delete_ledger(2).await.unwrap();

        let entries = book.load_ledger().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.amount != 200));
        assert_eq!(entries[0].position, 1);
        assert_eq!(entries[0].amount, 100);
        assert_eq!(entries[1].position, 2);
        assert_eq!(entries[1].amount, 300);
    }

    #[tokio::test]
    async fn test_delete_out_of_range_fails_without_writes() {
        let book = book_with_header().await;
        book.append_ledger(&entry("2025-01-01", EntryKind::Expense, "Food", 100))
            .await
            .unwrap();

        assert!(book.delete_ledger(0).await.is_err());
        assert!(book.delete_ledger(5).await.is_err());
        assert_eq!(book.load_ledger().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_append_after_delete_reuses_freed_row() {
        let book = book_with_header().await;
        book.append_ledger(&entry("2025-01-01", EntryKind::Expense, "Food", 100))
            .await
            .unwrap();
        book.append_ledger(&entry("2025-01-02", EntryKind::Expense, "Food", 200))
            .await
            .unwrap();
        book.delete_ledger(1).await.unwrap();
        book.append_ledger(&entry("2025-01-03", EntryKind::Expense, "Food", 300))
            .await
            .unwrap();

        let entries = book.load_ledger().await.unwrap();
        assert_eq!(
            entries.iter().map(|e| e.amount).collect::<Vec<_>>(),
            vec![200, 300]
        );
    }

    #[tokio::test]
    async fn test_holdings_round_trip_and_accumulate() {
        let book = SheetBook::new(MemorySheet::new());
        let mut holdings = book.load_holdings().await.unwrap();
        assert!(holdings.is_empty());

        accumulate_holding(&mut holdings, "BTC", Decimal::from_str("0.005").unwrap());
        accumulate_holding(&mut holdings, "BTC", Decimal::from_str("0.005").unwrap());
        book.save_holdings(&holdings).await.unwrap();

        let loaded = book.load_holdings().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].symbol, "BTC");
        assert_eq!(loaded[0].quantity, Decimal::from_str("0.01").unwrap());
    }

    #[tokio::test]
    async fn test_save_holdings_rewrites_whole_range() {
        let book = SheetBook::new(MemorySheet::new());
        book.save_holdings(&[
            HoldingRecord {
                symbol: "BTC".to_string(),
                quantity: Decimal::ONE,
            },
            HoldingRecord {
                symbol: "ETH".to_string(),
                quantity: Decimal::TWO,
            },
        ])
        .await
        .unwrap();

        book.save_holdings(&[HoldingRecord {
            symbol: "BTC".to_string(),
            quantity: Decimal::ONE,
        }])
        .await
        .unwrap();

        let loaded = book.load_holdings().await.unwrap();
        assert_eq!(loaded.len(), 1);
    }

    #[tokio::test]
    async fn test_memo_round_trip() {
        let book = SheetBook::new(MemorySheet::new());
        assert_eq!(book.get_memo().await.unwrap(), "");

        book.update_memo("buy rice").await.unwrap();
        assert_eq!(book.get_memo().await.unwrap(), "buy rice");

        // Last write wins.
        book.update_memo("buy rice and miso").await.unwrap();
        assert_eq!(book.get_memo().await.unwrap(), "buy rice and miso");
    }

    #[tokio::test]
    async fn test_subscriptions_append_load_delete() {
        let book = SheetBook::new(MemorySheet::new());
        let sub = SubscriptionRecord {
            position: 0,
            service_name: "StreamFlix".to_string(),
            monthly_amount: 1490,
            category: "Hobby".to_string(),
            pay_day: 27,
            memo: String::new(),
        };
        book.append_subscription(&sub).await.unwrap();
        book.append_subscription(&SubscriptionRecord {
            service_name: "CloudBox".to_string(),
            monthly_amount: 250,
            pay_day: 1,
            ..sub.clone()
        })
        .await
        .unwrap();

        let subs = book.load_subscriptions().await.unwrap();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].position, 1);
        assert_eq!(subs[0].service_name, "StreamFlix");
        assert_eq!(subs[1].monthly_amount, 250);

        book.delete_subscription(1).await.unwrap();
        let subs = book.load_subscriptions().await.unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].service_name, "CloudBox");
        assert_eq!(subs[0].position, 1);
    }

    #[tokio::test]
    async fn test_subscription_pay_day_clamped() {
        let sheet = MemorySheet::new();
        sheet
            .write_range(
                "L1",
                vec![vec![
                    "StreamFlix".to_string(),
                    "1490".to_string(),
                    "Hobby".to_string(),
                    "45".to_string(),
                    String::new(),
                ]],
            )
            .await
            .unwrap();
        let book = SheetBook::new(sheet);

        let subs = book.load_subscriptions().await.unwrap();
        assert_eq!(subs[0].pay_day, 31);
    }
}
