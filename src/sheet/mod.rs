//! Access to the remote spreadsheet.
//!
//! The store is an untyped grid addressed by A1-style ranges with no schema
//! and no primary key; column order is the only contract. [`RowStore`] is the
//! raw grid surface, [`book::SheetBook`] the typed adapter on top of it.

pub mod book;
pub mod client;
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

/// Raw grid operations against one spreadsheet.
///
/// Ranges use A1 notation (`"A1:E"`, `"I:J"`, `"G2"`). Reads return rows of
/// cell strings with trailing blank cells possibly omitted, exactly as the
/// service sends them.
#[async_trait]
pub trait RowStore: Send + Sync {
    async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>>;

    /// Writes `values` starting at the top-left cell of `range`. Cells
    /// outside the written block keep their previous contents.
    async fn write_range(&self, range: &str, values: Vec<Vec<String>>) -> Result<()>;

    async fn clear_range(&self, range: &str) -> Result<()>;

    async fn read_cell(&self, cell: &str) -> Result<Option<String>> {
        let rows = self.read_range(cell).await?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .filter(|v| !v.is_empty()))
    }

    async fn write_cell(&self, cell: &str, value: &str) -> Result<()> {
        self.write_range(cell, vec![vec![value.to_string()]]).await
    }
}
