//! In-memory grid backend, used by tests and offline runs.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::RowStore;

/// A [`RowStore`] over a plain in-process grid. Supports single-letter
/// columns and the A1 forms the adapter uses (`"A1:E"`, `"I:J"`, `"G2"`,
/// `"L4"`).
#[derive(Clone, Default)]
pub struct MemorySheet {
    grid: Arc<Mutex<Vec<Vec<String>>>>,
}

/// A parsed A1 reference: zero-based column span plus optional start row.
struct A1Span {
    col_start: usize,
    col_end: usize,
    row_start: usize,
}

fn col_index(letter: char) -> Result<usize> {
    if letter.is_ascii_uppercase() {
        Ok(letter as usize - 'A' as usize)
    } else {
        Err(anyhow!("Unsupported column reference: {}", letter))
    }
}

fn parse_part(part: &str) -> Result<(usize, Option<usize>)> {
    let mut chars = part.chars();
    let col = col_index(chars.next().ok_or_else(|| anyhow!("Empty A1 reference"))?)?;
    let digits: String = chars.collect();
    let row = if digits.is_empty() {
        None
    } else {
        Some(
            digits
                .parse::<usize>()
                .map_err(|_| anyhow!("Invalid A1 row in: {}", part))?,
        )
    };
    Ok((col, row))
}

fn parse_range(range: &str) -> Result<A1Span> {
    let (start, end) = match range.split_once(':') {
        Some((s, e)) => (s, Some(e)),
        None => (range, None),
    };
    let (col_start, row_start) = parse_part(start)?;
    let col_end = match end {
        Some(e) => parse_part(e)?.0,
        None => col_start,
    };
    Ok(A1Span {
        col_start,
        col_end,
        row_start: row_start.unwrap_or(1),
    })
}

impl MemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the full grid, row by row.
    pub async fn seed(&self, rows: Vec<Vec<&str>>) {
        let mut grid = self.grid.lock().await;
        *grid = rows
            .into_iter()
            .map(|row| row.into_iter().map(str::to_string).collect())
            .collect();
    }

    pub async fn dump(&self) -> Vec<Vec<String>> {
        self.grid.lock().await.clone()
    }
}

#[async_trait]
impl RowStore for MemorySheet {
    async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let span = parse_range(range)?;
        let grid = self.grid.lock().await;

        let mut rows: Vec<Vec<String>> = grid
            .iter()
            .skip(span.row_start - 1)
            .map(|row| {
                (span.col_start..=span.col_end)
                    .map(|c| row.get(c).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();
        while rows
            .last()
            .is_some_and(|row| row.iter().all(String::is_empty))
        {
            rows.pop();
        }
        Ok(rows)
    }

    async fn write_range(&self, range: &str, values: Vec<Vec<String>>) -> Result<()> {
        let span = parse_range(range)?;
        let mut grid = self.grid.lock().await;

        for (r, row_values) in values.into_iter().enumerate() {
            let row_idx = span.row_start - 1 + r;
            if grid.len() <= row_idx {
                grid.resize(row_idx + 1, Vec::new());
            }
            for (c, value) in row_values.into_iter().enumerate() {
                let col_idx = span.col_start + c;
                let row = &mut grid[row_idx];
                if row.len() <= col_idx {
                    row.resize(col_idx + 1, String::new());
                }
                row[col_idx] = value;
            }
        }
        Ok(())
    }

    async fn clear_range(&self, range: &str) -> Result<()> {
        let span = parse_range(range)?;
        let mut grid = self.grid.lock().await;

        for row in grid.iter_mut().skip(span.row_start - 1) {
            for col_idx in span.col_start..=span.col_end {
                if let Some(cell) = row.get_mut(col_idx) {
                    cell.clear();
                }
            }
        }
        Ok(())
    }
}
