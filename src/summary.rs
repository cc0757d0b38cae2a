//! Renders the asset snapshot, history, holdings and subscription views.

use anyhow::Result;
use chrono::Local;
use comfy_table::Cell;

use crate::model::{LedgerEntry, SubscriptionRecord};
use crate::oracle::PriceOracle;
use crate::sheet::RowStore;
use crate::sheet::book::SheetBook;
use crate::ui;
use crate::valuation::{self, AssetSnapshot, BreakdownSlice};

/// Renders the headline totals plus the proportional breakdown.
pub fn render_snapshot(snapshot: &AssetSnapshot, currency: &str) -> String {
    let mut output = format!(
        "{}\n\nTotal assets ({}): {}\n",
        ui::style_text("Asset snapshot", ui::StyleType::Title),
        ui::style_text(currency, ui::StyleType::TotalLabel),
        ui::style_text(
            &ui::format_value(snapshot.total()),
            ui::StyleType::TotalValue
        ),
    );
    output.push_str(&format!(
        "  cash: {}   holdings: {}\n",
        ui::format_amount(snapshot.cash),
        ui::format_value(snapshot.holdings_total()),
    ));

    let slices = valuation::breakdown(snapshot);
    if !slices.is_empty() {
        output.push('\n');
        output.push_str(&render_breakdown(&slices));
    }

    if snapshot.has_unpriced() {
        output.push_str(&format!(
            "\n{}\n",
            ui::style_text(
                "Warning: some holdings could not be priced; total is understated.",
                ui::StyleType::Warning
            )
        ));
    }
    output
}

fn render_breakdown(slices: &[BreakdownSlice]) -> String {
    let mut output = String::from("Breakdown:\n");
    for slice in slices {
        output.push_str(&format!(
            "  {:<8} {:>5.1}%\n",
            slice.label,
            slice.ratio * 100.0
        ));
    }
    output
}

/// Renders the priced holdings detail table.
pub fn render_holdings_table(snapshot: &AssetSnapshot, currency: &str) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Symbol"),
        ui::header_cell("Quantity"),
        ui::header_cell("Price"),
        ui::header_cell(&format!("Value ({currency})")),
    ]);

    for holding in &snapshot.holdings {
        let price = if holding.priced {
            format!("{:.4}", holding.price)
        } else {
            "N/A".to_string()
        };
        table.add_row(vec![
            Cell::new(&holding.symbol),
            ui::amount_cell(format!("{:.8}", holding.quantity)),
            ui::amount_cell(price),
            ui::amount_cell(ui::format_value(holding.value)),
        ]);
    }
    table.to_string()
}

/// Renders ledger history, newest first.
pub fn render_history_table(entries: &[LedgerEntry], limit: Option<usize>) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("#"),
        ui::header_cell("Date"),
        ui::header_cell("Kind"),
        ui::header_cell("Category"),
        ui::header_cell("Amount"),
        ui::header_cell("Memo"),
    ]);

    let rows = entries
        .iter()
        .rev()
        .take(limit.unwrap_or(entries.len()));
    for entry in rows {
        table.add_row(vec![
            Cell::new(entry.position),
            Cell::new(entry.date.format("%Y-%m-%d")),
            Cell::new(entry.kind.to_string()),
            Cell::new(entry.category_cell()),
            ui::amount_cell(ui::format_amount(entry.amount)),
            Cell::new(&entry.memo),
        ]);
    }
    table.to_string()
}

pub fn render_subscriptions_table(subs: &[SubscriptionRecord]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("#"),
        ui::header_cell("Service"),
        ui::header_cell("Monthly"),
        ui::header_cell("Category"),
        ui::header_cell("Pay day"),
        ui::header_cell("Memo"),
    ]);

    for sub in subs {
        table.add_row(vec![
            Cell::new(sub.position),
            Cell::new(&sub.service_name),
            ui::amount_cell(ui::format_amount(sub.monthly_amount)),
            Cell::new(&sub.category),
            ui::amount_cell(sub.pay_day.to_string()),
            Cell::new(&sub.memo),
        ]);
    }

    let monthly_total: i64 = subs.iter().map(|s| s.monthly_amount).sum();
    format!(
        "{}\n\nMonthly total: {}",
        table,
        ui::style_text(&ui::format_amount(monthly_total), ui::StyleType::TotalValue)
    )
}

/// Loads everything, prices the held symbols and prints the full summary.
pub async fn show_summary<S: RowStore>(
    book: &SheetBook<S>,
    oracle: &PriceOracle,
    currency: &str,
) -> Result<()> {
    let entries = book.load_ledger().await?;
    let holdings = book.load_holdings().await?;

    let cash = valuation::cash_balance(&entries, Local::now().date_naive());

    let symbols: Vec<String> = holdings.iter().map(|h| h.symbol.clone()).collect();
    let pb = ui::new_spinner("Fetching prices...");
    let quotes = oracle.fetch_quotes(&symbols).await;
    pb.finish_and_clear();

    let snapshot = AssetSnapshot {
        cash,
        holdings: valuation::value_holdings(&holdings, &quotes),
    };

    println!("{}", render_snapshot(&snapshot, currency));
    if !snapshot.holdings.is_empty() {
        println!("{}", render_holdings_table(&snapshot, currency));
    }
    ui::print_separator();
    println!("{}", render_history_table(&entries, Some(10)));
    Ok(())
}
