pub mod cache;
pub mod config;
pub mod currency_provider;
pub mod log;
pub mod model;
pub mod oracle;
pub mod providers;
pub mod quote;
pub mod sheet;
pub mod summary;
pub mod ui;
pub mod valuation;

use anyhow::{Result, bail};
use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::model::{
    EntryKind, INVESTMENT_CATEGORY, LedgerEntry, SubscriptionRecord, accumulate_holding,
};
use crate::oracle::PriceOracle;
use crate::sheet::RowStore;
use crate::sheet::book::SheetBook;
use crate::sheet::client::SheetClient;

pub enum AppCommand {
    Summary,
    History {
        limit: Option<usize>,
    },
    Add {
        kind: EntryKind,
        category: String,
        subcategory: Option<String>,
        amount: i64,
        date: Option<NaiveDate>,
        memo: Option<String>,
    },
    Delete {
        position: usize,
        yes: bool,
    },
    Invest {
        symbol: String,
        quantity: Decimal,
        cost: i64,
        memo: Option<String>,
    },
    Holdings,
    SubsList,
    SubsAdd {
        service: String,
        amount: i64,
        category: String,
        pay_day: u8,
        memo: Option<String>,
    },
    SubsRemove {
        position: usize,
        yes: bool,
    },
    Memo {
        text: Option<String>,
    },
}

pub async fn run_command(
    command: AppCommand,
    config_path: Option<&str>,
    user: &str,
) -> Result<()> {
    info!("Kakeibo starting...");

    let config = match config_path {
        Some(path) => config::AppConfig::load_from_path(path)?,
        None => config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let sheet_id = config.sheet_for_user(user)?;
    let client = SheetClient::new(&config.sheet.base_url, sheet_id)?;
    let book = SheetBook::new(client);

    match command {
        AppCommand::Summary => {
            let oracle = PriceOracle::from_config(&config);
            summary::show_summary(&book, &oracle, &config.currency).await
        }
        AppCommand::History { limit } => {
            let entries = book.load_ledger().await?;
            println!("{}", summary::render_history_table(&entries, limit));
            Ok(())
        }
        AppCommand::Add {
            kind,
            category,
            subcategory,
            amount,
            date,
            memo,
        } => {
            add_entry(&book, kind, category, subcategory, amount, date, memo).await
        }
        AppCommand::Delete { position, yes } => delete_entry(&book, position, yes).await,
        AppCommand::Invest {
            symbol,
            quantity,
            cost,
            memo,
        } => invest(&book, &symbol, quantity, cost, memo).await,
        AppCommand::Holdings => {
            let oracle = PriceOracle::from_config(&config);
            let holdings = book.load_holdings().await?;
            let symbols: Vec<String> = holdings.iter().map(|h| h.symbol.clone()).collect();
            let pb = ui::new_spinner("Fetching prices...");
            let quotes = oracle.fetch_quotes(&symbols).await;
            pb.finish_and_clear();
            let snapshot = valuation::AssetSnapshot {
                cash: 0,
                holdings: valuation::value_holdings(&holdings, &quotes),
            };
            println!(
                "{}",
                summary::render_holdings_table(&snapshot, &config.currency)
            );
            Ok(())
        }
        AppCommand::SubsList => {
            let subs = book.load_subscriptions().await?;
            println!("{}", summary::render_subscriptions_table(&subs));
            Ok(())
        }
        AppCommand::SubsAdd {
            service,
            amount,
            category,
            pay_day,
            memo,
        } => add_subscription(&book, service, amount, category, pay_day, memo).await,
        AppCommand::SubsRemove { position, yes } => {
            remove_subscription(&book, position, yes).await
        }
        AppCommand::Memo { text } => run_memo(&book, text).await,
    }
}

fn warn_user(message: &str) {
    println!("{}", ui::style_text(message, ui::StyleType::Warning));
}

/// Validates and appends one ledger entry. Zero amounts are rejected before
/// any write reaches the store.
pub async fn add_entry<S: RowStore>(
    book: &SheetBook<S>,
    kind: EntryKind,
    category: String,
    subcategory: Option<String>,
    amount: i64,
    date: Option<NaiveDate>,
    memo: Option<String>,
) -> Result<()> {
    if amount <= 0 {
        warn_user("Amount must be above zero; nothing was recorded.");
        return Ok(());
    }

    let entry = LedgerEntry {
        position: 0,
        date: date.unwrap_or_else(|| Local::now().date_naive()),
        kind,
        category,
        subcategory,
        amount,
        memo: memo.unwrap_or_default(),
    };
    book.append_ledger(&entry).await?;

    let amount_str = ui::format_amount(entry.amount);
    match kind {
        EntryKind::Income => println!("Recorded {} : {} income.", entry.category, amount_str),
        _ => println!("Recorded {} : {}.", entry.category, amount_str),
    }
    Ok(())
}

/// Deletes the entry at `position`, with a dry-run confirmation step unless
/// `yes` is set. Positions after the deleted row shift down by one.
pub async fn delete_entry<S: RowStore>(
    book: &SheetBook<S>,
    position: usize,
    yes: bool,
) -> Result<()> {
    let entries = book.load_ledger().await?;
    let Some(entry) = entries.iter().find(|e| e.position == position) else {
        bail!("No ledger entry at position {}", position);
    };

    if !yes {
        println!(
            "Would delete #{}: {} {} {} {}",
            entry.position,
            entry.date.format("%Y-%m-%d"),
            entry.kind,
            entry.category_cell(),
            ui::format_amount(entry.amount)
        );
        warn_user("Re-run with --yes to delete. Later positions shift down by one.");
        return Ok(());
    }

    book.delete_ledger(position).await?;
    println!("Deleted entry at position {position}.");
    Ok(())
}

/// Moves value into a holding and records the optional cash leg as an
/// expense, mirroring how the paper ledger treats an asset purchase.
pub async fn invest<S: RowStore>(
    book: &SheetBook<S>,
    symbol: &str,
    quantity: Decimal,
    cost: i64,
    memo: Option<String>,
) -> Result<()> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        warn_user("Symbol name is required; nothing was recorded.");
        return Ok(());
    }
    if quantity.is_zero() && cost == 0 {
        warn_user("Enter a quantity or a cost; nothing was recorded.");
        return Ok(());
    }

    let mut holdings = book.load_holdings().await?;
    accumulate_holding(&mut holdings, symbol, quantity);
    book.save_holdings(&holdings).await?;

    if cost > 0 {
        // The cash leg is recorded as a plain expense so the cash balance
        // stays aligned with the bank account.
        let entry = LedgerEntry {
            position: 0,
            date: Local::now().date_naive(),
            kind: EntryKind::Expense,
            category: INVESTMENT_CATEGORY.to_string(),
            subcategory: None,
            amount: cost,
            memo: memo.unwrap_or_else(|| format!("{symbol} purchase")),
        };
        book.append_ledger(&entry).await?;
        println!(
            "Bought {} {} for {}.",
            quantity.normalize(),
            symbol,
            ui::format_amount(cost)
        );
    } else {
        println!("Added {} {} to holdings.", quantity.normalize(), symbol);
    }
    Ok(())
}

pub async fn add_subscription<S: RowStore>(
    book: &SheetBook<S>,
    service: String,
    amount: i64,
    category: String,
    pay_day: u8,
    memo: Option<String>,
) -> Result<()> {
    if service.trim().is_empty() {
        warn_user("Service name is required; nothing was recorded.");
        return Ok(());
    }
    if amount <= 0 {
        warn_user("Monthly amount must be above zero; nothing was recorded.");
        return Ok(());
    }
    if !(1..=31).contains(&pay_day) {
        warn_user("Pay day must be between 1 and 31; nothing was recorded.");
        return Ok(());
    }

    let sub = SubscriptionRecord {
        position: 0,
        service_name: service.trim().to_string(),
        monthly_amount: amount,
        category,
        pay_day,
        memo: memo.unwrap_or_default(),
    };
    book.append_subscription(&sub).await?;
    println!(
        "Tracking {} at {}/month.",
        sub.service_name,
        ui::format_amount(sub.monthly_amount)
    );
    Ok(())
}

pub async fn remove_subscription<S: RowStore>(
    book: &SheetBook<S>,
    position: usize,
    yes: bool,
) -> Result<()> {
    let subs = book.load_subscriptions().await?;
    let Some(sub) = subs.iter().find(|s| s.position == position) else {
        bail!("No subscription at position {}", position);
    };

    if !yes {
        println!(
            "Would remove #{}: {} ({}/month)",
            sub.position,
            sub.service_name,
            ui::format_amount(sub.monthly_amount)
        );
        warn_user("Re-run with --yes to remove.");
        return Ok(());
    }

    book.delete_subscription(position).await?;
    println!("Removed subscription at position {position}.");
    Ok(())
}

/// Shows the memo, or overwrites it when text is given. Last write wins.
pub async fn run_memo<S: RowStore>(book: &SheetBook<S>, text: Option<String>) -> Result<()> {
    match text {
        Some(text) => {
            book.update_memo(&text).await?;
            println!("Memo saved.");
        }
        None => {
            let memo = book.get_memo().await?;
            if memo.is_empty() {
                println!("{}", ui::style_text("(no memo)", ui::StyleType::Subtle));
            } else {
                println!("{memo}");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::memory::MemorySheet;
    use std::str::FromStr;

    #[tokio::test]
    async fn test_add_rejects_zero_amount_before_any_write() {
        let sheet = MemorySheet::new();
        let book = SheetBook::new(sheet.clone());

        add_entry(&book, EntryKind::Expense, "Food".to_string(), None, 0, None, None)
            .await
            .unwrap();

        assert!(sheet.dump().await.is_empty());
    }

    #[tokio::test]
    async fn test_invest_requires_symbol() {
        let sheet = MemorySheet::new();
        let book = SheetBook::new(sheet.clone());

        invest(&book, "  ", Decimal::ONE, 100, None).await.unwrap();
        assert!(sheet.dump().await.is_empty());
    }

    #[tokio::test]
    async fn test_invest_accumulates_and_records_cash_leg() {
        let sheet = MemorySheet::new();
        let book = SheetBook::new(sheet.clone());
        let quantity = Decimal::from_str("0.01").unwrap();

        invest(&book, "BTC", quantity, 120_000, None).await.unwrap();
        invest(&book, "btc", quantity, 0, None).await.unwrap();

        let holdings = book.load_holdings().await.unwrap();
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].quantity, Decimal::from_str("0.02").unwrap());

        let entries = book.load_ledger().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, EntryKind::Expense);
        assert_eq!(entries[0].category, INVESTMENT_CATEGORY);
        assert_eq!(entries[0].amount, 120_000);
        assert_eq!(entries[0].memo, "BTC purchase");
    }

    #[tokio::test]
    async fn test_delete_without_yes_is_a_dry_run() {
        let sheet = MemorySheet::new();
        let book = SheetBook::new(sheet.clone());
        add_entry(
            &book,
            EntryKind::Expense,
            "Food".to_string(),
            None,
            100,
            None,
            None,
        )
        .await
        .unwrap();

        delete_entry(&book, 1, false).await.unwrap();
        assert_eq!(book.load_ledger().await.unwrap().len(), 1);

        delete_entry(&book, 1, true).await.unwrap();
        assert!(book.load_ledger().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_position_errors() {
        let book = SheetBook::new(MemorySheet::new());
        assert!(delete_entry(&book, 7, true).await.is_err());
    }

    #[tokio::test]
    async fn test_subscription_validation() {
        let sheet = MemorySheet::new();
        let book = SheetBook::new(sheet.clone());

        add_subscription(&book, "".to_string(), 100, "Hobby".to_string(), 1, None)
            .await
            .unwrap();
        add_subscription(&book, "X".to_string(), 0, "Hobby".to_string(), 1, None)
            .await
            .unwrap();
        add_subscription(&book, "X".to_string(), 100, "Hobby".to_string(), 32, None)
            .await
            .unwrap();

        assert!(sheet.dump().await.is_empty());
    }
}
