use anyhow::Result;
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use kakeibo::log::init_logging;
use kakeibo::model::EntryKind;
use rust_decimal::Decimal;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    /// User whose spreadsheet to open
    #[arg(short, long, global = true, default_value = "default")]
    user: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display the asset snapshot and recent history
    Summary,
    /// Record an income, expense or transfer entry
    Add {
        /// expense, income or transfer
        #[arg(short, long)]
        kind: EntryKind,
        #[arg(long)]
        category: String,
        #[arg(long)]
        subcategory: Option<String>,
        /// Whole currency units
        #[arg(short, long)]
        amount: i64,
        /// Defaults to today (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<NaiveDate>,
        #[arg(short, long)]
        memo: Option<String>,
    },
    /// Show the ledger history
    History {
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Delete the ledger entry at a position from the last load
    Delete {
        position: usize,
        /// Skip the confirmation step
        #[arg(long)]
        yes: bool,
    },
    /// Move value into a holding, recording the cash leg as an expense
    Invest {
        #[arg(short, long)]
        symbol: String,
        /// Units acquired, up to 8 fractional digits
        #[arg(short, long, default_value = "0")]
        quantity: Decimal,
        /// Cash paid, in whole currency units
        #[arg(long, default_value_t = 0)]
        cost: i64,
        #[arg(short, long)]
        memo: Option<String>,
    },
    /// Show current holdings with prices
    Holdings,
    /// Track recurring payments
    Subs {
        #[command(subcommand)]
        command: SubsCommands,
    },
    /// Show the shared memo, or overwrite it
    Memo { text: Option<String> },
}

#[derive(Subcommand)]
enum SubsCommands {
    List,
    Add {
        #[arg(short, long)]
        service: String,
        /// Monthly amount in whole currency units
        #[arg(short, long)]
        amount: i64,
        #[arg(long)]
        category: String,
        /// Day of month the payment lands (1-31)
        #[arg(short, long)]
        pay_day: u8,
        #[arg(short, long)]
        memo: Option<String>,
    },
    Remove {
        position: usize,
        /// Skip the confirmation step
        #[arg(long)]
        yes: bool,
    },
}

impl From<Commands> for kakeibo::AppCommand {
    fn from(cmd: Commands) -> kakeibo::AppCommand {
        match cmd {
            Commands::Summary => kakeibo::AppCommand::Summary,
            Commands::Add {
                kind,
                category,
                subcategory,
                amount,
                date,
                memo,
            } => kakeibo::AppCommand::Add {
                kind,
                category,
                subcategory,
                amount,
                date,
                memo,
            },
            Commands::History { limit } => kakeibo::AppCommand::History { limit },
            Commands::Delete { position, yes } => kakeibo::AppCommand::Delete { position, yes },
            Commands::Invest {
                symbol,
                quantity,
                cost,
                memo,
            } => kakeibo::AppCommand::Invest {
                symbol,
                quantity,
                cost,
                memo,
            },
            Commands::Holdings => kakeibo::AppCommand::Holdings,
            Commands::Subs { command } => match command {
                SubsCommands::List => kakeibo::AppCommand::SubsList,
                SubsCommands::Add {
                    service,
                    amount,
                    category,
                    pay_day,
                    memo,
                } => kakeibo::AppCommand::SubsAdd {
                    service,
                    amount,
                    category,
                    pay_day,
                    memo,
                },
                SubsCommands::Remove { position, yes } => {
                    kakeibo::AppCommand::SubsRemove { position, yes }
                }
            },
            Commands::Memo { text } => kakeibo::AppCommand::Memo { text },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(cmd) => kakeibo::run_command(cmd.into(), cli.config_path.as_deref(), &cli.user).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

fn setup() -> anyhow::Result<()> {
    use anyhow::Context;

    let path = kakeibo::config::AppConfig::default_config_path()?;

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = r#"---
sheet:
  base_url: "http://localhost:8900"
  users:
    default: "household"

providers:
  coingecko:
    base_url: "https://api.coingecko.com"
  dexscreener:
    base_url: "https://api.dexscreener.com"
  chart:
    base_url: "https://query1.finance.yahoo.com"

currency: "JPY"
"#;

    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}
