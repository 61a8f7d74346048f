//! ReconLab CLI — reconcile raw row sets into the canonical ledger.
//!
//! Commands:
//! - `run` — reconcile JSON row sets (trade history, cash balance, futures
//!   statements, API feed) into the ledger; write JSON/CSV outputs and
//!   print the ambiguity report
//! - `report` — run the pipeline and print only the report, as JSON

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reconlab_core::domain::{
    ApiFeedRow, CashBalanceRow, FuturesStatementRow, TradeHistoryRow,
};
use reconlab_core::{reconcile, ReconcileConfig, ReconcileInputs, ReconcileOutput};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "reconlab",
    about = "ReconLab CLI — brokerage transaction reconciliation"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct InputArgs {
    /// Trade-history rows (JSON array).
    #[arg(long)]
    trades: Option<PathBuf>,

    /// Cash-balance rows (JSON array).
    #[arg(long)]
    cash: Option<PathBuf>,

    /// Futures-statement rows (JSON array).
    #[arg(long)]
    futures: Option<PathBuf>,

    /// API transaction-feed rows (JSON array).
    #[arg(long)]
    feed: Option<PathBuf>,

    /// TOML config file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile row sets into the canonical ledger.
    Run {
        #[command(flatten)]
        inputs: InputArgs,

        /// Write the ledger as a JSON array.
        #[arg(long)]
        ledger_out: Option<PathBuf>,

        /// Export the ledger as CSV.
        #[arg(long)]
        csv_out: Option<PathBuf>,
    },
    /// Run the pipeline and print only the report, as JSON.
    Report {
        #[command(flatten)]
        inputs: InputArgs,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            inputs,
            ledger_out,
            csv_out,
        } => run(inputs, ledger_out, csv_out),
        Commands::Report { inputs } => report(inputs),
    }
}

fn load_inputs(args: &InputArgs) -> Result<(ReconcileInputs, ReconcileConfig)> {
    let config = match &args.config {
        Some(path) => ReconcileConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ReconcileConfig::default(),
    };
    let inputs = ReconcileInputs {
        trade_history: load_rows::<TradeHistoryRow>(args.trades.as_deref())?,
        cash_balance: load_rows::<CashBalanceRow>(args.cash.as_deref())?,
        futures_statements: load_rows::<FuturesStatementRow>(args.futures.as_deref())?,
        api_feed: load_rows::<ApiFeedRow>(args.feed.as_deref())?,
    };
    Ok((inputs, config))
}

fn load_rows<T: DeserializeOwned>(path: Option<&Path>) -> Result<Vec<T>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn run(args: InputArgs, ledger_out: Option<PathBuf>, csv_out: Option<PathBuf>) -> Result<()> {
    let (inputs, config) = load_inputs(&args)?;
    let output = reconcile(&inputs, &config);

    if let Some(path) = &ledger_out {
        std::fs::write(path, output.ledger.to_json()?)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Ledger written to: {}", path.display());
    }
    if let Some(path) = &csv_out {
        export_csv(&output, path)?;
        println!("CSV written to: {}", path.display());
    }

    print_summary(&output);
    Ok(())
}

fn report(args: InputArgs) -> Result<()> {
    let (inputs, config) = load_inputs(&args)?;
    let output = reconcile(&inputs, &config);
    println!("{}", serde_json::to_string_pretty(&output.report)?);
    Ok(())
}

fn export_csv(output: &ReconcileOutput, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "account",
        "transaction_id",
        "datetime",
        "rowtype",
        "order_id",
        "symbol",
        "underlying",
        "expiration",
        "expcode",
        "side",
        "strike",
        "multiplier",
        "effect",
        "instruction",
        "quantity",
        "price",
        "cost",
        "commissions",
        "fees",
        "description",
    ])?;
    for rec in output.ledger.iter_chronological() {
        writer.write_record([
            rec.account.clone(),
            rec.transaction_id.to_string(),
            rec.datetime.to_string(),
            format!("{:?}", rec.rowtype),
            rec.order_id.map(|o| o.to_string()).unwrap_or_default(),
            rec.instrument.to_string(),
            rec.instrument.underlying().to_string(),
            rec.instrument
                .expiration()
                .map(|d| d.to_string())
                .unwrap_or_default(),
            rec.instrument.expcode().unwrap_or_default(),
            rec.instrument
                .side()
                .map(|s| format!("{s:?}"))
                .unwrap_or_default(),
            rec.instrument
                .strike()
                .map(|s| s.to_string())
                .unwrap_or_default(),
            rec.multiplier.to_string(),
            rec.effect.map(|e| format!("{e:?}")).unwrap_or_default(),
            rec.instruction
                .map(|i| format!("{i:?}"))
                .unwrap_or_default(),
            rec.quantity.to_string(),
            rec.price.to_string(),
            rec.cost.to_string(),
            rec.commissions.to_string(),
            rec.fees.to_string(),
            rec.description.clone().unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn print_summary(output: &ReconcileOutput) {
    println!();
    println!("=== Reconciliation Result ===");
    println!("Records:        {}", output.ledger.len());
    println!("Non-trade rows: {}", output.nontrade.len());
    println!("Row errors:     {}", output.report.row_errors.len());
    println!("Ambiguities:    {}", output.report.ambiguities.len());

    if !output.report.row_errors.is_empty() {
        println!();
        println!("--- Row Errors ---");
        for issue in &output.report.row_errors {
            println!(
                "{} [{}] {}",
                issue.account,
                issue
                    .datetime
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".into()),
                issue.message
            );
        }
    }

    if !output.report.ambiguities.is_empty() {
        println!();
        println!("--- Ambiguities ---");
        for ambiguity in &output.report.ambiguities {
            match serde_json::to_string(ambiguity) {
                Ok(line) => println!("{line}"),
                Err(_) => println!("{ambiguity:?}"),
            }
        }
    }
}
