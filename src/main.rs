use std::path::{Path, PathBuf};

use clap::Parser;
use order_ledger::{
    config::LedgerConfig, models::OrderRecord, observability, services::LedgerService,
};
use serde::Serialize;
use tokio::io::AsyncReadExt;

/// CLI arguments for the order ledger
#[derive(Parser, Debug)]
#[command(version, about = "Order ledger: dedup, ingest and retain order records", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to config file (defaults to built-in settings)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the store and its backups (overrides the config file)
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Print the orders from a JSON array that are not stored yet
    Dedup {
        /// JSON file with order records, `-` for stdin
        input: PathBuf,
    },
    /// Store orders under a new run, flush old runs and back up the store
    Ingest {
        /// JSON file with order records, `-` for stdin
        input: PathBuf,
    },
    /// Print the orders table
    Show {
        /// Newest last_update first
        #[arg(long)]
        by_last_update: bool,
    },
    /// Delete runs (and their orders) older than the archive age
    Flush {
        /// Age threshold in days (defaults to retention.archive_days)
        #[arg(long)]
        days: Option<u32>,
        /// Report what would be deleted without deleting
        #[arg(long)]
        dry_run: bool,
    },
    /// Write a snapshot of the store to a file
    Backup {
        /// Destination file
        destination: PathBuf,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match LedgerConfig::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load config from {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => LedgerConfig::default(),
    };
    if let Some(dir) = args.output_dir {
        config.storage.output_dir = dir;
    }

    if let Err(e) = observability::init_tracing(&config.observability) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    tracing::debug!(
        output_dir = %config.storage.output_dir.display(),
        "Using order store in {}",
        config.storage.output_dir.display()
    );

    let ledger = match LedgerService::open(config).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(error = %e, "Failed to open order store");
            std::process::exit(1);
        }
    };

    let outcome = match args.command {
        Command::Dedup { input } => match read_orders(&input).await {
            Ok(orders) => ledger
                .new_orders_only(orders)
                .await
                .map_err(|e| e.to_string())
                .and_then(|fresh| print_json(&fresh)),
            Err(e) => {
                ledger.close().await;
                Err(e)
            }
        },
        Command::Ingest { input } => match read_orders(&input).await {
            Ok(orders) => ledger
                .ingest(&orders)
                .await
                .map_err(|e| e.to_string())
                .and_then(|report| print_json(&report)),
            Err(e) => {
                ledger.close().await;
                Err(e)
            }
        },
        Command::Show { by_last_update } => ledger
            .list_orders(by_last_update)
            .await
            .map_err(|e| e.to_string())
            .and_then(|orders| print_json(&orders)),
        Command::Flush { days, dry_run } => ledger
            .flush(days, dry_run)
            .await
            .map_err(|e| e.to_string())
            .and_then(|result| print_json(&result)),
        Command::Backup { destination } => ledger
            .backup(&destination)
            .await
            .map_err(|e| e.to_string()),
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Read a JSON array of order records from a file, or stdin for `-`.
async fn read_orders(input: &Path) -> Result<Vec<OrderRecord>, String> {
    let contents = if input == Path::new("-") {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .map_err(|e| format!("Failed to read orders from stdin: {}", e))?;
        buf
    } else {
        tokio::fs::read_to_string(input)
            .await
            .map_err(|e| format!("Failed to read {}: {}", input.display(), e))?
    };

    let orders: Vec<OrderRecord> = serde_json::from_str(&contents)
        .map_err(|e| format!("Invalid order records in {}: {}", input.display(), e))?;
    tracing::debug!(count = orders.len(), "Loaded order records");
    Ok(orders)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize output: {}", e))?;
    println!("{}", json);
    Ok(())
}
