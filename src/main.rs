// src/main.rs
// faultstore CLI - report and inspect rolled-up application errors

use anyhow::Result;
use clap::{Parser, Subcommand};
use faultstore::config::EnvConfig;
use faultstore::{FaultLogger, RequestContext, SqlFaultStore};
use std::io::Read;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "faultstore")]
#[command(about = "Rolled-up application error store")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report an error (detail read from stdin unless --detail is given)
    Report {
        /// Error type name, e.g. TimeoutError
        #[arg(long = "type")]
        error_type: String,

        /// Error message
        #[arg(long)]
        message: String,

        /// Component or module the error came from
        #[arg(long, default_value = "")]
        source: String,

        /// Full detail / stack trace text
        #[arg(long)]
        detail: Option<String>,

        /// HTTP status code to attach (implies request context)
        #[arg(long)]
        status: Option<u16>,
    },

    /// List recent faults, newest first
    Recent {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show one fault as JSON
    Show { guid: Uuid },

    /// Protect a fault from deletion
    Protect { guid: Uuid },

    /// Soft-delete a fault (refused for protected records)
    Delete { guid: Uuid },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env files (global first, then project - project overrides)
    if let Some(home) = dirs::home_dir() {
        let _ = dotenvy::from_path(home.join(".faultstore/.env"));
    }
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = EnvConfig::from_env();
    let store = Arc::new(
        SqlFaultStore::open(&config.db_path)
            .await?
            .with_rollup_window(config.rollup_window),
    );

    match cli.command {
        Commands::Report {
            error_type,
            message,
            source,
            detail,
            status,
        } => {
            let detail = match detail {
                Some(d) => d,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf.trim_end().to_string()
                }
            };

            let context = status.map(|code| RequestContext {
                status_code: Some(code),
                ..RequestContext::default()
            });

            let logger = FaultLogger::new(store, &config.application_name, &config.machine_name)
                .with_rollup_per_server(config.rollup_per_server);
            let outcome = logger
                .report_parts(&error_type, &source, &message, &detail, context)
                .await?;

            if outcome.is_merged() {
                println!("merged into existing record {}", outcome.guid());
            } else {
                println!("recorded new fault {}", outcome.guid());
            }
        }

        Commands::Recent { limit } => {
            let faults = store.recent(limit).await?;
            if faults.is_empty() {
                println!("no faults recorded");
            }
            for fault in faults {
                println!(
                    "{}  {}  x{:<4}  [{}] {}: {}",
                    fault.guid,
                    fault.created_at.format("%Y-%m-%d %H:%M:%S"),
                    fault.duplicate_count,
                    fault.application_name,
                    fault.error_type,
                    fault.message,
                );
            }
        }

        Commands::Show { guid } => match store.get(guid).await? {
            Some(fault) => println!("{}", serde_json::to_string_pretty(&fault)?),
            None => {
                eprintln!("no fault with guid {guid}");
                std::process::exit(1);
            }
        },

        Commands::Protect { guid } => {
            if store.protect(guid).await? {
                println!("protected {guid}");
            } else {
                eprintln!("no fault with guid {guid}");
                std::process::exit(1);
            }
        }

        Commands::Delete { guid } => {
            if store.delete(guid).await? {
                println!("deleted {guid}");
            } else {
                eprintln!("fault {guid} not deleted (missing, protected, or already deleted)");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
