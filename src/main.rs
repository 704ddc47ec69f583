//! # Vigia Main Entry Point
//!
//! CLI for the Vigia service: run the HTTP surface, trigger sync runs,
//! execute alert passes, and seed default configuration.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use migration::MigratorTrait;

use vigia::config::ConfigLoader;
use vigia::engine::ThresholdAlertEngine;
use vigia::marketplace::types::OrderWindow;
use vigia::marketplace::{MarketplaceApi, RequestBudget};
use vigia::orchestrator::{SyncOrchestrator, SyncRequest};
use vigia::seeds::seed_default_thresholds;
use vigia::server::run_server;
use vigia::{db, telemetry};

#[derive(Parser)]
#[command(name = "vigia", about = "Marketplace sync and threshold alerting service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API server
    Serve,
    /// Synchronize a time window of marketplace orders
    Sync {
        /// Window start (RFC 3339)
        #[arg(long)]
        start: String,
        /// Window end (RFC 3339)
        #[arg(long)]
        end: String,
        /// Restrict the run to one channel
        #[arg(long)]
        channel: Option<String>,
        /// Bypass the minimum-interval guard
        #[arg(long)]
        force: bool,
    },
    /// Run one order alert pass
    AlertsPass,
    /// Run one stock alert pass
    StockPass,
    /// Seed default threshold configurations
    SeedThresholds,
}

fn parse_instant(value: &str, field: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid {} timestamp '{}': {}", field, value, e))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration from layered env files and variables
    let config_loader = ConfigLoader::new();
    let config = config_loader.load()?;

    telemetry::init_tracing(&config)?;

    let db = db::init_pool(&config).await?;
    migration::Migrator::up(&db, None).await?;

    match cli.command {
        Command::Serve => {
            println!("Loaded configuration for profile: {}", config.profile);
            if let Ok(redacted_json) = config.redacted_json() {
                println!("Configuration: {}", redacted_json);
            }
            run_server(config, db).await?;
        }
        Command::Sync {
            start,
            end,
            channel,
            force,
        } => {
            let start = parse_instant(&start, "start")?;
            let end = parse_instant(&end, "end")?;

            let budget = RequestBudget::new(&config.rate_limit);
            let api = MarketplaceApi::new(config.marketplace.clone(), budget)?;
            let orchestrator =
                SyncOrchestrator::new(Arc::new(db), api, config.sync.clone());

            let job = orchestrator
                .run_window_sync(SyncRequest {
                    window: OrderWindow::new(start, end),
                    channel,
                    force,
                })
                .await?;

            println!(
                "Job {} finished with status '{}' ({}/{} records, {} api calls)",
                job.id, job.status, job.current, job.total, job.api_calls
            );
            if let Some(detail) = job.error_detail {
                println!("Error detail: {}", detail);
            }
        }
        Command::AlertsPass => {
            let engine = ThresholdAlertEngine::new(&db);
            let outcome = engine.run_order_pass().await?;
            println!(
                "Order pass: {} evaluated, {} created, {} escalated, {} resolved, {} skipped (no config)",
                outcome.evaluated,
                outcome.created,
                outcome.escalated,
                outcome.resolved,
                outcome.skipped_missing_config
            );
        }
        Command::StockPass => {
            let engine = ThresholdAlertEngine::new(&db);
            let outcome = engine.run_stock_pass().await?;
            println!(
                "Stock pass: {} evaluated, {} created, {} escalated, {} resolved",
                outcome.evaluated, outcome.created, outcome.escalated, outcome.resolved
            );
        }
        Command::SeedThresholds => {
            let created = seed_default_thresholds(&db).await?;
            println!("Seeded {} threshold configurations", created);
        }
    }

    Ok(())
}
