//! Vitalog Reconciler - one-shot progress ledger repair
//!
//! Merges duplicate per-(user, day) ledger rows back into a single row.
//! Safe to re-run; with no duplicates present it is a no-op. Run it on a
//! schedule or on demand after a migration.
//!
//! Usage:
//!   vitalog-reconciler --mongodb-uri mongodb://localhost:27017
//!
//! Environment variables:
//!   MONGODB_URI - MongoDB connection URI (default: mongodb://localhost:27017)
//!   MONGODB_DB  - Database name (default: vitalog)
//!   LOG_LEVEL   - Log level (default: info)

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vitalog::config::{LogArgs, MongoArgs};
use vitalog::db::MongoClient;
use vitalog::ledger::{LedgerReconciler, MongoLedgerStore};

#[derive(Parser, Debug)]
#[command(name = "vitalog-reconciler")]
#[command(about = "Merge duplicate progress ledger rows")]
#[command(version)]
struct Args {
    #[command(flatten)]
    mongo: MongoArgs,

    #[command(flatten)]
    log: LogArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(args.log.filter_directive())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ledger reconciliation");

    let mongo = match MongoClient::new(&args.mongo.mongodb_uri, &args.mongo.mongodb_db).await {
        Ok(client) => client,
        Err(e) => {
            error!("MongoDB connection failed: {}", e);
            std::process::exit(1);
        }
    };

    let store = Arc::new(MongoLedgerStore::new(&mongo).await?);
    let reconciler = LedgerReconciler::new(store);

    match reconciler.run_once().await {
        Ok(report) => {
            info!(
                groups = report.groups_merged,
                removed = report.rows_removed,
                "Reconciliation finished"
            );
            Ok(())
        }
        Err(e) => {
            error!("Reconciliation failed: {}", e);
            std::process::exit(1);
        }
    }
}
