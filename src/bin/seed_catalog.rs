//! Vitalog Seed - administer the achievement catalog
//!
//! Upserts the default achievement definitions by their unique type, so
//! re-seeding is idempotent and existing grants are untouched.
//!
//! Environment variables:
//!   MONGODB_URI - MongoDB connection URI (default: mongodb://localhost:27017)
//!   MONGODB_DB  - Database name (default: vitalog)
//!   LOG_LEVEL   - Log level (default: info)

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vitalog::achievements::{default_catalog, MongoCatalog};
use vitalog::config::{LogArgs, MongoArgs};
use vitalog::db::MongoClient;

#[derive(Parser, Debug)]
#[command(name = "vitalog-seed")]
#[command(about = "Seed the achievement catalog")]
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

    let mongo = match MongoClient::new(&args.mongo.mongodb_uri, &args.mongo.mongodb_db).await {
        Ok(client) => client,
        Err(e) => {
            error!("MongoDB connection failed: {}", e);
            std::process::exit(1);
        }
    };

    let catalog = MongoCatalog::new(&mongo).await?;

    let definitions = default_catalog();
    for definition in &definitions {
        catalog.upsert_definition(definition).await?;
        info!(achievement = %definition.achievement_type, "Seeded achievement definition");
    }

    info!(count = definitions.len(), "Achievement catalog seeded");
    Ok(())
}
