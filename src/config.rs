//! Configuration for vitalog binaries
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;

/// MongoDB connection configuration, shared by every binary
#[derive(Parser, Debug, Clone)]
pub struct MongoArgs {
    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "vitalog")]
    pub mongodb_db: String,
}

/// Logging configuration, shared by every binary
#[derive(Parser, Debug, Clone)]
pub struct LogArgs {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl LogArgs {
    /// Default EnvFilter directive when RUST_LOG is not set
    pub fn filter_directive(&self) -> String {
        format!("vitalog={},info", self.log_level)
    }
}
