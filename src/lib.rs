//! Vitalog - progress-ledger and achievement core for a personal
//! fitness/nutrition tracker
//!
//! Users log meals, workouts, sleep, and water; this crate keeps the
//! per-user, per-day progress ledger consistent as those entries are
//! created, edited, and deleted, and evaluates a catalog of threshold- and
//! streak-based achievements, granting each at most once.
//!
//! ## Components
//!
//! - **Ledger**: signed-delta updates over an atomic increment-or-create
//!   upsert keyed by (user, UTC calendar day)
//! - **Achievements**: catalog-driven evaluation with at-most-once grants
//!   enforced by a unique index
//! - **Reconciler**: idempotent batch merge of duplicate ledger rows
//! - **Pipeline**: the single entry point CRUD handlers call after a raw
//!   log write

pub mod achievements;
pub mod activity;
pub mod calendar;
pub mod config;
pub mod db;
pub mod ledger;
pub mod pipeline;
pub mod types;

pub use pipeline::ProgressTracker;
pub use types::{Result, VitalogError};
