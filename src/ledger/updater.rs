//! Progress ledger updater
//!
//! Translates a log-entry mutation into signed deltas against the per-day
//! ledger rows. An update whose before/after images share a calendar day is
//! collapsed into one net delta, keeping the partial-failure window to a
//! single storage operation; only a day change splits into two.

use std::sync::Arc;

use bson::oid::ObjectId;
use chrono::NaiveDate;
use tracing::debug;

use crate::activity::LogEntry;
use crate::ledger::{LedgerDelta, LedgerStore};
use crate::types::{Result, VitalogError};

/// Lifecycle event of a log entry, carrying its before/after images
#[derive(Clone, Debug)]
pub enum LogMutation {
    Created(LogEntry),
    Updated { before: LogEntry, after: LogEntry },
    Deleted(LogEntry),
}

impl LogMutation {
    /// The owning user
    pub fn user_id(&self) -> ObjectId {
        match self {
            LogMutation::Created(e) | LogMutation::Deleted(e) => e.user_id(),
            LogMutation::Updated { after, .. } => after.user_id(),
        }
    }

    /// Reject malformed input before any ledger delta is attempted
    pub fn validate(&self) -> Result<()> {
        match self {
            LogMutation::Created(e) | LogMutation::Deleted(e) => e.validate(),
            LogMutation::Updated { before, after } => {
                if before.user_id() != after.user_id() {
                    return Err(VitalogError::Validation(
                        "Update must not change the owning user".into(),
                    ));
                }
                if before.kind() != after.kind() {
                    return Err(VitalogError::Validation(
                        "Update must not change the log kind".into(),
                    ));
                }
                before.validate()?;
                after.validate()
            }
        }
    }

    /// The signed per-day deltas this mutation implies, in application order
    pub fn ledger_deltas(&self) -> Vec<(NaiveDate, LedgerDelta)> {
        match self {
            LogMutation::Created(e) => vec![(e.day(), contribution(e))],
            LogMutation::Deleted(e) => vec![(e.day(), contribution(e).invert())],
            LogMutation::Updated { before, after } => {
                if before.day() == after.day() {
                    // Same calendar day: one net delta, one storage op
                    vec![(
                        after.day(),
                        contribution(before).invert() + contribution(after),
                    )]
                } else {
                    vec![
                        (before.day(), contribution(before).invert()),
                        (after.day(), contribution(after)),
                    ]
                }
            }
        }
    }
}

/// A log entry's contribution to its day's ledger row
pub fn contribution(entry: &LogEntry) -> LedgerDelta {
    match entry {
        LogEntry::Meal(m) => LedgerDelta {
            calories_consumed: m.calories,
            protein_consumed: m.protein,
            ..Default::default()
        },
        LogEntry::Workout(w) => LedgerDelta {
            workout_minutes: w.duration,
            calories_burned: w.calories,
            ..Default::default()
        },
        LogEntry::Sleep(s) => LedgerDelta {
            sleep_minutes: s.duration,
            ..Default::default()
        },
        LogEntry::Water(w) => LedgerDelta {
            water_ml: w.amount_ml,
            ..Default::default()
        },
    }
}

/// Applies mutation deltas to a ledger store
pub struct LedgerUpdater<L: LedgerStore> {
    store: Arc<L>,
}

impl<L: LedgerStore> LedgerUpdater<L> {
    pub fn new(store: Arc<L>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<L> {
        &self.store
    }

    /// Apply every delta the mutation implies. A failure between the two
    /// ops of a cross-day update leaves drift until the reconciler runs;
    /// callers must not blindly retry.
    pub async fn apply(&self, mutation: &LogMutation) -> Result<()> {
        let user = mutation.user_id();
        for (day, delta) in mutation.ledger_deltas() {
            if delta.is_zero() {
                debug!(user = %user, day = %day, "Skipping zero ledger delta");
                continue;
            }
            self.store.apply_delta(&user, day, &delta).await?;
        }
        Ok(())
    }
}
