//! Mutation pipeline
//!
//! Entry point for the log-entry CRUD handlers: after a successful raw
//! write they hand the mutation here. The ledger delta is the mutation's
//! concern and its failure is the caller's failure; achievement evaluation
//! is best-effort and never fails or rolls back the triggering write.

use std::sync::Arc;

use bson::oid::ObjectId;
use tracing::warn;

use crate::achievements::{AchievementCatalog, AchievementEvaluator, GrantStore};
use crate::activity::ActivityStore;
use crate::ledger::{LedgerStore, LedgerUpdater, LogMutation};
use crate::types::Result;

/// Wires the ledger updater and achievement evaluator behind one call
pub struct ProgressTracker<L, C, A, G>
where
    L: LedgerStore,
    C: AchievementCatalog,
    A: ActivityStore,
    G: GrantStore,
{
    updater: LedgerUpdater<L>,
    evaluator: AchievementEvaluator<C, A, G>,
}

impl<L, C, A, G> ProgressTracker<L, C, A, G>
where
    L: LedgerStore,
    C: AchievementCatalog,
    A: ActivityStore,
    G: GrantStore,
{
    pub fn new(ledger: Arc<L>, catalog: Arc<C>, activity: Arc<A>, grants: Arc<G>) -> Self {
        Self {
            updater: LedgerUpdater::new(ledger),
            evaluator: AchievementEvaluator::new(catalog, activity, grants),
        }
    }

    /// Apply a log-entry mutation: validate, post the ledger delta(s),
    /// then run a best-effort achievement pass for the user.
    pub async fn apply(&self, mutation: LogMutation) -> Result<()> {
        mutation.validate()?;
        self.updater.apply(&mutation).await?;

        let user = mutation.user_id();
        if let Err(e) = self.evaluator.evaluate(&user).await {
            // Skipped, not retried; the next mutation re-evaluates
            warn!(user = %user, error = %e, "Achievement evaluation skipped");
        }
        Ok(())
    }

    /// On-demand achievement pass, independent of any mutation
    pub async fn evaluate_achievements(&self, user: &ObjectId) -> Result<Vec<String>> {
        self.evaluator.evaluate(user).await
    }

    pub fn ledger(&self) -> &Arc<L> {
        self.updater.store()
    }
}
