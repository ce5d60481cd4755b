//! Ledger reconciler
//!
//! Standing batch job that restores the one-row-per-(user, day) invariant.
//! Duplicate rows should be structurally impossible under the unique index,
//! but exist historically from data written before the index and from races
//! during migration. Each duplicate group is merged by summing its numeric
//! fields into the earliest-inserted row and deleting the rest. Running the
//! job with no duplicates present is a no-op, so it is safe on a schedule
//! or on demand.

use std::sync::Arc;

use tracing::{info, warn};

use crate::ledger::{DuplicateGroup, LedgerDelta, LedgerStore};
use crate::types::Result;

/// Outcome of one reconciliation pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Duplicate (user, day) groups merged
    pub groups_merged: usize,
    /// Rows deleted across all groups
    pub rows_removed: usize,
}

/// Merges duplicate progress ledger rows
pub struct LedgerReconciler<L: LedgerStore> {
    store: Arc<L>,
}

impl<L: LedgerStore> LedgerReconciler<L> {
    pub fn new(store: Arc<L>) -> Self {
        Self { store }
    }

    /// Run one full reconciliation pass. Groups are processed one at a
    /// time so an interrupted run leaves at most one group half-merged.
    pub async fn run_once(&self) -> Result<ReconcileReport> {
        let groups = self.store.duplicate_groups().await?;

        if groups.is_empty() {
            info!("Ledger reconciliation: no duplicate rows found");
            return Ok(ReconcileReport::default());
        }

        let mut report = ReconcileReport::default();
        for group in groups {
            report.rows_removed += self.merge_group(&group).await?;
            report.groups_merged += 1;
        }

        info!(
            groups = report.groups_merged,
            removed = report.rows_removed,
            "Ledger reconciliation complete"
        );
        Ok(report)
    }

    /// Merge one duplicate group: the earliest-inserted row is retained
    /// with the field-wise sum of the whole group, the rest are deleted.
    async fn merge_group(&self, group: &DuplicateGroup) -> Result<usize> {
        let totals = group
            .rows
            .iter()
            .fold(LedgerDelta::default(), |acc, row| {
                acc + LedgerDelta::from_row(row)
            });

        let Some(keep) = group.rows.first().and_then(|r| r._id) else {
            warn!(user = %group.user_id, day = %group.day, "Duplicate group has no retainable row");
            return Ok(0);
        };

        let remove: Vec<_> = group
            .rows
            .iter()
            .skip(1)
            .filter_map(|r| r._id)
            .collect();

        info!(
            user = %group.user_id,
            day = %group.day,
            duplicates = remove.len(),
            "Merging duplicate ledger rows"
        );

        self.store.merge_rows(&keep, &remove, &totals).await?;
        Ok(remove.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::ProgressDoc;
    use crate::ledger::InMemoryLedgerStore;
    use bson::oid::ObjectId;
    use chrono::NaiveDate;

    use crate::calendar::day_to_bson;

    fn row(user: ObjectId, day: NaiveDate, calories: f64, minutes: f64) -> ProgressDoc {
        let mut row = ProgressDoc::empty(user, day_to_bson(day));
        row.calories_consumed = calories;
        row.workout_minutes = minutes;
        row
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[tokio::test]
    async fn merges_duplicates_into_earliest_row() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let user = ObjectId::new();

        let first = store.insert_row(row(user, day(1), 300.0, 10.0)).await;
        store.insert_row(row(user, day(1), 200.0, 20.0)).await;
        store.insert_row(row(user, day(1), 100.0, 30.0)).await;
        // A healthy row for another day stays untouched
        store.insert_row(row(user, day(2), 50.0, 5.0)).await;

        let reconciler = LedgerReconciler::new(store.clone());
        let report = reconciler.run_once().await.unwrap();

        assert_eq!(report.groups_merged, 1);
        assert_eq!(report.rows_removed, 2);

        let rows = store.range(&user, day(1), day(1)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]._id, Some(first));
        assert_eq!(rows[0].calories_consumed, 600.0);
        assert_eq!(rows[0].workout_minutes, 60.0);

        let other = store.range(&user, day(2), day(2)).await.unwrap();
        assert_eq!(other.len(), 1);
        assert_eq!(other[0].calories_consumed, 50.0);
    }

    #[tokio::test]
    async fn rerun_is_a_no_op() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let user = ObjectId::new();

        store.insert_row(row(user, day(1), 300.0, 0.0)).await;
        store.insert_row(row(user, day(1), 200.0, 0.0)).await;

        let reconciler = LedgerReconciler::new(store.clone());
        reconciler.run_once().await.unwrap();
        let second = reconciler.run_once().await.unwrap();

        assert_eq!(second, ReconcileReport::default());
        let rows = store.range(&user, day(1), day(1)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].calories_consumed, 500.0);
    }

    #[tokio::test]
    async fn clean_ledger_is_untouched() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let user = ObjectId::new();
        store.insert_row(row(user, day(1), 300.0, 0.0)).await;

        let reconciler = LedgerReconciler::new(store.clone());
        let report = reconciler.run_once().await.unwrap();

        assert_eq!(report, ReconcileReport::default());
        assert_eq!(store.rows().await.len(), 1);
    }

    #[tokio::test]
    async fn groups_split_by_user_and_day() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let alice = ObjectId::new();
        let bob = ObjectId::new();

        store.insert_row(row(alice, day(1), 100.0, 0.0)).await;
        store.insert_row(row(alice, day(1), 100.0, 0.0)).await;
        store.insert_row(row(bob, day(1), 100.0, 0.0)).await;
        store.insert_row(row(bob, day(2), 100.0, 0.0)).await;

        let reconciler = LedgerReconciler::new(store.clone());
        let report = reconciler.run_once().await.unwrap();

        assert_eq!(report.groups_merged, 1);
        assert_eq!(store.rows().await.len(), 3);
    }
}
