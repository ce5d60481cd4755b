//! Achievement evaluator
//!
//! Evaluates every catalog definition against a user's history and grants
//! any not-yet-held achievement whose criteria now hold. Evaluation is
//! read-mostly: its only side effect is grant creation, at most once per
//! (user, type). A catalog read failure aborts the whole pass with no
//! partial grants; callers treat the pass as best-effort.

use std::sync::Arc;

use bson::oid::ObjectId;
use chrono::NaiveDate;
use tracing::{debug, info};

use crate::achievements::catalog::AchievementCatalog;
use crate::achievements::grants::{GrantOutcome, GrantStore};
use crate::activity::ActivityStore;
use crate::calendar::{trailing_days, utc_today, window_start};
use crate::db::schemas::Criteria;
use crate::types::Result;

/// Evaluates catalog criteria and persists grants
pub struct AchievementEvaluator<C, A, G>
where
    C: AchievementCatalog,
    A: ActivityStore,
    G: GrantStore,
{
    catalog: Arc<C>,
    activity: Arc<A>,
    grants: Arc<G>,
}

impl<C, A, G> AchievementEvaluator<C, A, G>
where
    C: AchievementCatalog,
    A: ActivityStore,
    G: GrantStore,
{
    pub fn new(catalog: Arc<C>, activity: Arc<A>, grants: Arc<G>) -> Self {
        Self {
            catalog,
            activity,
            grants,
        }
    }

    /// Evaluate every definition for a user, anchored at the current UTC
    /// day. Returns the types granted by this pass.
    pub async fn evaluate(&self, user: &ObjectId) -> Result<Vec<String>> {
        self.evaluate_at(user, utc_today()).await
    }

    /// Evaluation anchored at an explicit day. Streaks are always anchored
    /// at `today`, not at the most recent log.
    pub async fn evaluate_at(&self, user: &ObjectId, today: NaiveDate) -> Result<Vec<String>> {
        let definitions = self.catalog.load_all().await?;

        let mut newly_granted = Vec::new();
        for definition in definitions {
            if !self.satisfied(user, &definition.criteria, today).await? {
                continue;
            }
            if self
                .grants
                .is_granted(user, &definition.achievement_type)
                .await?
            {
                continue;
            }

            match self
                .grants
                .try_grant(user, &definition.achievement_type)
                .await?
            {
                GrantOutcome::Granted => {
                    info!(user = %user, achievement = %definition.achievement_type, "Achievement unlocked");
                    newly_granted.push(definition.achievement_type);
                }
                GrantOutcome::AlreadyGranted => {
                    // Lost the race to a concurrent pass; not an error
                    debug!(user = %user, achievement = %definition.achievement_type, "Grant race lost");
                }
            }
        }

        Ok(newly_granted)
    }

    async fn satisfied(&self, user: &ObjectId, criteria: &Criteria, today: NaiveDate) -> Result<bool> {
        match criteria {
            Criteria::Count { log_kind, min } => {
                let count = self.activity.count_entries(user, *log_kind).await?;
                Ok(count >= u64::from(*min))
            }

            Criteria::CumulativeSum {
                log_kind,
                field,
                min,
            } => {
                let total = self.activity.sum_field(user, *log_kind, *field).await?;
                Ok(total >= *min)
            }

            Criteria::SingleInstance {
                log_kind,
                field,
                min,
            } => {
                let best = self.activity.max_field(user, *log_kind, *field).await?;
                Ok(best.map_or(false, |v| v >= *min))
            }

            Criteria::ActivityStreak { days } => {
                let start = window_start(today, *days);
                let active = self.activity.active_days_since(user, start).await?;
                // Satisfied only with no gap day in the trailing window;
                // a user who logged nothing today has no streak.
                Ok(trailing_days(today, *days)
                    .iter()
                    .all(|day| active.contains(day)))
            }

            Criteria::ValueStreak {
                log_kind,
                field,
                min,
                length,
            } => {
                let values = self.activity.dated_values(user, *log_kind, *field).await?;
                let mut run = 0u32;
                for (_, value) in values {
                    if value >= *min {
                        run += 1;
                        if run >= *length {
                            return Ok(true);
                        }
                    } else {
                        run = 0;
                    }
                }
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::achievements::catalog::{default_catalog, InMemoryCatalog};
    use crate::achievements::grants::InMemoryGrantStore;
    use crate::activity::{InMemoryActivityStore, LogEntry};
    use crate::db::schemas::{MealDoc, SleepLogDoc, WorkoutDoc};
    use crate::types::VitalogError;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};

    fn harness() -> (
        Arc<InMemoryActivityStore>,
        Arc<InMemoryGrantStore>,
        AchievementEvaluator<InMemoryCatalog, InMemoryActivityStore, InMemoryGrantStore>,
    ) {
        let catalog = Arc::new(InMemoryCatalog::new(default_catalog()));
        let activity = Arc::new(InMemoryActivityStore::new());
        let grants = Arc::new(InMemoryGrantStore::new());
        let evaluator = AchievementEvaluator::new(catalog, activity.clone(), grants.clone());
        (activity, grants, evaluator)
    }

    fn on_day(day: NaiveDate, hour: u32) -> bson::DateTime {
        bson::DateTime::from_chrono(
            Utc.with_ymd_and_hms(2025, 1, 1, hour, 0, 0).unwrap()
                + Duration::days((day - NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()).num_days()),
        )
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    fn meal(user: ObjectId, calories: f64, date: bson::DateTime) -> LogEntry {
        LogEntry::Meal(MealDoc::new(user, "Oatmeal".into(), calories, 12.0, date))
    }

    fn workout(user: ObjectId, calories: f64, date: bson::DateTime) -> LogEntry {
        LogEntry::Workout(WorkoutDoc::new(user, "Running".into(), 30.0, calories, date))
    }

    fn sleep(user: ObjectId, minutes: i64, wake: bson::DateTime) -> LogEntry {
        let bed = bson::DateTime::from_millis(wake.timestamp_millis() - minutes * 60_000);
        LogEntry::Sleep(SleepLogDoc::new(user, bed, wake))
    }

    #[tokio::test]
    async fn count_threshold_requires_five_meals() {
        let (activity, _, evaluator) = harness();
        let user = ObjectId::new();

        for i in 0..4 {
            activity.insert(meal(user, 400.0, on_day(d(10), 8 + i))).await;
        }
        let granted = evaluator.evaluate_at(&user, d(10)).await.unwrap();
        assert!(!granted.contains(&"FiveMeals".to_string()));

        activity.insert(meal(user, 400.0, on_day(d(10), 12))).await;
        let granted = evaluator.evaluate_at(&user, d(10)).await.unwrap();
        assert!(granted.contains(&"FiveMeals".to_string()));
    }

    #[tokio::test]
    async fn cumulative_sum_granted_at_exact_threshold() {
        let (activity, grants, evaluator) = harness();
        let user = ObjectId::new();

        activity.insert(workout(user, 999.0, on_day(d(10), 7))).await;
        evaluator.evaluate_at(&user, d(10)).await.unwrap();
        assert!(!grants.is_granted(&user, "Calories1000").await.unwrap());

        activity.insert(workout(user, 1.0, on_day(d(10), 18))).await;
        let granted = evaluator.evaluate_at(&user, d(10)).await.unwrap();
        assert!(granted.contains(&"Calories1000".to_string()));
    }

    #[tokio::test]
    async fn single_instance_requires_one_long_night() {
        let (activity, grants, evaluator) = harness();
        let user = ObjectId::new();

        activity.insert(sleep(user, 419, on_day(d(10), 6))).await;
        evaluator.evaluate_at(&user, d(10)).await.unwrap();
        assert!(!grants.is_granted(&user, "SleepChampion").await.unwrap());

        activity.insert(sleep(user, 420, on_day(d(11), 6))).await;
        evaluator.evaluate_at(&user, d(11)).await.unwrap();
        assert!(grants.is_granted(&user, "SleepChampion").await.unwrap());
    }

    #[tokio::test]
    async fn activity_streak_fails_on_gap_day() {
        let (activity, grants, evaluator) = harness();
        let user = ObjectId::new();
        let today = d(10);

        // Days D-6..D-2 and D logged, D-1 missing
        for back in [6, 5, 4, 3, 2, 0] {
            let day = today - Duration::days(back);
            activity.insert(meal(user, 400.0, on_day(day, 12))).await;
        }

        evaluator.evaluate_at(&user, today).await.unwrap();
        assert!(!grants.is_granted(&user, "Streak7Days").await.unwrap());
    }

    #[tokio::test]
    async fn activity_streak_granted_on_full_window() {
        let (activity, grants, evaluator) = harness();
        let user = ObjectId::new();
        let today = d(10);

        for back in 0..7 {
            let day = today - Duration::days(back);
            // Mix of meals and workouts; either qualifies
            if back % 2 == 0 {
                activity.insert(meal(user, 400.0, on_day(day, 12))).await;
            } else {
                activity.insert(workout(user, 100.0, on_day(day, 7))).await;
            }
        }

        evaluator.evaluate_at(&user, today).await.unwrap();
        assert!(grants.is_granted(&user, "Streak7Days").await.unwrap());
    }

    #[tokio::test]
    async fn streak_is_anchored_at_today_not_last_log() {
        let (activity, grants, evaluator) = harness();
        let user = ObjectId::new();
        let today = d(10);

        // Seven straight days, but the last of them was yesterday
        for back in 1..=7 {
            let day = today - Duration::days(back);
            activity.insert(meal(user, 400.0, on_day(day, 12))).await;
        }

        evaluator.evaluate_at(&user, today).await.unwrap();
        assert!(!grants.is_granted(&user, "Streak7Days").await.unwrap());
    }

    #[tokio::test]
    async fn value_streak_resets_on_short_night() {
        let (activity, grants, evaluator) = harness();
        let user = ObjectId::new();

        activity.insert(sleep(user, 430, on_day(d(1), 6))).await;
        activity.insert(sleep(user, 440, on_day(d(2), 6))).await;
        activity.insert(sleep(user, 300, on_day(d(3), 6))).await; // resets
        activity.insert(sleep(user, 450, on_day(d(4), 6))).await;
        activity.insert(sleep(user, 460, on_day(d(5), 6))).await;

        evaluator.evaluate_at(&user, d(5)).await.unwrap();
        assert!(!grants.is_granted(&user, "SleepStreak3").await.unwrap());

        activity.insert(sleep(user, 470, on_day(d(6), 6))).await;
        evaluator.evaluate_at(&user, d(6)).await.unwrap();
        assert!(grants.is_granted(&user, "SleepStreak3").await.unwrap());
    }

    #[tokio::test]
    async fn value_streak_counts_same_day_records_separately() {
        let (activity, grants, evaluator) = harness();
        let user = ObjectId::new();

        // Two qualifying sessions waking the same day plus one the next:
        // three records, three counter increments (no de-duplication)
        activity.insert(sleep(user, 430, on_day(d(1), 6))).await;
        activity.insert(sleep(user, 430, on_day(d(1), 22))).await;
        activity.insert(sleep(user, 430, on_day(d(2), 6))).await;

        evaluator.evaluate_at(&user, d(2)).await.unwrap();
        assert!(grants.is_granted(&user, "SleepStreak3").await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_passes_grant_at_most_once() {
        let catalog = Arc::new(InMemoryCatalog::new(default_catalog()));
        let activity = Arc::new(InMemoryActivityStore::new());
        let grants = Arc::new(InMemoryGrantStore::new());
        let evaluator = Arc::new(AchievementEvaluator::new(
            catalog,
            activity.clone(),
            grants.clone(),
        ));

        let user = ObjectId::new();
        for i in 0..5 {
            activity.insert(meal(user, 400.0, on_day(d(10), 8 + i))).await;
        }

        let mut handles = Vec::new();
        for _ in 0..8 {
            let evaluator = evaluator.clone();
            handles.push(tokio::spawn(async move {
                evaluator.evaluate_at(&user, d(10)).await.unwrap()
            }));
        }

        let mut total_new_grants = 0;
        for handle in handles {
            let newly = handle.await.unwrap();
            total_new_grants += newly
                .iter()
                .filter(|t| t.as_str() == "FiveMeals")
                .count();
        }

        assert_eq!(total_new_grants, 1);
        assert!(grants.is_granted(&user, "FiveMeals").await.unwrap());
    }

    struct FailingCatalog;

    #[async_trait]
    impl AchievementCatalog for FailingCatalog {
        async fn load_all(&self) -> Result<Vec<crate::db::schemas::MasterAchievementDoc>> {
            Err(VitalogError::Catalog("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn catalog_failure_aborts_pass_with_no_grants() {
        let activity = Arc::new(InMemoryActivityStore::new());
        let grants = Arc::new(InMemoryGrantStore::new());
        let evaluator =
            AchievementEvaluator::new(Arc::new(FailingCatalog), activity.clone(), grants.clone());

        let user = ObjectId::new();
        for i in 0..5 {
            activity.insert(meal(user, 400.0, on_day(d(10), 8 + i))).await;
        }

        let result = evaluator.evaluate_at(&user, d(10)).await;
        assert!(matches!(result, Err(VitalogError::Catalog(_))));
        assert!(grants.granted_types(&user).await.is_empty());
    }

    #[tokio::test]
    async fn already_held_achievements_are_skipped() {
        let (activity, grants, evaluator) = harness();
        let user = ObjectId::new();

        activity.insert(workout(user, 100.0, on_day(d(10), 7))).await;

        let first = evaluator.evaluate_at(&user, d(10)).await.unwrap();
        assert!(first.contains(&"FirstWorkout".to_string()));

        let second = evaluator.evaluate_at(&user, d(10)).await.unwrap();
        assert!(second.is_empty());
        assert_eq!(grants.granted_types(&user).await, vec!["FirstWorkout"]);
    }
}
