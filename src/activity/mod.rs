//! Activity log store
//!
//! Read access to the raw user-entered events (meals, workouts, sleep,
//! water). The store is an external collaborator from the core's point of
//! view: CRUD handlers own the writes, the core only queries by user,
//! kind, and date range. The trait seam keeps the achievement evaluator
//! testable without a running MongoDB.

use std::collections::HashSet;

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson, Document};
use chrono::NaiveDate;
use tokio::sync::RwLock;

use crate::calendar::{day_start, utc_day};
use crate::db::schemas::{
    LogKind, MealDoc, MetricField, SleepLogDoc, WaterLogDoc, WorkoutDoc, MEAL_COLLECTION,
    SLEEP_COLLECTION, WATER_COLLECTION, WORKOUT_COLLECTION,
};
use crate::db::{MongoClient, MongoCollection};
use crate::types::Result;

/// A raw activity log record of any kind
#[derive(Clone, Debug)]
pub enum LogEntry {
    Meal(MealDoc),
    Workout(WorkoutDoc),
    Sleep(SleepLogDoc),
    Water(WaterLogDoc),
}

impl LogEntry {
    pub fn kind(&self) -> LogKind {
        match self {
            LogEntry::Meal(_) => LogKind::Meal,
            LogEntry::Workout(_) => LogKind::Workout,
            LogEntry::Sleep(_) => LogKind::Sleep,
            LogEntry::Water(_) => LogKind::Water,
        }
    }

    pub fn user_id(&self) -> ObjectId {
        match self {
            LogEntry::Meal(m) => m.user_id,
            LogEntry::Workout(w) => w.user_id,
            LogEntry::Sleep(s) => s.user_id,
            LogEntry::Water(w) => w.user_id,
        }
    }

    /// The event instant. For sleep this is the wake time.
    pub fn date(&self) -> bson::DateTime {
        match self {
            LogEntry::Meal(m) => m.date,
            LogEntry::Workout(w) => w.date,
            LogEntry::Sleep(s) => s.date,
            LogEntry::Water(w) => w.date,
        }
    }

    /// UTC calendar day of the event
    pub fn day(&self) -> NaiveDate {
        utc_day(self.date().to_chrono())
    }

    /// Value of a numeric field, if the kind carries it
    pub fn field(&self, field: MetricField) -> Option<f64> {
        match (self, field) {
            (LogEntry::Meal(m), MetricField::Calories) => Some(m.calories),
            (LogEntry::Meal(m), MetricField::Protein) => Some(m.protein),
            (LogEntry::Workout(w), MetricField::DurationMinutes) => Some(w.duration),
            (LogEntry::Workout(w), MetricField::Calories) => Some(w.calories),
            (LogEntry::Sleep(s), MetricField::DurationMinutes) => Some(s.duration),
            (LogEntry::Water(w), MetricField::VolumeMl) => Some(w.amount_ml),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            LogEntry::Meal(m) => m.validate(),
            LogEntry::Workout(w) => w.validate(),
            LogEntry::Sleep(s) => s.validate(),
            LogEntry::Water(w) => w.validate(),
        }
    }
}

/// Persisted field name for a (kind, field) pair, if that kind carries it
fn stored_field(kind: LogKind, field: MetricField) -> Option<&'static str> {
    match (kind, field) {
        (LogKind::Meal, MetricField::Calories) => Some("calories"),
        (LogKind::Meal, MetricField::Protein) => Some("protein"),
        (LogKind::Workout, MetricField::DurationMinutes) => Some("duration"),
        (LogKind::Workout, MetricField::Calories) => Some("calories"),
        (LogKind::Sleep, MetricField::DurationMinutes) => Some("duration"),
        (LogKind::Water, MetricField::VolumeMl) => Some("amountMl"),
        _ => None,
    }
}

/// Read-only queries over the activity log store
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Number of entries of a kind for a user
    async fn count_entries(&self, user: &ObjectId, kind: LogKind) -> Result<u64>;

    /// Sum of a numeric field across all of a user's entries of a kind
    async fn sum_field(&self, user: &ObjectId, kind: LogKind, field: MetricField) -> Result<f64>;

    /// Largest single value of a numeric field, if any entry exists
    async fn max_field(
        &self,
        user: &ObjectId,
        kind: LogKind,
        field: MetricField,
    ) -> Result<Option<f64>>;

    /// Distinct UTC calendar days with at least one meal or workout on or
    /// after `since`
    async fn active_days_since(
        &self,
        user: &ObjectId,
        since: NaiveDate,
    ) -> Result<HashSet<NaiveDate>>;

    /// Values of a field across a user's entries of a kind, ordered by
    /// event date ascending. Entries on the same day are NOT collapsed.
    async fn dated_values(
        &self,
        user: &ObjectId,
        kind: LogKind,
        field: MetricField,
    ) -> Result<Vec<(NaiveDate, f64)>>;
}

/// MongoDB-backed activity store
pub struct MongoActivityStore {
    meals: MongoCollection<MealDoc>,
    workouts: MongoCollection<WorkoutDoc>,
    sleep: MongoCollection<SleepLogDoc>,
    water: MongoCollection<WaterLogDoc>,
}

impl MongoActivityStore {
    pub async fn new(mongo: &MongoClient) -> Result<Self> {
        Ok(Self {
            meals: mongo.collection(MEAL_COLLECTION).await?,
            workouts: mongo.collection(WORKOUT_COLLECTION).await?,
            sleep: mongo.collection(SLEEP_COLLECTION).await?,
            water: mongo.collection(WATER_COLLECTION).await?,
        })
    }

    /// Group-accumulate a field over all of a user's entries of a kind
    async fn accumulate(
        &self,
        user: &ObjectId,
        kind: LogKind,
        field: MetricField,
        operator: &str,
    ) -> Result<Option<f64>> {
        let Some(name) = stored_field(kind, field) else {
            return Ok(None);
        };

        let mut accumulator = Document::new();
        accumulator.insert(operator, format!("${}", name));
        let pipeline = vec![
            doc! { "$match": { "userId": user, "metadata.is_deleted": { "$ne": true } } },
            doc! { "$group": { "_id": null, "value": accumulator } },
        ];

        let results = match kind {
            LogKind::Meal => self.meals.aggregate(pipeline).await?,
            LogKind::Workout => self.workouts.aggregate(pipeline).await?,
            LogKind::Sleep => self.sleep.aggregate(pipeline).await?,
            LogKind::Water => self.water.aggregate(pipeline).await?,
        };

        Ok(results.first().and_then(|d| bson_f64(d.get("value"))))
    }
}

fn bson_f64(value: Option<&Bson>) -> Option<f64> {
    match value {
        Some(Bson::Double(v)) => Some(*v),
        Some(Bson::Int32(v)) => Some(f64::from(*v)),
        Some(Bson::Int64(v)) => Some(*v as f64),
        _ => None,
    }
}

#[async_trait]
impl ActivityStore for MongoActivityStore {
    async fn count_entries(&self, user: &ObjectId, kind: LogKind) -> Result<u64> {
        let filter = doc! { "userId": user };
        match kind {
            LogKind::Meal => self.meals.count(filter).await,
            LogKind::Workout => self.workouts.count(filter).await,
            LogKind::Sleep => self.sleep.count(filter).await,
            LogKind::Water => self.water.count(filter).await,
        }
    }

    async fn sum_field(&self, user: &ObjectId, kind: LogKind, field: MetricField) -> Result<f64> {
        Ok(self
            .accumulate(user, kind, field, "$sum")
            .await?
            .unwrap_or(0.0))
    }

    async fn max_field(
        &self,
        user: &ObjectId,
        kind: LogKind,
        field: MetricField,
    ) -> Result<Option<f64>> {
        self.accumulate(user, kind, field, "$max").await
    }

    async fn active_days_since(
        &self,
        user: &ObjectId,
        since: NaiveDate,
    ) -> Result<HashSet<NaiveDate>> {
        let window_start = bson::DateTime::from_chrono(day_start(since));
        let filter = doc! { "userId": user, "date": { "$gte": window_start } };

        let mut days = HashSet::new();
        for meal in self.meals.find_many(filter.clone()).await? {
            days.insert(utc_day(meal.date.to_chrono()));
        }
        for workout in self.workouts.find_many(filter).await? {
            days.insert(utc_day(workout.date.to_chrono()));
        }
        Ok(days)
    }

    async fn dated_values(
        &self,
        user: &ObjectId,
        kind: LogKind,
        field: MetricField,
    ) -> Result<Vec<(NaiveDate, f64)>> {
        if stored_field(kind, field).is_none() {
            return Ok(Vec::new());
        }

        let filter = doc! { "userId": user };
        let sort = doc! { "date": 1 };

        let entries: Vec<LogEntry> = match kind {
            LogKind::Meal => self
                .meals
                .find_many_sorted(filter, sort)
                .await?
                .into_iter()
                .map(LogEntry::Meal)
                .collect(),
            LogKind::Workout => self
                .workouts
                .find_many_sorted(filter, sort)
                .await?
                .into_iter()
                .map(LogEntry::Workout)
                .collect(),
            LogKind::Sleep => self
                .sleep
                .find_many_sorted(filter, sort)
                .await?
                .into_iter()
                .map(LogEntry::Sleep)
                .collect(),
            LogKind::Water => self
                .water
                .find_many_sorted(filter, sort)
                .await?
                .into_iter()
                .map(LogEntry::Water)
                .collect(),
        };

        Ok(entries
            .into_iter()
            .filter_map(|e| e.field(field).map(|v| (e.day(), v)))
            .collect())
    }
}

/// In-memory activity store for tests and embedding
pub struct InMemoryActivityStore {
    entries: RwLock<Vec<LogEntry>>,
}

impl InMemoryActivityStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    pub async fn insert(&self, entry: LogEntry) {
        self.entries.write().await.push(entry);
    }
}

impl Default for InMemoryActivityStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActivityStore for InMemoryActivityStore {
    async fn count_entries(&self, user: &ObjectId, kind: LogKind) -> Result<u64> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|e| e.user_id() == *user && e.kind() == kind)
            .count() as u64)
    }

    async fn sum_field(&self, user: &ObjectId, kind: LogKind, field: MetricField) -> Result<f64> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|e| e.user_id() == *user && e.kind() == kind)
            .filter_map(|e| e.field(field))
            .sum())
    }

    async fn max_field(
        &self,
        user: &ObjectId,
        kind: LogKind,
        field: MetricField,
    ) -> Result<Option<f64>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|e| e.user_id() == *user && e.kind() == kind)
            .filter_map(|e| e.field(field))
            .fold(None, |acc: Option<f64>, v| {
                Some(acc.map_or(v, |a| a.max(v)))
            }))
    }

    async fn active_days_since(
        &self,
        user: &ObjectId,
        since: NaiveDate,
    ) -> Result<HashSet<NaiveDate>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|e| {
                e.user_id() == *user
                    && matches!(e.kind(), LogKind::Meal | LogKind::Workout)
                    && e.day() >= since
            })
            .map(|e| e.day())
            .collect())
    }

    async fn dated_values(
        &self,
        user: &ObjectId,
        kind: LogKind,
        field: MetricField,
    ) -> Result<Vec<(NaiveDate, f64)>> {
        let entries = self.entries.read().await;
        let mut dated: Vec<(bson::DateTime, NaiveDate, f64)> = entries
            .iter()
            .filter(|e| e.user_id() == *user && e.kind() == kind)
            .filter_map(|e| e.field(field).map(|v| (e.date(), e.day(), v)))
            .collect();
        dated.sort_by_key(|(instant, _, _)| *instant);
        Ok(dated.into_iter().map(|(_, day, v)| (day, v)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(y: i32, m: u32, d: u32, h: u32) -> bson::DateTime {
        bson::DateTime::from_chrono(Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap())
    }

    fn meal(user: ObjectId, calories: f64, date: bson::DateTime) -> LogEntry {
        LogEntry::Meal(MealDoc::new(user, "Chicken Salad".into(), calories, 20.0, date))
    }

    #[tokio::test]
    async fn counts_and_sums_per_user_and_kind() {
        let store = InMemoryActivityStore::new();
        let user = ObjectId::new();
        let other = ObjectId::new();

        store.insert(meal(user, 350.0, at(2025, 3, 1, 12))).await;
        store.insert(meal(user, 600.0, at(2025, 3, 2, 18))).await;
        store.insert(meal(other, 999.0, at(2025, 3, 1, 12))).await;
        store
            .insert(LogEntry::Workout(WorkoutDoc::new(
                user,
                "Running".into(),
                30.0,
                300.0,
                at(2025, 3, 1, 7),
            )))
            .await;

        assert_eq!(store.count_entries(&user, LogKind::Meal).await.unwrap(), 2);
        assert_eq!(
            store
                .sum_field(&user, LogKind::Meal, MetricField::Calories)
                .await
                .unwrap(),
            950.0
        );
        assert_eq!(
            store
                .max_field(&user, LogKind::Meal, MetricField::Calories)
                .await
                .unwrap(),
            Some(600.0)
        );
        assert_eq!(
            store
                .max_field(&user, LogKind::Water, MetricField::VolumeMl)
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn active_days_cover_meals_and_workouts_only() {
        let store = InMemoryActivityStore::new();
        let user = ObjectId::new();

        store.insert(meal(user, 350.0, at(2025, 3, 1, 12))).await;
        store
            .insert(LogEntry::Workout(WorkoutDoc::new(
                user,
                "Cycling".into(),
                45.0,
                400.0,
                at(2025, 3, 2, 7),
            )))
            .await;
        store
            .insert(LogEntry::Water(WaterLogDoc::new(
                user,
                250.0,
                at(2025, 3, 3, 9),
            )))
            .await;

        let days = store
            .active_days_since(&user, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())
            .await
            .unwrap();
        assert_eq!(days.len(), 2);
        assert!(!days.contains(&NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()));
    }

    #[tokio::test]
    async fn dated_values_sorted_ascending_without_deduplication() {
        let store = InMemoryActivityStore::new();
        let user = ObjectId::new();

        // Two sleep records waking the same day, inserted out of order
        let night2 = SleepLogDoc::new(user, at(2025, 3, 2, 23), at(2025, 3, 3, 6));
        let nap = SleepLogDoc::new(user, at(2025, 3, 3, 14), at(2025, 3, 3, 15));
        let night1 = SleepLogDoc::new(user, at(2025, 3, 1, 22), at(2025, 3, 2, 6));

        store.insert(LogEntry::Sleep(nap)).await;
        store.insert(LogEntry::Sleep(night1)).await;
        store.insert(LogEntry::Sleep(night2)).await;

        let values = store
            .dated_values(&user, LogKind::Sleep, MetricField::DurationMinutes)
            .await
            .unwrap();

        assert_eq!(values.len(), 3);
        assert_eq!(values[0].1, 480.0); // night1
        assert_eq!(values[1].1, 420.0); // night2
        assert_eq!(values[2].1, 60.0); // same-day nap kept as its own record
        assert!(values.windows(2).all(|w| w[0].0 <= w[1].0));
    }
}
