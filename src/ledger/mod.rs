//! Progress ledger
//!
//! One aggregate row per (user, UTC calendar day), maintained incrementally
//! through signed deltas. The only consistency guarantee is that each delta
//! is applied as a single atomic increment-or-create on the (user, day) key;
//! lost deltas leave drift that the reconciler repairs.

pub mod reconciler;
pub mod updater;

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use chrono::NaiveDate;
use mongodb::options::ReturnDocument;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::calendar::{bson_day, day_to_bson};
use crate::db::schemas::{ProgressDoc, PROGRESS_COLLECTION};
use crate::db::{MongoClient, MongoCollection};
use crate::types::{Result, VitalogError};

pub use reconciler::{LedgerReconciler, ReconcileReport};
pub use updater::{LedgerUpdater, LogMutation};

/// Signed adjustment to the numeric fields of one ledger row
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LedgerDelta {
    pub calories_consumed: f64,
    pub protein_consumed: f64,
    pub workout_minutes: f64,
    pub calories_burned: f64,
    pub water_ml: f64,
    pub sleep_minutes: f64,
}

impl LedgerDelta {
    pub fn is_zero(&self) -> bool {
        self.calories_consumed == 0.0
            && self.protein_consumed == 0.0
            && self.workout_minutes == 0.0
            && self.calories_burned == 0.0
            && self.water_ml == 0.0
            && self.sleep_minutes == 0.0
    }

    /// The compensating delta: applied after `self`, restores the row.
    pub fn invert(&self) -> Self {
        Self {
            calories_consumed: -self.calories_consumed,
            protein_consumed: -self.protein_consumed,
            workout_minutes: -self.workout_minutes,
            calories_burned: -self.calories_burned,
            water_ml: -self.water_ml,
            sleep_minutes: -self.sleep_minutes,
        }
    }

    /// Current totals of a ledger row, viewed as a delta from zero
    pub fn from_row(row: &ProgressDoc) -> Self {
        Self {
            calories_consumed: row.calories_consumed,
            protein_consumed: row.protein_consumed,
            workout_minutes: row.workout_minutes,
            calories_burned: row.calories_burned,
            water_ml: row.water_ml,
            sleep_minutes: row.sleep_minutes,
        }
    }

    /// Increment a row's fields in place
    pub fn add_to(&self, row: &mut ProgressDoc) {
        row.calories_consumed += self.calories_consumed;
        row.protein_consumed += self.protein_consumed;
        row.workout_minutes += self.workout_minutes;
        row.calories_burned += self.calories_burned;
        row.water_ml += self.water_ml;
        row.sleep_minutes += self.sleep_minutes;
    }

    /// Overwrite a row's fields with these values (reconciler merge)
    pub fn assign_to(&self, row: &mut ProgressDoc) {
        row.calories_consumed = self.calories_consumed;
        row.protein_consumed = self.protein_consumed;
        row.workout_minutes = self.workout_minutes;
        row.calories_burned = self.calories_burned;
        row.water_ml = self.water_ml;
        row.sleep_minutes = self.sleep_minutes;
    }

    /// MongoDB `$inc` body for this delta
    fn inc_document(&self) -> Document {
        doc! {
            "caloriesConsumed": self.calories_consumed,
            "proteinConsumed": self.protein_consumed,
            "workoutMinutes": self.workout_minutes,
            "caloriesBurned": self.calories_burned,
            "waterMl": self.water_ml,
            "sleepMinutes": self.sleep_minutes,
        }
    }

    /// MongoDB `$set` body overwriting a row's fields with these values
    fn set_document(&self) -> Document {
        doc! {
            "caloriesConsumed": self.calories_consumed,
            "proteinConsumed": self.protein_consumed,
            "workoutMinutes": self.workout_minutes,
            "caloriesBurned": self.calories_burned,
            "waterMl": self.water_ml,
            "sleepMinutes": self.sleep_minutes,
            "metadata.updated_at": bson::DateTime::now(),
        }
    }
}

impl std::ops::Add for LedgerDelta {
    type Output = LedgerDelta;

    fn add(self, other: LedgerDelta) -> LedgerDelta {
        LedgerDelta {
            calories_consumed: self.calories_consumed + other.calories_consumed,
            protein_consumed: self.protein_consumed + other.protein_consumed,
            workout_minutes: self.workout_minutes + other.workout_minutes,
            calories_burned: self.calories_burned + other.calories_burned,
            water_ml: self.water_ml + other.water_ml,
            sleep_minutes: self.sleep_minutes + other.sleep_minutes,
        }
    }
}

/// All ledger rows sharing one (user, day) key, a violation of the unique
/// index that the reconciler merges. Rows are in insertion order.
#[derive(Clone, Debug)]
pub struct DuplicateGroup {
    pub user_id: ObjectId,
    pub day: NaiveDate,
    pub rows: Vec<ProgressDoc>,
}

/// Storage contract for the progress ledger
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Atomic increment-or-create on the (user, day) key. Concurrent deltas
    /// against the same key must compose commutatively.
    async fn apply_delta(&self, user: &ObjectId, day: NaiveDate, delta: &LedgerDelta)
        -> Result<()>;

    /// Ledger rows for a user between two days inclusive, ascending by day
    async fn range(&self, user: &ObjectId, from: NaiveDate, to: NaiveDate)
        -> Result<Vec<ProgressDoc>>;

    /// All (user, day) keys holding more than one row
    async fn duplicate_groups(&self) -> Result<Vec<DuplicateGroup>>;

    /// Overwrite the retained row's fields with the merged totals and
    /// hard-delete the other rows of its group
    async fn merge_rows(
        &self,
        keep: &ObjectId,
        remove: &[ObjectId],
        totals: &LedgerDelta,
    ) -> Result<()>;
}

/// MongoDB-backed ledger store
pub struct MongoLedgerStore {
    collection: MongoCollection<ProgressDoc>,
}

impl MongoLedgerStore {
    pub async fn new(mongo: &MongoClient) -> Result<Self> {
        Ok(Self {
            collection: mongo.collection(PROGRESS_COLLECTION).await?,
        })
    }
}

#[async_trait]
impl LedgerStore for MongoLedgerStore {
    async fn apply_delta(
        &self,
        user: &ObjectId,
        day: NaiveDate,
        delta: &LedgerDelta,
    ) -> Result<()> {
        let filter = doc! { "userId": user, "date": day_to_bson(day) };
        let update = doc! {
            "$inc": delta.inc_document(),
            "$set": { "metadata.updated_at": bson::DateTime::now() },
            "$setOnInsert": {
                "metadata.is_deleted": false,
                "metadata.created_at": bson::DateTime::now(),
            },
        };

        // Single findOneAndUpdate with upsert keeps increment-or-create
        // atomic on the unique (userId, date) key.
        let updated = self
            .collection
            .inner()
            .find_one_and_update(filter, update)
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| VitalogError::Database(format!("Ledger upsert failed: {}", e)))?;

        if let Some(row) = updated {
            if row.has_negative_fields() {
                warn!(
                    user = %user,
                    day = %day,
                    "Ledger row went negative; progress has drifted from the raw logs"
                );
            }
        }

        debug!(user = %user, day = %day, "Applied ledger delta");
        Ok(())
    }

    async fn range(
        &self,
        user: &ObjectId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ProgressDoc>> {
        self.collection
            .find_many_sorted(
                doc! {
                    "userId": user,
                    "date": { "$gte": day_to_bson(from), "$lte": day_to_bson(to) },
                },
                doc! { "date": 1 },
            )
            .await
    }

    async fn duplicate_groups(&self) -> Result<Vec<DuplicateGroup>> {
        let pipeline = vec![
            doc! {
                "$group": {
                    "_id": {
                        "userId": "$userId",
                        "day": { "$dateTrunc": { "date": "$date", "unit": "day" } },
                    },
                    "docs": { "$push": "$$ROOT" },
                    "count": { "$sum": 1 },
                }
            },
            doc! { "$match": { "count": { "$gt": 1 } } },
        ];

        let mut groups = Vec::new();
        for group_doc in self.collection.aggregate(pipeline).await? {
            let key = group_doc
                .get_document("_id")
                .map_err(|e| VitalogError::Database(format!("Malformed group key: {}", e)))?;
            let user_id = key
                .get_object_id("userId")
                .map_err(|e| VitalogError::Database(format!("Malformed group key: {}", e)))?;
            let day = key
                .get_datetime("day")
                .map_err(|e| VitalogError::Database(format!("Malformed group key: {}", e)))?;

            let mut rows: Vec<ProgressDoc> = group_doc
                .get_array("docs")
                .map_err(|e| VitalogError::Database(format!("Malformed group docs: {}", e)))?
                .iter()
                .filter_map(|b| b.as_document())
                .filter_map(|d| bson::from_document(d.clone()).ok())
                .collect();

            // ObjectId order approximates insertion order; the earliest row
            // is the one the merge retains.
            rows.sort_by_key(|r: &ProgressDoc| r._id);

            groups.push(DuplicateGroup {
                user_id,
                day: bson_day(*day),
                rows,
            });
        }
        Ok(groups)
    }

    async fn merge_rows(
        &self,
        keep: &ObjectId,
        remove: &[ObjectId],
        totals: &LedgerDelta,
    ) -> Result<()> {
        self.collection
            .update_one(doc! { "_id": keep }, doc! { "$set": totals.set_document() })
            .await?;
        self.collection
            .delete_many(doc! { "_id": { "$in": remove } })
            .await?;
        Ok(())
    }
}

/// In-memory ledger store for tests and embedding
pub struct InMemoryLedgerStore {
    rows: RwLock<Vec<ProgressDoc>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
        }
    }

    /// Insert a raw row without going through the upsert path. Used to
    /// construct historical states, duplicates included.
    pub async fn insert_row(&self, mut row: ProgressDoc) -> ObjectId {
        let id = row._id.unwrap_or_else(ObjectId::new);
        row._id = Some(id);
        self.rows.write().await.push(row);
        id
    }

    /// Snapshot of all rows, in insertion order
    pub async fn rows(&self) -> Vec<ProgressDoc> {
        self.rows.read().await.clone()
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn apply_delta(
        &self,
        user: &ObjectId,
        day: NaiveDate,
        delta: &LedgerDelta,
    ) -> Result<()> {
        // The write lock makes increment-or-create a single atomic step,
        // mirroring the storage-level upsert guarantee.
        let mut rows = self.rows.write().await;
        let date = day_to_bson(day);

        if let Some(row) = rows
            .iter_mut()
            .find(|r| r.user_id == *user && r.date == date)
        {
            delta.add_to(row);
            if row.has_negative_fields() {
                warn!(user = %user, day = %day, "Ledger row went negative");
            }
        } else {
            let mut row = ProgressDoc::empty(*user, date);
            row._id = Some(ObjectId::new());
            delta.add_to(&mut row);
            rows.push(row);
        }
        Ok(())
    }

    async fn range(
        &self,
        user: &ObjectId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ProgressDoc>> {
        let rows = self.rows.read().await;
        let mut matched: Vec<ProgressDoc> = rows
            .iter()
            .filter(|r| {
                r.user_id == *user && bson_day(r.date) >= from && bson_day(r.date) <= to
            })
            .cloned()
            .collect();
        matched.sort_by_key(|r| r.date);
        Ok(matched)
    }

    async fn duplicate_groups(&self) -> Result<Vec<DuplicateGroup>> {
        let rows = self.rows.read().await;
        let mut groups: Vec<DuplicateGroup> = Vec::new();

        for row in rows.iter() {
            let day = bson_day(row.date);
            if let Some(group) = groups
                .iter_mut()
                .find(|g| g.user_id == row.user_id && g.day == day)
            {
                group.rows.push(row.clone());
            } else {
                groups.push(DuplicateGroup {
                    user_id: row.user_id,
                    day,
                    rows: vec![row.clone()],
                });
            }
        }

        groups.retain(|g| g.rows.len() > 1);
        Ok(groups)
    }

    async fn merge_rows(
        &self,
        keep: &ObjectId,
        remove: &[ObjectId],
        totals: &LedgerDelta,
    ) -> Result<()> {
        let mut rows = self.rows.write().await;
        if let Some(row) = rows.iter_mut().find(|r| r._id == Some(*keep)) {
            totals.assign_to(row);
        }
        rows.retain(|r| !r._id.map_or(false, |id| remove.contains(&id)));
        Ok(())
    }
}
