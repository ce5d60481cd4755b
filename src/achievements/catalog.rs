//! Achievement catalog repository
//!
//! The catalog is administered out of band and read in full on every
//! evaluation pass. It is an injected read-only dependency rather than a
//! module-level global so tests can swap it for a fixed or failing one.

use async_trait::async_trait;
use bson::doc;

use crate::db::schemas::{
    Criteria, LogKind, MasterAchievementDoc, MetricField, MASTER_ACHIEVEMENT_COLLECTION,
};
use crate::db::{MongoClient, MongoCollection};
use crate::types::{Result, VitalogError};

/// Read-only view of the achievement catalog
#[async_trait]
pub trait AchievementCatalog: Send + Sync {
    /// Every definition, ordered by type. A failure here aborts the whole
    /// evaluation pass.
    async fn load_all(&self) -> Result<Vec<MasterAchievementDoc>>;
}

/// MongoDB-backed catalog
pub struct MongoCatalog {
    collection: MongoCollection<MasterAchievementDoc>,
}

impl MongoCatalog {
    pub async fn new(mongo: &MongoClient) -> Result<Self> {
        Ok(Self {
            collection: mongo.collection(MASTER_ACHIEVEMENT_COLLECTION).await?,
        })
    }

    /// Insert or update a definition by its unique type. Used by the seed
    /// tooling; re-seeding is idempotent.
    pub async fn upsert_definition(&self, def: &MasterAchievementDoc) -> Result<()> {
        let criteria = bson::to_bson(&def.criteria)
            .map_err(|e| VitalogError::Internal(format!("Criteria serialization failed: {}", e)))?;

        self.collection
            .upsert_one(
                doc! { "type": &def.achievement_type },
                doc! {
                    "$set": {
                        "name": &def.name,
                        "description": &def.description,
                        "iconUrl": &def.icon_url,
                        "criteria": criteria,
                        "metadata.updated_at": bson::DateTime::now(),
                    },
                    "$setOnInsert": {
                        "metadata.is_deleted": false,
                        "metadata.created_at": bson::DateTime::now(),
                    },
                },
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl AchievementCatalog for MongoCatalog {
    async fn load_all(&self) -> Result<Vec<MasterAchievementDoc>> {
        self.collection
            .find_many_sorted(doc! {}, doc! { "type": 1 })
            .await
            .map_err(|e| VitalogError::Catalog(e.to_string()))
    }
}

/// Fixed in-memory catalog for tests and embedding
pub struct InMemoryCatalog {
    definitions: Vec<MasterAchievementDoc>,
}

impl InMemoryCatalog {
    pub fn new(definitions: Vec<MasterAchievementDoc>) -> Self {
        Self { definitions }
    }
}

#[async_trait]
impl AchievementCatalog for InMemoryCatalog {
    async fn load_all(&self) -> Result<Vec<MasterAchievementDoc>> {
        Ok(self.definitions.clone())
    }
}

/// The default administered catalog
pub fn default_catalog() -> Vec<MasterAchievementDoc> {
    vec![
        MasterAchievementDoc::new(
            "FirstWorkout",
            "First Workout",
            "Complete your first workout",
            "/icons/first-workout.png",
            Criteria::Count {
                log_kind: LogKind::Workout,
                min: 1,
            },
        ),
        MasterAchievementDoc::new(
            "FiveMeals",
            "Five Meals",
            "Log 5 meals",
            "/icons/five-meals.png",
            Criteria::Count {
                log_kind: LogKind::Meal,
                min: 5,
            },
        ),
        MasterAchievementDoc::new(
            "Streak7Days",
            "7-Day Streak",
            "Workout or log meals 7 days in a row",
            "/icons/7-day-streak.png",
            Criteria::ActivityStreak { days: 7 },
        ),
        MasterAchievementDoc::new(
            "Calories1000",
            "1000 Calories Burned",
            "Burn 1000 calories in total",
            "/icons/1000-calories.png",
            Criteria::CumulativeSum {
                log_kind: LogKind::Workout,
                field: MetricField::Calories,
                min: 1000.0,
            },
        ),
        MasterAchievementDoc::new(
            "SleepChampion",
            "Sleep Champion",
            "Sleep at least 7 hours in one night",
            "/icons/sleep-champion.png",
            Criteria::SingleInstance {
                log_kind: LogKind::Sleep,
                field: MetricField::DurationMinutes,
                min: 420.0,
            },
        ),
        MasterAchievementDoc::new(
            "SleepStreak3",
            "Well Rested",
            "Sleep at least 7 hours, 3 nights in a row",
            "/icons/sleep-streak.png",
            Criteria::ValueStreak {
                log_kind: LogKind::Sleep,
                field: MetricField::DurationMinutes,
                min: 420.0,
                length: 3,
            },
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_types_are_unique() {
        let defs = default_catalog();
        let mut types: Vec<_> = defs.iter().map(|d| d.achievement_type.clone()).collect();
        types.sort();
        types.dedup();
        assert_eq!(types.len(), defs.len());
    }
}
