//! Progress ledger document schema
//!
//! One row per (user, UTC calendar day) holding running totals derived from
//! the raw activity logs. The compound unique index is the structural
//! guarantee behind the one-row-per-day invariant; the reconciler exists for
//! rows written before the index did.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for progress ledger rows
pub const PROGRESS_COLLECTION: &str = "progress";

/// Per-user, per-day aggregate of nutrition and activity numbers
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ProgressDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Owning user
    pub user_id: ObjectId,

    /// UTC calendar day, stored at midnight
    pub date: DateTime,

    /// Calories from meals
    #[serde(default)]
    pub calories_consumed: f64,

    /// Grams of protein from meals
    #[serde(default)]
    pub protein_consumed: f64,

    /// Minutes of workout activity
    #[serde(default)]
    pub workout_minutes: f64,

    /// Calories burned in workouts
    #[serde(default)]
    pub calories_burned: f64,

    /// Milliliters of water
    #[serde(default)]
    pub water_ml: f64,

    /// Minutes of sleep
    #[serde(default)]
    pub sleep_minutes: f64,
}

impl ProgressDoc {
    /// A zeroed row for the given key
    pub fn empty(user_id: ObjectId, date: DateTime) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            user_id,
            date,
            calories_consumed: 0.0,
            protein_consumed: 0.0,
            workout_minutes: 0.0,
            calories_burned: 0.0,
            water_ml: 0.0,
            sleep_minutes: 0.0,
        }
    }

    /// A correct event history never drives a field negative; a negative
    /// value is a corruption signal for monitoring.
    pub fn has_negative_fields(&self) -> bool {
        self.calories_consumed < 0.0
            || self.protein_consumed < 0.0
            || self.workout_minutes < 0.0
            || self.calories_burned < 0.0
            || self.water_ml < 0.0
            || self.sleep_minutes < 0.0
    }
}

impl IntoIndexes for ProgressDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            // One ledger row per (user, day)
            doc! { "userId": 1, "date": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("user_day_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for ProgressDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
