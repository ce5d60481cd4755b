//! Workout log document schema

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::types::{Result, VitalogError};

/// Collection name for workout logs
pub const WORKOUT_COLLECTION: &str = "workouts";

/// A single logged workout session
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Owning user
    pub user_id: ObjectId,

    /// Activity name (e.g. "Running", "Cycling")
    #[serde(rename = "type")]
    pub workout_type: String,

    /// Duration in minutes
    pub duration: f64,

    /// Calories burned
    pub calories: f64,

    /// When the workout happened
    pub date: DateTime,
}

impl WorkoutDoc {
    pub fn new(user_id: ObjectId, workout_type: String, duration: f64, calories: f64, date: DateTime) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            user_id,
            workout_type,
            duration,
            calories,
            date,
        }
    }

    /// Reject malformed input before any ledger delta is attempted
    pub fn validate(&self) -> Result<()> {
        if self.workout_type.trim().is_empty() {
            return Err(VitalogError::Validation("Workout type is required".into()));
        }
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(VitalogError::Validation(
                "Workout duration must be greater than 0".into(),
            ));
        }
        if !self.calories.is_finite() || self.calories < 0.0 {
            return Err(VitalogError::Validation(
                "Workout calories must be a non-negative number".into(),
            ));
        }
        Ok(())
    }
}

impl IntoIndexes for WorkoutDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "userId": 1, "date": -1 },
            Some(
                IndexOptions::builder()
                    .name("user_date_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for WorkoutDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_duration() {
        let w = WorkoutDoc::new(ObjectId::new(), "Running".into(), 0.0, 300.0, DateTime::now());
        assert!(w.validate().is_err());

        let w = WorkoutDoc::new(ObjectId::new(), "Running".into(), 30.0, 300.0, DateTime::now());
        assert!(w.validate().is_ok());
    }

    #[test]
    fn rejects_missing_type() {
        let w = WorkoutDoc::new(ObjectId::new(), "  ".into(), 30.0, 300.0, DateTime::now());
        assert!(w.validate().is_err());
    }
}
