//! Meal log document schema

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::types::{Result, VitalogError};

/// Collection name for meal logs
pub const MEAL_COLLECTION: &str = "meals";

/// A single logged meal
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MealDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Owning user
    pub user_id: ObjectId,

    pub food_name: String,

    /// Calories consumed
    pub calories: f64,

    /// Grams of protein consumed
    #[serde(default)]
    pub protein: f64,

    /// When the meal was eaten
    pub date: DateTime,
}

impl MealDoc {
    pub fn new(user_id: ObjectId, food_name: String, calories: f64, protein: f64, date: DateTime) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            user_id,
            food_name,
            calories,
            protein,
            date,
        }
    }

    /// Reject malformed input before any ledger delta is attempted
    pub fn validate(&self) -> Result<()> {
        if self.food_name.trim().is_empty() {
            return Err(VitalogError::Validation("Food name is required".into()));
        }
        if !self.calories.is_finite() || self.calories < 0.0 {
            return Err(VitalogError::Validation(
                "Meal calories must be a non-negative number".into(),
            ));
        }
        if !self.protein.is_finite() || self.protein < 0.0 {
            return Err(VitalogError::Validation(
                "Meal protein must be a non-negative number".into(),
            ));
        }
        Ok(())
    }
}

impl IntoIndexes for MealDoc {
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

impl MutMetadata for MealDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
