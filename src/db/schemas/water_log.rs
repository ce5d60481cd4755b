//! Water intake log document schema

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::types::{Result, VitalogError};

/// Collection name for water logs
pub const WATER_COLLECTION: &str = "waterLogs";

/// A single logged water intake
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct WaterLogDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Owning user
    pub user_id: ObjectId,

    /// When the water was logged
    pub date: DateTime,

    /// Volume in milliliters
    pub amount_ml: f64,
}

impl WaterLogDoc {
    pub fn new(user_id: ObjectId, amount_ml: f64, date: DateTime) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            user_id,
            date,
            amount_ml,
        }
    }

    /// Reject malformed input before any ledger delta is attempted
    pub fn validate(&self) -> Result<()> {
        if !self.amount_ml.is_finite() || self.amount_ml <= 0.0 {
            return Err(VitalogError::Validation(
                "Water amount must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

impl IntoIndexes for WaterLogDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "userId": 1, "date": 1 },
            Some(
                IndexOptions::builder()
                    .name("user_date_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for WaterLogDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
