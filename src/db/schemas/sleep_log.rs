//! Sleep log document schema
//!
//! A sleep session's calendar day is the UTC day of the wake time.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::types::{Result, VitalogError};

/// Collection name for sleep logs
pub const SLEEP_COLLECTION: &str = "sleepLogs";

/// A single logged sleep session
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SleepLogDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Owning user
    pub user_id: ObjectId,

    /// Wake-up instant; also the session's calendar day
    pub date: DateTime,

    pub bed_time: DateTime,

    pub wake_time: DateTime,

    /// Sleep duration in minutes, derived from bed/wake times
    pub duration: f64,
}

impl SleepLogDoc {
    /// Create a sleep log from bed and wake instants. Duration is derived,
    /// rounded to whole minutes.
    pub fn new(user_id: ObjectId, bed_time: DateTime, wake_time: DateTime) -> Self {
        let millis = wake_time.timestamp_millis() - bed_time.timestamp_millis();
        let duration = (millis as f64 / 60_000.0).round();
        Self {
            _id: None,
            metadata: Metadata::new(),
            user_id,
            date: wake_time,
            bed_time,
            wake_time,
            duration,
        }
    }

    /// Reject malformed input before any ledger delta is attempted
    pub fn validate(&self) -> Result<()> {
        if self.wake_time.timestamp_millis() <= self.bed_time.timestamp_millis() {
            return Err(VitalogError::Validation(
                "Wake time must be after bed time".into(),
            ));
        }
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(VitalogError::Validation(
                "Sleep duration must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

impl IntoIndexes for SleepLogDoc {
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

impl MutMetadata for SleepLogDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_duration_in_minutes() {
        let bed = DateTime::from_millis(0);
        let wake = DateTime::from_millis(7 * 60 * 60 * 1000 + 30 * 60 * 1000);
        let log = SleepLogDoc::new(ObjectId::new(), bed, wake);
        assert_eq!(log.duration, 450.0);
        assert!(log.validate().is_ok());
    }

    #[test]
    fn rejects_wake_before_bed() {
        let bed = DateTime::from_millis(60_000);
        let wake = DateTime::from_millis(0);
        let log = SleepLogDoc::new(ObjectId::new(), bed, wake);
        assert!(log.validate().is_err());
    }
}
