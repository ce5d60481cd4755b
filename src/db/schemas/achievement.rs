//! Achievement catalog document schema
//!
//! Catalog entries are administered out of band (see the `vitalog-seed`
//! binary) and read-only from the evaluator's perspective.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for achievement definitions
pub const MASTER_ACHIEVEMENT_COLLECTION: &str = "masterAchievements";

/// Kind of activity log entry
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum LogKind {
    Meal,
    Workout,
    Sleep,
    Water,
}

impl LogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogKind::Meal => "meal",
            LogKind::Workout => "workout",
            LogKind::Sleep => "sleep",
            LogKind::Water => "water",
        }
    }
}

/// Numeric field of a log entry that criteria can target
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum MetricField {
    Calories,
    Protein,
    DurationMinutes,
    VolumeMl,
}

/// Threshold/criteria descriptor of an achievement definition
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Criteria {
    /// Count of a log kind for the user reaches `min`
    Count { log_kind: LogKind, min: u32 },

    /// Sum of a numeric field across all of the user's entries of a kind
    /// reaches `min`
    CumulativeSum {
        log_kind: LogKind,
        field: MetricField,
        min: f64,
    },

    /// At least one entry of a kind has `field >= min`
    SingleInstance {
        log_kind: LogKind,
        field: MetricField,
        min: f64,
    },

    /// Every one of the trailing `days` UTC calendar days ending today has
    /// at least one meal or workout
    ActivityStreak { days: u32 },

    /// A run of `length` consecutive records of a kind, scanned by date
    /// ascending, each with `field >= min`; the run counter resets on any
    /// failing record. Multiple same-day records are NOT de-duplicated.
    ValueStreak {
        log_kind: LogKind,
        field: MetricField,
        min: f64,
        length: u32,
    },
}

/// Achievement definition stored in the catalog
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MasterAchievementDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Unique achievement identifier (e.g. "FiveMeals")
    #[serde(rename = "type")]
    pub achievement_type: String,

    /// Display name
    pub name: String,

    /// Display description
    pub description: String,

    /// Display icon path
    pub icon_url: String,

    /// When this achievement is earned
    pub criteria: Criteria,
}

impl MasterAchievementDoc {
    pub fn new(
        achievement_type: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        icon_url: impl Into<String>,
        criteria: Criteria,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            achievement_type: achievement_type.into(),
            name: name.into(),
            description: description.into(),
            icon_url: icon_url.into(),
            criteria,
        }
    }
}

impl IntoIndexes for MasterAchievementDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "type": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("type_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for MasterAchievementDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn criteria_deserializes_from_tagged_json() {
        let json = r#"{
            "type": "Calories1000",
            "name": "1000 Calories Burned",
            "description": "Burn 1000 calories in total",
            "iconUrl": "/icons/1000-calories.png",
            "criteria": {
                "kind": "cumulativeSum",
                "logKind": "workout",
                "field": "calories",
                "min": 1000.0
            }
        }"#;

        let def: MasterAchievementDoc = serde_json::from_str(json).unwrap();
        assert_eq!(def.achievement_type, "Calories1000");
        assert_eq!(
            def.criteria,
            Criteria::CumulativeSum {
                log_kind: LogKind::Workout,
                field: MetricField::Calories,
                min: 1000.0,
            }
        );
    }

    #[test]
    fn streak_criteria_round_trips() {
        let criteria = Criteria::ValueStreak {
            log_kind: LogKind::Sleep,
            field: MetricField::DurationMinutes,
            min: 420.0,
            length: 3,
        };
        let json = serde_json::to_string(&criteria).unwrap();
        assert!(json.contains("\"kind\":\"valueStreak\""));
        assert_eq!(serde_json::from_str::<Criteria>(&json).unwrap(), criteria);
    }
}
