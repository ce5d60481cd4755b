//! Achievement grant document schema
//!
//! The compound unique index on (userId, type) is the final authority for
//! at-most-once awarding: a racing insert that collides is a no-op, not an
//! error.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for per-user achievement grants
pub const USER_ACHIEVEMENT_COLLECTION: &str = "userAchievements";

/// Record that a user has earned an achievement
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserAchievementDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Owning user
    pub user_id: ObjectId,

    /// Achievement identifier from the catalog
    #[serde(rename = "type")]
    pub achievement_type: String,

    pub earned_at: DateTime,
}

impl UserAchievementDoc {
    pub fn new(user_id: ObjectId, achievement_type: impl Into<String>) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            user_id,
            achievement_type: achievement_type.into(),
            earned_at: DateTime::now(),
        }
    }
}

impl IntoIndexes for UserAchievementDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            // At most one grant per (user, achievement)
            doc! { "userId": 1, "type": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("user_type_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for UserAchievementDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
