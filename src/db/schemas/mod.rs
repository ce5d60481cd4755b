//! Database schemas for vitalog
//!
//! Defines MongoDB document structures for the raw activity logs, the
//! progress ledger, and the achievement catalog and grants.

mod achievement;
mod grant;
mod meal;
mod metadata;
mod progress;
mod sleep_log;
mod water_log;
mod workout;

pub use achievement::{
    Criteria, LogKind, MasterAchievementDoc, MetricField, MASTER_ACHIEVEMENT_COLLECTION,
};
pub use grant::{UserAchievementDoc, USER_ACHIEVEMENT_COLLECTION};
pub use meal::{MealDoc, MEAL_COLLECTION};
pub use metadata::Metadata;
pub use progress::{ProgressDoc, PROGRESS_COLLECTION};
pub use sleep_log::{SleepLogDoc, SLEEP_COLLECTION};
pub use water_log::{WaterLogDoc, WATER_COLLECTION};
pub use workout::{WorkoutDoc, WORKOUT_COLLECTION};
