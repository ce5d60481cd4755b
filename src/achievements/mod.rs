//! Achievement catalog, grants, and evaluation

pub mod catalog;
pub mod evaluator;
pub mod grants;

pub use catalog::{default_catalog, AchievementCatalog, InMemoryCatalog, MongoCatalog};
pub use evaluator::AchievementEvaluator;
pub use grants::{GrantOutcome, GrantStore, InMemoryGrantStore, MongoGrantStore};
