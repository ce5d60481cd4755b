//! Achievement grant store
//!
//! A grant is created once, the first moment its criteria hold. The unique
//! (userId, type) index is the final authority against races: an insert
//! that collides with an existing grant is reported as `AlreadyGranted`,
//! never as an error.

use std::collections::HashSet;

use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use mongodb::error::{ErrorKind, WriteFailure};
use tokio::sync::RwLock;

use crate::db::schemas::{UserAchievementDoc, USER_ACHIEVEMENT_COLLECTION};
use crate::db::{MongoClient, MongoCollection};
use crate::types::{Result, VitalogError};

/// Result of a grant attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrantOutcome {
    /// This attempt created the grant
    Granted,
    /// Another attempt got there first; success-no-op
    AlreadyGranted,
}

/// Persistence of per-user achievement grants
#[async_trait]
pub trait GrantStore: Send + Sync {
    async fn is_granted(&self, user: &ObjectId, achievement_type: &str) -> Result<bool>;

    /// Attempt to create a grant. Must be safe under concurrent attempts
    /// for the same (user, type): exactly one caller observes `Granted`.
    async fn try_grant(&self, user: &ObjectId, achievement_type: &str) -> Result<GrantOutcome>;
}

/// MongoDB-backed grant store
pub struct MongoGrantStore {
    collection: MongoCollection<UserAchievementDoc>,
}

impl MongoGrantStore {
    pub async fn new(mongo: &MongoClient) -> Result<Self> {
        Ok(Self {
            collection: mongo.collection(USER_ACHIEVEMENT_COLLECTION).await?,
        })
    }
}

/// MongoDB duplicate-key write error (code 11000)
fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    matches!(
        *error.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref write_error)) if write_error.code == 11000
    )
}

#[async_trait]
impl GrantStore for MongoGrantStore {
    async fn is_granted(&self, user: &ObjectId, achievement_type: &str) -> Result<bool> {
        Ok(self
            .collection
            .find_one(doc! { "userId": user, "type": achievement_type })
            .await?
            .is_some())
    }

    async fn try_grant(&self, user: &ObjectId, achievement_type: &str) -> Result<GrantOutcome> {
        let grant = UserAchievementDoc::new(*user, achievement_type);

        // Insert directly so the duplicate-key error stays inspectable;
        // the unique index resolves the race.
        match self.collection.inner().insert_one(grant).await {
            Ok(_) => Ok(GrantOutcome::Granted),
            Err(e) if is_duplicate_key(&e) => Ok(GrantOutcome::AlreadyGranted),
            Err(e) => Err(VitalogError::Database(format!("Grant insert failed: {}", e))),
        }
    }
}

/// In-memory grant store for tests and embedding
pub struct InMemoryGrantStore {
    grants: RwLock<HashSet<(ObjectId, String)>>,
}

impl InMemoryGrantStore {
    pub fn new() -> Self {
        Self {
            grants: RwLock::new(HashSet::new()),
        }
    }

    /// All achievement types granted to a user
    pub async fn granted_types(&self, user: &ObjectId) -> Vec<String> {
        let mut types: Vec<String> = self
            .grants
            .read()
            .await
            .iter()
            .filter(|(u, _)| u == user)
            .map(|(_, t)| t.clone())
            .collect();
        types.sort();
        types
    }
}

impl Default for InMemoryGrantStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GrantStore for InMemoryGrantStore {
    async fn is_granted(&self, user: &ObjectId, achievement_type: &str) -> Result<bool> {
        Ok(self
            .grants
            .read()
            .await
            .contains(&(*user, achievement_type.to_string())))
    }

    async fn try_grant(&self, user: &ObjectId, achievement_type: &str) -> Result<GrantOutcome> {
        // Holding the write lock across the insert mirrors the unique
        // index: exactly one concurrent attempt wins.
        let inserted = self
            .grants
            .write()
            .await
            .insert((*user, achievement_type.to_string()));

        Ok(if inserted {
            GrantOutcome::Granted
        } else {
            GrantOutcome::AlreadyGranted
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_grant_attempt_is_a_no_op() {
        let store = InMemoryGrantStore::new();
        let user = ObjectId::new();

        assert_eq!(
            store.try_grant(&user, "FiveMeals").await.unwrap(),
            GrantOutcome::Granted
        );
        assert_eq!(
            store.try_grant(&user, "FiveMeals").await.unwrap(),
            GrantOutcome::AlreadyGranted
        );
        assert!(store.is_granted(&user, "FiveMeals").await.unwrap());
        assert_eq!(store.granted_types(&user).await, vec!["FiveMeals"]);
    }

    #[tokio::test]
    async fn grants_are_scoped_per_user() {
        let store = InMemoryGrantStore::new();
        let alice = ObjectId::new();
        let bob = ObjectId::new();

        store.try_grant(&alice, "FirstWorkout").await.unwrap();
        assert!(!store.is_granted(&bob, "FirstWorkout").await.unwrap());
        assert_eq!(
            store.try_grant(&bob, "FirstWorkout").await.unwrap(),
            GrantOutcome::Granted
        );
    }
}
