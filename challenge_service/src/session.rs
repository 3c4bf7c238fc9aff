//! Identity Boundary
//!
//! Cookie/session mechanics live outside this service; callers arrive with
//! a resolved current-user id. This module exposes the lookups that the
//! rest of the system needs from that boundary: the user's display name,
//! their branch, and the participants they own.

use crate::database::{BranchRow, Database, ParticipantRow, UserRow};

pub type Result<T> = crate::database::Result<T>;

#[derive(Clone)]
pub struct Identity {
    db: Database,
}

impl Identity {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn user(&self, user_id: i64) -> Result<UserRow> {
        self.db.user(user_id).await
    }

    pub async fn user_name(&self, user_id: i64) -> Result<String> {
        Ok(self.db.user(user_id).await?.name)
    }

    pub async fn user_branch(&self, user_id: i64) -> Result<BranchRow> {
        self.db.user_branch(user_id).await
    }

    /// The user's participants, alphabetical.
    pub async fn user_participants(&self, user_id: i64) -> Result<Vec<ParticipantRow>> {
        self.db.participants_for_user(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseError;

    #[tokio::test]
    async fn test_identity_lookups() {
        let db = Database::in_memory().await.unwrap();
        let branch_id = db.create_branch("Northern").await.unwrap();
        let user_id = db
            .create_user("Alice", branch_id, "alice", "secret")
            .await
            .unwrap();
        db.create_participant(user_id, "Ben").await.unwrap();

        let identity = Identity::new(db);
        assert_eq!(identity.user_name(user_id).await.unwrap(), "Alice");
        assert_eq!(identity.user_branch(user_id).await.unwrap().name, "Northern");

        let participants = identity.user_participants(user_id).await.unwrap();
        let names: Vec<&str> = participants.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Ben"]);
    }

    #[tokio::test]
    async fn test_missing_user_is_not_found() {
        let db = Database::in_memory().await.unwrap();
        let identity = Identity::new(db);

        match identity.user_name(42).await {
            Err(DatabaseError::NotFound(_)) => {}
            other => panic!("Expected NotFound, got {:?}", other.map(|_| ())),
        }
    }
}
