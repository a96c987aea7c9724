//! In-memory `UserStore`.
//!
//! Backs tests and single-process deployments. DashMap's per-entry
//! locking is what makes the rotation compare-and-swap atomic per
//! identity.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use super::{NewUser, StoreError, UserRecord, UserStore};
use crate::models::auth::User;

/// `UserStore` over two concurrent maps: records by user id, plus an
/// email index for uniqueness and lookup.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: DashMap<String, UserRecord>,
    email_index: DashMap<String, String>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let Some(id) = self.email_index.get(email).map(|r| r.value().clone()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|r| r.value().clone()))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(id).map(|r| r.value().user.clone()))
    }

    async fn create(&self, new_user: NewUser) -> Result<Option<User>, StoreError> {
        // The vacant entry holds the email's shard lock until the id is
        // indexed, so a concurrent create with the same email loses.
        match self.email_index.entry(new_user.email.clone()) {
            Entry::Occupied(_) => Ok(None),
            Entry::Vacant(slot) => {
                let user = User {
                    id: Uuid::new_v4().to_string(),
                    email: new_user.email,
                    name: new_user.name,
                };
                self.users.insert(
                    user.id.clone(),
                    UserRecord {
                        user: user.clone(),
                        password_hash: new_user.password_hash,
                        refresh_token_hash: None,
                    },
                );
                slot.insert(user.id.clone());
                Ok(Some(user))
            }
        }
    }

    async fn replace_refresh_token(&self, user_id: &str, digest: &str) -> Result<(), StoreError> {
        if let Some(mut record) = self.users.get_mut(user_id) {
            record.refresh_token_hash = Some(digest.to_string());
        }
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        user_id: &str,
        expected: &str,
        new: &str,
    ) -> Result<bool, StoreError> {
        // The get_mut guard holds the entry lock for the whole
        // compare-and-swap.
        let Some(mut record) = self.users.get_mut(user_id) else {
            return Ok(false);
        };
        if record.refresh_token_hash.as_deref() != Some(expected) {
            return Ok(false);
        }
        record.refresh_token_hash = Some(new.to_string());
        Ok(true)
    }

    async fn clear_refresh_token(&self, user_id: &str) -> Result<(), StoreError> {
        if let Some(mut record) = self.users.get_mut(user_id) {
            record.refresh_token_hash = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    async fn create_user(store: &MemoryUserStore) -> User {
        store
            .create(NewUser {
                email: "a@x.com".into(),
                name: "A".into(),
                password_hash: "hash".into(),
            })
            .await
            .expect("create")
            .expect("email free")
    }

    #[tokio::test]
    async fn create_rejects_duplicate_email() {
        let store = MemoryUserStore::new();
        let user = create_user(&store).await;

        let duplicate = store
            .create(NewUser {
                email: "a@x.com".into(),
                name: "B".into(),
                password_hash: "other".into(),
            })
            .await
            .expect("create");
        assert!(duplicate.is_none());

        let found = store
            .find_by_email("a@x.com")
            .await
            .expect("find")
            .expect("present");
        assert_eq!(user.id, found.user.id);
        assert_eq!("A", found.user.name);
    }

    #[tokio::test]
    async fn rotate_requires_matching_digest() {
        let store = MemoryUserStore::new();
        let user = create_user(&store).await;

        // Nothing stored yet.
        assert!(!store
            .rotate_refresh_token(&user.id, "old", "new")
            .await
            .expect("rotate"));

        store
            .replace_refresh_token(&user.id, "old")
            .await
            .expect("replace");
        assert!(store
            .rotate_refresh_token(&user.id, "old", "new")
            .await
            .expect("rotate"));

        // The superseded digest no longer matches.
        assert!(!store
            .rotate_refresh_token(&user.id, "old", "newer")
            .await
            .expect("rotate"));
        assert!(store
            .rotate_refresh_token(&user.id, "new", "newer")
            .await
            .expect("rotate"));
    }

    #[tokio::test]
    async fn concurrent_rotation_admits_one_winner() {
        let store = Arc::new(MemoryUserStore::new());
        let user = create_user(&store).await;
        store
            .replace_refresh_token(&user.id, "stale")
            .await
            .expect("replace");

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            let user_id = user.id.clone();
            tasks.spawn(async move {
                store
                    .rotate_refresh_token(&user_id, "stale", &format!("fresh-{i}"))
                    .await
                    .expect("rotate")
            });
        }

        let winners = tasks
            .join_all()
            .await
            .into_iter()
            .filter(|rotated| *rotated)
            .count();
        assert_eq!(1, winners);
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let store = MemoryUserStore::new();
        let user = create_user(&store).await;
        store
            .replace_refresh_token(&user.id, "digest")
            .await
            .expect("replace");

        store.clear_refresh_token(&user.id).await.expect("clear");
        store.clear_refresh_token(&user.id).await.expect("clear");

        assert!(!store
            .rotate_refresh_token(&user.id, "digest", "new")
            .await
            .expect("rotate"));
    }
}
