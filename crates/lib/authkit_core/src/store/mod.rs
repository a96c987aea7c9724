//! User storage boundary.
//!
//! The session service talks to persistence through the [`UserStore`]
//! trait. Implementations own the atomicity of the refresh-token
//! rotation: `rotate_refresh_token` must be a per-identity
//! compare-and-swap, or two concurrent refresh calls could both pass the
//! equality check against the stale digest.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::auth::User;

/// Storage backend failures. Always mapped by the session service before
/// reaching callers.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Parameters for creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

/// A stored user plus the credential fields the auth flows need.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user: User,
    pub password_hash: String,
    pub refresh_token_hash: Option<String>,
}

/// Persistence capability for identities and their single stored refresh
/// token digest.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by email.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Look up a user by id.
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    /// Create a user. Returns `None` when the email is already taken.
    async fn create(&self, new_user: NewUser) -> Result<Option<User>, StoreError>;

    /// Unconditionally overwrite the stored refresh token digest.
    async fn replace_refresh_token(&self, user_id: &str, digest: &str) -> Result<(), StoreError>;

    /// Atomically swap the stored digest from `expected` to `new`.
    /// Returns `false` when the stored digest does not match `expected`
    /// or the user does not exist.
    async fn rotate_refresh_token(
        &self,
        user_id: &str,
        expected: &str,
        new: &str,
    ) -> Result<bool, StoreError>;

    /// Clear the stored refresh token digest. Idempotent.
    async fn clear_refresh_token(&self, user_id: &str) -> Result<(), StoreError>;
}
