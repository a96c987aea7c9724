//! PostgreSQL-backed `UserStore`.

use async_trait::async_trait;
use sqlx::PgPool;

use super::{NewUser, StoreError, UserRecord, UserStore};
use crate::models::auth::User;

/// `UserStore` over a PostgreSQL pool.
///
/// Rotation is a single conditional UPDATE, so the read-compare-overwrite
/// sequence is atomic under the row lock.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query_as::<_, (String, String, String, String, Option<String>)>(
            "SELECT id::text, email, name, password_hash, refresh_token_hash \
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(
            |(id, email, name, password_hash, refresh_token_hash)| UserRecord {
                user: User { id, email, name },
                password_hash,
                refresh_token_hash,
            },
        ))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, (String, String, String)>(
            "SELECT id::text, email, name FROM users WHERE id = $1::uuid",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, email, name)| User { id, email, name }))
    }

    async fn create(&self, new_user: NewUser) -> Result<Option<User>, StoreError> {
        let id = sqlx::query_scalar::<_, String>(
            "INSERT INTO users (email, name, password_hash) VALUES ($1, $2, $3) \
             ON CONFLICT (email) DO NOTHING RETURNING id::text",
        )
        .bind(&new_user.email)
        .bind(&new_user.name)
        .bind(&new_user.password_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id.map(|id| User {
            id,
            email: new_user.email,
            name: new_user.name,
        }))
    }

    async fn replace_refresh_token(&self, user_id: &str, digest: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET refresh_token_hash = $2 WHERE id = $1::uuid")
            .bind(user_id)
            .bind(digest)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        user_id: &str,
        expected: &str,
        new: &str,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE users SET refresh_token_hash = $3 \
             WHERE id = $1::uuid AND refresh_token_hash = $2",
        )
        .bind(user_id)
        .bind(expected)
        .bind(new)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn clear_refresh_token(&self, user_id: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET refresh_token_hash = NULL WHERE id = $1::uuid")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
