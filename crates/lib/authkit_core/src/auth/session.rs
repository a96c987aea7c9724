//! Session orchestration: login, register, refresh, logout.
//!
//! Owns the two security contracts of the protocol: login failures are
//! indistinguishable to the caller, and every refresh-path failure
//! collapses to `InvalidToken`.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::AuthError;
use super::jwt::TokenIssuer;
use super::password::{hash_password, verify_password};
use crate::models::auth::{AuthSession, TokenClaims, TokenPair, User};
use crate::store::{NewUser, StoreError, UserStore};

/// SHA-256 digest of a refresh token, hex-encoded — the only form the
/// store ever sees.
fn refresh_token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Orchestrates the token lifecycle over a [`UserStore`] and
/// [`TokenIssuer`].
pub struct SessionService {
    store: Arc<dyn UserStore>,
    issuer: TokenIssuer,
}

impl SessionService {
    pub fn new(store: Arc<dyn UserStore>, issuer: TokenIssuer) -> Self {
        Self { store, issuer }
    }

    /// Authenticate with email + password.
    ///
    /// Unknown email and wrong password return the same error, so callers
    /// cannot probe which addresses are registered.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let record = self
            .store
            .find_by_email(email)
            .await
            .map_err(internal)?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &record.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.issue_for(&record.user).await?;
        info!(user_id = %record.user.id, "login succeeded");
        Ok(AuthSession {
            user: record.user,
            tokens,
        })
    }

    /// Register a new account, then behave as a successful login.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<AuthSession, AuthError> {
        let password_hash = hash_password(password)?;
        let user = self
            .store
            .create(NewUser {
                email: email.to_string(),
                name: name.to_string(),
                password_hash,
            })
            .await
            .map_err(internal)?
            .ok_or(AuthError::DuplicateIdentity)?;

        let tokens = self.issue_for(&user).await?;
        info!(user_id = %user.id, "registered new user");
        Ok(AuthSession { user, tokens })
    }

    /// Exchange a refresh token for a fresh pair, rotating the stored one.
    ///
    /// A token superseded by a newer pair is rejected even though it still
    /// verifies cryptographically: the stored digest no longer matches,
    /// so the compare-and-swap fails. Every failure on this path — decode,
    /// lookup, storage — surfaces as `InvalidToken`.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.issuer.verify_refresh(refresh_token)?;

        let user = self
            .store
            .find_by_id(&claims.sub)
            .await
            .map_err(|_| AuthError::InvalidToken)?
            .ok_or(AuthError::InvalidToken)?;

        let tokens = self
            .issuer
            .mint_pair(&user)
            .map_err(|_| AuthError::InvalidToken)?;
        let rotated = self
            .store
            .rotate_refresh_token(
                &user.id,
                &refresh_token_digest(refresh_token),
                &refresh_token_digest(&tokens.refresh_token),
            )
            .await
            .map_err(|_| AuthError::InvalidToken)?;

        if !rotated {
            debug!(user_id = %user.id, "presented refresh token is not the stored one");
            return Err(AuthError::InvalidToken);
        }

        Ok(tokens)
    }

    /// Clear the stored refresh token. Idempotent — succeeds even when
    /// nothing is stored.
    pub async fn logout(&self, user_id: &str) -> Result<(), AuthError> {
        self.store
            .clear_refresh_token(user_id)
            .await
            .map_err(internal)?;
        info!(user_id, "logged out");
        Ok(())
    }

    /// Verify an access token (used by the API middleware).
    pub fn verify_access(&self, token: &str) -> Option<TokenClaims> {
        self.issuer.verify_access(token)
    }

    /// Look up a user by id (for authenticated profile reads).
    pub async fn user(&self, user_id: &str) -> Result<Option<User>, AuthError> {
        self.store.find_by_id(user_id).await.map_err(internal)
    }

    /// Mint a pair and overwrite the stored refresh digest. This is the
    /// rotation step — it runs on every successful authentication, not
    /// only on refresh.
    async fn issue_for(&self, user: &User) -> Result<TokenPair, AuthError> {
        let tokens = self.issuer.mint_pair(user)?;
        self.store
            .replace_refresh_token(&user.id, &refresh_token_digest(&tokens.refresh_token))
            .await
            .map_err(internal)?;
        Ok(tokens)
    }
}

fn internal(e: StoreError) -> AuthError {
    AuthError::Internal(e.to_string())
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::auth::jwt::TokenConfig;
    use crate::models::auth::User;
    use crate::store::memory::MemoryUserStore;
    use crate::store::{NewUser, UserRecord};

    const EMAIL: &str = "a@x.com";
    const PASSWORD: &str = "password123";

    fn test_issuer() -> TokenIssuer {
        TokenIssuer::new(&TokenConfig {
            access_secret: "access-test-secret".into(),
            refresh_secret: "refresh-test-secret".into(),
            access_ttl_secs: 900,
            refresh_ttl_secs: 3600,
        })
    }

    fn service_over(store: Arc<dyn UserStore>) -> SessionService {
        SessionService::new(store, test_issuer())
    }

    fn service() -> SessionService {
        service_over(Arc::new(MemoryUserStore::new()))
    }

    async fn registered(service: &SessionService) -> AuthSession {
        service
            .register(EMAIL, PASSWORD, "A")
            .await
            .expect("register")
    }

    /// A store that fails every operation, for exercising the
    /// error-collapsing contract.
    struct FailingStore;

    #[async_trait]
    impl UserStore for FailingStore {
        async fn find_by_email(&self, _email: &str) -> Result<Option<UserRecord>, StoreError> {
            Err(StoreError::Unavailable("store down".into()))
        }

        async fn find_by_id(&self, _id: &str) -> Result<Option<User>, StoreError> {
            Err(StoreError::Unavailable("store down".into()))
        }

        async fn create(&self, _new_user: NewUser) -> Result<Option<User>, StoreError> {
            Err(StoreError::Unavailable("store down".into()))
        }

        async fn replace_refresh_token(
            &self,
            _user_id: &str,
            _digest: &str,
        ) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("store down".into()))
        }

        async fn rotate_refresh_token(
            &self,
            _user_id: &str,
            _expected: &str,
            _new: &str,
        ) -> Result<bool, StoreError> {
            Err(StoreError::Unavailable("store down".into()))
        }

        async fn clear_refresh_token(&self, _user_id: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("store down".into()))
        }
    }

    #[tokio::test]
    async fn register_then_login_succeeds_with_same_credentials() {
        let service = service();
        let created = registered(&service).await;

        let session = service.login(EMAIL, PASSWORD).await.expect("login");
        assert_eq!(created.user.id, session.user.id);

        // The access token's subject is the created identity's id.
        let claims = service
            .verify_access(&session.tokens.access_token)
            .expect("claims");
        assert_eq!(created.user.id, claims.sub);
        assert_eq!(EMAIL, claims.email);
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let service = service();
        registered(&service).await;

        let unknown_email = service
            .login("b@x.com", PASSWORD)
            .await
            .expect_err("unknown email");
        let wrong_password = service
            .login(EMAIL, "password124")
            .await
            .expect_err("wrong password");

        assert!(matches!(unknown_email, AuthError::InvalidCredentials));
        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert_eq!(unknown_email.to_string(), wrong_password.to_string());
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let service = service();
        registered(&service).await;

        let err = service
            .register(EMAIL, "other-password", "B")
            .await
            .expect_err("duplicate");
        assert!(matches!(err, AuthError::DuplicateIdentity));
    }

    #[tokio::test]
    async fn refresh_rotates_the_stored_token() {
        let service = service();
        let first = registered(&service).await.tokens;

        let second = service
            .refresh(&first.refresh_token)
            .await
            .expect("first refresh");

        // The superseded token is permanently unusable, even though it
        // still verifies cryptographically.
        assert!(matches!(
            service.refresh(&first.refresh_token).await,
            Err(AuthError::InvalidToken)
        ));

        // The fresh one works, and rotates again.
        let third = service
            .refresh(&second.refresh_token)
            .await
            .expect("second refresh");
        assert!(matches!(
            service.refresh(&second.refresh_token).await,
            Err(AuthError::InvalidToken)
        ));
        assert!(service.refresh(&third.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn login_supersedes_earlier_sessions() {
        let service = service();
        let earlier = registered(&service).await.tokens;

        let later = service.login(EMAIL, PASSWORD).await.expect("login").tokens;

        assert!(matches!(
            service.refresh(&earlier.refresh_token).await,
            Err(AuthError::InvalidToken)
        ));
        assert!(service.refresh(&later.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn logout_invalidates_the_stored_token() {
        let service = service();
        let session = registered(&service).await;

        service.logout(&session.user.id).await.expect("logout");
        assert!(matches!(
            service.refresh(&session.tokens.refresh_token).await,
            Err(AuthError::InvalidToken)
        ));

        // Idempotent.
        service.logout(&session.user.id).await.expect("logout");
    }

    #[tokio::test]
    async fn refresh_with_garbage_token_fails() {
        let service = service();
        assert!(matches!(
            service.refresh("not-a-token").await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn store_failure_during_refresh_collapses_to_invalid_token() {
        // Mint a valid refresh token against a working store, then present
        // it to a service whose store is down. The caller must see
        // `InvalidToken`, not the storage error.
        let working = service();
        let tokens = registered(&working).await.tokens;

        let broken = service_over(Arc::new(FailingStore));
        assert!(matches!(
            broken.refresh(&tokens.refresh_token).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn unknown_subject_collapses_to_invalid_token() {
        // A cryptographically valid token whose subject is absent from
        // the store (e.g. a different deployment's user database).
        let working = service();
        let tokens = registered(&working).await.tokens;

        let empty = service_over(Arc::new(MemoryUserStore::new()));
        assert!(matches!(
            empty.refresh(&tokens.refresh_token).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn store_failure_during_login_is_a_generic_server_fault() {
        let broken = service_over(Arc::new(FailingStore));
        let err = broken.login(EMAIL, PASSWORD).await.expect_err("login");
        assert!(matches!(err, AuthError::Internal(_)));
    }
}
