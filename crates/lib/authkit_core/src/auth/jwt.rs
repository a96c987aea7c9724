//! Dual-secret JWT issuance and verification.
//!
//! Access and refresh tokens are signed with independent HS256 secrets
//! and independent lifetimes, so compromise of one secret does not
//! compromise the other's verification key.

use std::path::PathBuf;

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use tracing::info;
use uuid::Uuid;

use super::AuthError;
use crate::models::auth::{TokenClaims, TokenPair, User};

/// Access token lifetime: 15 minutes.
pub const DEFAULT_ACCESS_TTL_SECS: i64 = 15 * 60;

/// Refresh token lifetime: 7 days.
pub const DEFAULT_REFRESH_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Signing secrets and lifetimes for the token issuer.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
}

impl TokenConfig {
    /// Reads configuration from environment variables.
    ///
    /// Secrets come from `JWT_ACCESS_SECRET` / `JWT_REFRESH_SECRET`, each
    /// falling back to a secret generated once and persisted under the
    /// platform data dir. Lifetimes come from `ACCESS_TOKEN_TTL_SECS`
    /// (default 900) and `REFRESH_TOKEN_TTL_SECS` (default 604800).
    pub fn from_env() -> Self {
        Self {
            access_secret: resolve_secret("JWT_ACCESS_SECRET", "access-secret"),
            refresh_secret: resolve_secret("JWT_REFRESH_SECRET", "refresh-secret"),
            access_ttl_secs: env_ttl("ACCESS_TOKEN_TTL_SECS", DEFAULT_ACCESS_TTL_SECS),
            refresh_ttl_secs: env_ttl("REFRESH_TOKEN_TTL_SECS", DEFAULT_REFRESH_TTL_SECS),
        }
    }
}

fn env_ttl(var: &str, default: i64) -> i64 {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Mints and verifies access/refresh token pairs.
pub struct TokenIssuer {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    validation: Validation,
}

impl TokenIssuer {
    pub fn new(config: &TokenConfig) -> Self {
        // Zero leeway: the configured lifetimes are exact.
        let mut validation = Validation::default();
        validation.validate_exp = true;
        validation.leeway = 0;

        Self {
            access_encoding: EncodingKey::from_secret(config.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            access_ttl: Duration::seconds(config.access_ttl_secs),
            refresh_ttl: Duration::seconds(config.refresh_ttl_secs),
            validation,
        }
    }

    /// Mint a signed access/refresh pair for a user.
    pub fn mint_pair(&self, user: &User) -> Result<TokenPair, AuthError> {
        let now = Utc::now();
        let access_token = self.sign(user, now, self.access_ttl, &self.access_encoding)?;
        let refresh_token = self.sign(user, now, self.refresh_ttl, &self.refresh_encoding)?;
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    fn sign(
        &self,
        user: &User,
        now: chrono::DateTime<Utc>,
        ttl: Duration,
        key: &EncodingKey,
    ) -> Result<String, AuthError> {
        let claims = TokenClaims {
            sub: user.id.clone(),
            email: user.email.clone(),
            jti: Uuid::new_v4().to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };
        encode(&Header::default(), &claims, key)
            .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
    }

    /// Verify a refresh token, returning the claims on success.
    ///
    /// Every failure mode (signature, expiry, malformed payload) is
    /// reported as `InvalidToken` with no further detail.
    pub fn verify_refresh(&self, token: &str) -> Result<TokenClaims, AuthError> {
        decode::<TokenClaims>(token, &self.refresh_decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }

    /// Verify an access token, returning the claims on success.
    pub fn verify_access(&self, token: &str) -> Option<TokenClaims> {
        decode::<TokenClaims>(token, &self.access_decoding, &self.validation)
            .ok()
            .map(|data| data.claims)
    }
}

/// Resolve a signing secret: env var override, else a secret generated
/// once and persisted under the platform data dir.
pub fn resolve_secret(env_var: &str, file_name: &str) -> String {
    if let Ok(secret) = std::env::var(env_var)
        && !secret.is_empty()
    {
        return secret;
    }
    let secret_path = secret_path(file_name);
    if let Ok(existing) = std::fs::read_to_string(&secret_path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = secret_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(&secret_path, &secret);
    info!(path = %secret_path.display(), var = env_var, "generated new signing secret");
    secret
}

/// Path to a persisted secret file.
fn secret_path(file_name: &str) -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("authkit")
        .join(file_name)
}
