//! API server configuration.

use authkit_core::auth::jwt::TokenConfig;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3000").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Token signing secrets and lifetimes.
    pub tokens: TokenConfig,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                                   | Default                            |
    /// |--------------------------------------------|------------------------------------|
    /// | `BIND_ADDR`                                | `127.0.0.1:3000`                   |
    /// | `DATABASE_URL`                             | `postgres://localhost:5432/authkit`|
    /// | `JWT_ACCESS_SECRET` / `JWT_REFRESH_SECRET` | generated & persisted to file      |
    /// | `ACCESS_TOKEN_TTL_SECS`                    | `900`                              |
    /// | `REFRESH_TOKEN_TTL_SECS`                   | `604800`                           |
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".into()),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/authkit".into()),
            tokens: TokenConfig::from_env(),
        }
    }
}
