//! # authkit_client
//!
//! Client-side session management for the authkit API: volatile access
//! token, durable refresh token, and transparent single-flight recovery
//! from access-token expiry.

pub mod session;
pub mod token_store;
pub mod transport;

use http::StatusCode;
use thiserror::Error;

use crate::token_store::TokenStoreError;
use crate::transport::TransportError;

pub use crate::session::SessionClient;

/// Client-side errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    TokenStore(#[from] TokenStoreError),

    /// The session could not be recovered; the user must log in again.
    #[error("session expired, re-authentication required")]
    SessionExpired,

    /// The server rejected the request.
    #[error("api error {status}: {message}")]
    Api {
        status: StatusCode,
        message: String,
    },

    #[error("unexpected response shape: {0}")]
    UnexpectedResponse(String),
}
