//! # authkit_core
//!
//! Core domain logic for authkit: password hashing, dual-secret token
//! issuance and verification, the session service, and the user-store
//! boundary it orchestrates.

pub mod auth;
pub mod migrate;
pub mod models;
pub mod store;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
