//! # authkit_api
//!
//! HTTP API library for authkit.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};

use authkit_core::auth::session::SessionService;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Session orchestration service.
    pub sessions: Arc<SessionService>,
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route("/auth/login", post(handlers::auth::login_handler))
        .route("/auth/register", post(handlers::auth::register_handler))
        .route("/auth/refresh", post(handlers::auth::refresh_handler));

    // Protected routes (require a valid access token)
    let protected = Router::new()
        .route("/auth/logout", post(handlers::auth::logout_handler))
        .route("/profile", get(handlers::profile::profile_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(cors)
        .with_state(state)
}
