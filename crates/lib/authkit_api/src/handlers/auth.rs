//! Authentication request handlers.

use axum::extract::State;
use axum::{Extension, Json};

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    LoginRequest, LogoutResponse, RefreshRequest, RegisterRequest, SessionResponse, TokenResponse,
};

/// `POST /auth/login` — authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<SessionResponse>> {
    let session = state.sessions.login(&body.email, &body.password).await?;
    Ok(Json(session.into()))
}

/// `POST /auth/register` — create a new user account.
pub async fn register_handler(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<Json<SessionResponse>> {
    let session = state
        .sessions
        .register(&body.email, &body.password, &body.name)
        .await?;
    Ok(Json(session.into()))
}

/// `POST /auth/refresh` — exchange a refresh token for a new pair.
pub async fn refresh_handler(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> AppResult<Json<TokenResponse>> {
    let tokens = state.sessions.refresh(&body.refresh_token).await?;
    Ok(Json(TokenResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    }))
}

/// `POST /auth/logout` — clear the caller's stored refresh token.
/// Requires authentication.
pub async fn logout_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(claims)): Extension<AuthenticatedUser>,
) -> AppResult<Json<LogoutResponse>> {
    state.sessions.logout(&claims.sub).await?;
    Ok(Json(LogoutResponse { success: true }))
}
