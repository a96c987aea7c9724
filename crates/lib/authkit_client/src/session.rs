//! The session client: attaches the access token to outbound requests
//! and transparently recovers from access-token expiry.
//!
//! The access token lives in a process-local cell and is never persisted;
//! the refresh token lives in the durable [`TokenStore`]. When concurrent
//! requests all fail with an authorization error, exactly one refresh RPC
//! goes out — the rest wait on the gate and reuse its result.

use std::sync::Arc;

use http::{Method, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::ClientError;
use crate::token_store::TokenStore;
use crate::transport::{ApiRequest, ApiResponse, Transport};

/// A user as returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionBody {
    access_token: String,
    refresh_token: String,
    user: User,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenBody {
    access_token: String,
    refresh_token: String,
}

/// The volatile access-token cell. The epoch increments on every change,
/// so a caller can tell whether the token it failed with has already
/// been replaced.
#[derive(Debug, Default)]
struct AccessState {
    token: Option<String>,
    epoch: u64,
}

struct Inner<T, S> {
    transport: T,
    token_store: S,
    access: RwLock<AccessState>,
    /// Serializes refresh attempts; concurrent failures queue here and
    /// reuse the winner's result instead of issuing their own calls.
    refresh_gate: Mutex<()>,
}

/// Client-side session orchestration over a [`Transport`] and a
/// [`TokenStore`]. Cloning is cheap; clones share one session.
pub struct SessionClient<T, S> {
    inner: Arc<Inner<T, S>>,
}

impl<T, S> Clone for SessionClient<T, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport, S: TokenStore> SessionClient<T, S> {
    pub fn new(transport: T, token_store: S) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                token_store,
                access: RwLock::new(AccessState::default()),
                refresh_gate: Mutex::new(()),
            }),
        }
    }

    /// Send a request, attaching the current access token and retrying
    /// exactly once through the refresh path on an authorization failure.
    ///
    /// The retry bound is local to this call, so independent requests each
    /// get their own retry but none can loop.
    pub async fn send(&self, req: ApiRequest) -> Result<ApiResponse, ClientError> {
        let (token, epoch) = self.current_token().await;
        let first = self
            .inner
            .transport
            .send(req.clone().with_bearer(token))
            .await?;

        if first.status != StatusCode::UNAUTHORIZED {
            return Ok(first);
        }

        let fresh = self.refresh_from(epoch).await?;
        let second = self
            .inner
            .transport
            .send(req.with_bearer(Some(fresh)))
            .await?;
        Ok(second)
    }

    /// `POST /auth/login`; on success the returned tokens are installed.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ClientError> {
        let resp = self
            .inner
            .transport
            .send(
                ApiRequest::new(Method::POST, "/auth/login")
                    .with_body(json!({ "email": email, "password": password })),
            )
            .await?;
        self.install_session(resp).await
    }

    /// `POST /auth/register`; on success the returned tokens are installed.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<User, ClientError> {
        let resp = self
            .inner
            .transport
            .send(
                ApiRequest::new(Method::POST, "/auth/register")
                    .with_body(json!({ "email": email, "password": password, "name": name })),
            )
            .await?;
        self.install_session(resp).await
    }

    /// `GET /profile` through the retrying send path.
    pub async fn profile(&self) -> Result<User, ClientError> {
        let resp = self.send(ApiRequest::new(Method::GET, "/profile")).await?;
        if resp.status != StatusCode::OK {
            return Err(api_error(resp));
        }
        serde_json::from_value(resp.body).map_err(|e| ClientError::UnexpectedResponse(e.to_string()))
    }

    /// Validate session liveness (at startup/mount) by attempting a
    /// refresh with the durably stored token. Success installs the new
    /// pair; failure clears any stored tokens and reports `false`.
    ///
    /// Shares the single-flight path with 401-triggered recovery.
    pub async fn check_session(&self) -> bool {
        let epoch = self.inner.access.read().await.epoch;
        self.refresh_from(epoch).await.is_ok()
    }

    /// Best-effort server logout, then unconditional local clearing of
    /// both the in-memory access token and the durable refresh token.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let (token, _) = self.current_token().await;
        let req = ApiRequest::new(Method::POST, "/auth/logout").with_bearer(token);
        if let Err(err) = self.inner.transport.send(req).await {
            debug!(error = %err, "logout request failed, clearing local session anyway");
        }
        self.clear_session().await
    }

    /// Current (token, epoch) snapshot.
    async fn current_token(&self) -> (Option<String>, u64) {
        let state = self.inner.access.read().await;
        (state.token.clone(), state.epoch)
    }

    /// Single-flight refresh. `failed_epoch` is the epoch of the token
    /// the caller failed with; if the cell moved past it while we waited
    /// for the gate, another caller already refreshed and its token is
    /// reused without a network call.
    async fn refresh_from(&self, failed_epoch: u64) -> Result<String, ClientError> {
        let _gate = self.inner.refresh_gate.lock().await;

        {
            let state = self.inner.access.read().await;
            if state.epoch != failed_epoch
                && let Some(token) = &state.token
            {
                return Ok(token.clone());
            }
        }

        let Some(refresh_token) = self.inner.token_store.load()? else {
            self.clear_session().await?;
            return Err(ClientError::SessionExpired);
        };

        debug!("refreshing access token");
        let resp = self
            .inner
            .transport
            .send(
                ApiRequest::new(Method::POST, "/auth/refresh")
                    .with_body(json!({ "refreshToken": refresh_token })),
            )
            .await?;

        if resp.status != StatusCode::OK {
            self.clear_session().await?;
            return Err(ClientError::SessionExpired);
        }

        let body: TokenBody = serde_json::from_value(resp.body)
            .map_err(|e| ClientError::UnexpectedResponse(e.to_string()))?;
        self.install_tokens(&body.access_token, &body.refresh_token)
            .await?;
        Ok(body.access_token)
    }

    async fn install_session(&self, resp: ApiResponse) -> Result<User, ClientError> {
        if resp.status != StatusCode::OK {
            return Err(api_error(resp));
        }
        let body: SessionBody = serde_json::from_value(resp.body)
            .map_err(|e| ClientError::UnexpectedResponse(e.to_string()))?;
        self.install_tokens(&body.access_token, &body.refresh_token)
            .await?;
        Ok(body.user)
    }

    /// Store a fresh pair: access token in memory only, refresh token
    /// durably.
    async fn install_tokens(&self, access: &str, refresh: &str) -> Result<(), ClientError> {
        self.inner.token_store.save(refresh)?;
        let mut state = self.inner.access.write().await;
        state.token = Some(access.to_string());
        state.epoch += 1;
        Ok(())
    }

    /// Drop the in-memory access token and the durable refresh token.
    async fn clear_session(&self) -> Result<(), ClientError> {
        {
            let mut state = self.inner.access.write().await;
            state.token = None;
            state.epoch += 1;
        }
        self.inner.token_store.clear()?;
        Ok(())
    }
}

fn api_error(resp: ApiResponse) -> ClientError {
    let message = resp.message().unwrap_or("request failed").to_string();
    ClientError::Api {
        status: resp.status,
        message,
    }
}
