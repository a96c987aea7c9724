//! The request-sending capability.
//!
//! [`SessionClient`](crate::session::SessionClient) is a decorator over
//! this seam: anything that can send an [`ApiRequest`] can be wrapped
//! with token attachment and refresh-retry.

use std::sync::Arc;

use async_trait::async_trait;
use http::{Method, StatusCode};
use serde_json::Value;
use thiserror::Error;
use url::Url;

/// Transport-level failures: connection errors, timeouts, unparseable
/// bodies. HTTP error statuses are NOT transport errors — they come back
/// as a normal [`ApiResponse`].
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    Response(String),
}

/// A request addressed to the API, independent of the underlying HTTP
/// client.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub bearer: Option<String>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            bearer: None,
            body: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_bearer(mut self, bearer: Option<String>) -> Self {
        self.bearer = bearer;
        self
    }
}

/// A decoded response: status plus parsed JSON body (`Null` when empty).
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    /// Error message out of an `{error, message}` body, if present.
    pub fn message(&self) -> Option<&str> {
        self.body.get("message").and_then(Value::as_str)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, req: ApiRequest) -> Result<ApiResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, req: ApiRequest) -> Result<ApiResponse, TransportError> {
        (**self).send(req).await
    }
}

/// `Transport` over a shared `reqwest::Client`.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, req: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self
            .base_url
            .join(&req.path)
            .map_err(|e| TransportError::Response(format!("invalid path {}: {e}", req.path)))?;

        let mut builder = self.client.request(req.method, url);
        if let Some(token) = &req.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .map_err(|e| TransportError::Response(format!("non-JSON body: {e}")))?
        };

        Ok(ApiResponse { status, body })
    }
}
