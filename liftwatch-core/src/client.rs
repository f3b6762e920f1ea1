//! HTTP client for the liftwatch API
//!
//! Every request goes through one pipeline:
//! - the stored token, if any, is attached as `Authorization: Bearer <token>`
//! - a 2xx body is decoded into the [`ApiResponse`] envelope and returned as is
//! - anything else becomes an [`ApiError`] carrying `{message, status, data}`
//!
//! A 401 additionally clears the token store and publishes
//! [`ClientEvent::Unauthenticated`]. Navigation is left to whoever listens.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::config::ClientConfig;
use crate::protocol::ApiResponse;
use crate::storage::{StorageError, TokenStore};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Not authenticated: {message}")]
    Unauthenticated { message: String, data: Option<Value> },

    #[error("{0}")]
    NotFound(String),

    #[error("HTTP {status}: {message}")]
    Status {
        status: u16,
        message: String,
        data: Option<Value>,
    },

    #[error("Request rejected: {message}")]
    Rejected { message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(#[source] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ApiError {
    /// HTTP status behind the error, when there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            ApiError::Unauthenticated { .. } => Some(StatusCode::UNAUTHORIZED.as_u16()),
            ApiError::NotFound(_) => Some(StatusCode::NOT_FOUND.as_u16()),
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Human-readable message, preferring the server's own wording
    pub fn message(&self) -> String {
        match self {
            ApiError::Unauthenticated { message, .. }
            | ApiError::Status { message, .. }
            | ApiError::Rejected { message } => message.clone(),
            ApiError::NotFound(message) => message.clone(),
            other => other.to_string(),
        }
    }

    /// Raw error body returned by the server
    pub fn data(&self) -> Option<&Value> {
        match self {
            ApiError::Unauthenticated { data, .. } | ApiError::Status { data, .. } => data.as_ref(),
            _ => None,
        }
    }

    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, ApiError::Unauthenticated { .. })
    }
}

/// Out-of-band notifications from the HTTP layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientEvent {
    /// The server rejected the stored credential; the store has been cleared
    Unauthenticated,
}

const EVENT_CAPACITY: usize = 16;

/// liftwatch API client
///
/// Cheap to clone; clones share the connection pool, token store and
/// event channel.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    tokens: Arc<TokenStore>,
    events: broadcast::Sender<ClientEvent>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, tokens: Arc<TokenStore>) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()?;

        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            tokens,
            events,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    /// Receive [`ClientEvent`]s published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>, ApiError> {
        let req = self.request(Method::GET, path)?;
        self.send(req).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<ApiResponse<T>, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = self.request(Method::POST, path)?.json(body);
        self.send(req).await
    }

    /// POST without a request body
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>, ApiError> {
        let req = self.request(Method::POST, path)?;
        self.send(req).await
    }

    // Private helpers

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("{} {}", method, url);

        let mut req = self.client.request(method, url);

        if let Some(token) = self.tokens.get()? {
            req = req.bearer_auth(token);
        }

        Ok(req)
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<ApiResponse<T>, ApiError> {
        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;

        if status.is_success() {
            return serde_json::from_slice(&body).map_err(ApiError::InvalidResponse);
        }

        Err(self.failure(status, &body))
    }

    fn failure(&self, status: StatusCode, body: &[u8]) -> ApiError {
        let data: Option<Value> = serde_json::from_slice(body).ok();
        let message = data
            .as_ref()
            .and_then(|d| d.get("message"))
            .and_then(Value::as_str)
            .map(String::from)
            .or_else(|| status.canonical_reason().map(String::from))
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

        if status == StatusCode::UNAUTHORIZED {
            tracing::info!("Server rejected credentials, clearing stored session");
            if let Err(e) = self.tokens.clear_all() {
                tracing::warn!("Failed to clear token store: {}", e);
            }
            // No subscribers is fine
            let _ = self.events.send(ClientEvent::Unauthenticated);
            return ApiError::Unauthenticated { message, data };
        }

        tracing::debug!("HTTP {}: {}", status.as_u16(), message);
        ApiError::Status {
            status: status.as_u16(),
            message,
            data,
        }
    }
}
