//! Authentication endpoints
//!
//! Thin wrappers over `/auth/*`. Each call is a single round trip; the
//! only side effects are on the [`TokenStore`]:
//! - a successful login persists token and user
//! - logout clears the store whether or not the request succeeded

use std::sync::Arc;

use serde_json::Value;

use crate::client::{ApiClient, ApiError};
use crate::protocol::{ApiResponse, Credentials, LoginData, User, VerifyData};
use crate::storage::{StorageError, TokenStore};

#[derive(Debug, Clone)]
pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    fn tokens(&self) -> &Arc<TokenStore> {
        self.api.tokens()
    }

    /// Sign in. On success the token and user are stored before returning.
    pub async fn login(&self, credentials: &Credentials) -> Result<ApiResponse<LoginData>, ApiError> {
        let response: ApiResponse<LoginData> = self.api.post("/auth/login", credentials).await?;

        if response.success {
            if let Some(data) = &response.data {
                self.tokens().set(&data.token)?;
                self.tokens().set_user(Some(&data.user))?;
                tracing::info!("Signed in as {}", data.user.username);
            }
        }

        Ok(response)
    }

    /// Create an account. Does not sign in.
    pub async fn register(&self, credentials: &Credentials) -> Result<ApiResponse<Value>, ApiError> {
        self.api.post("/auth/register", credentials).await
    }

    pub async fn verify_token(&self) -> Result<ApiResponse<VerifyData>, ApiError> {
        self.api.get("/auth/verify").await
    }

    /// Server-side logout is best effort; the local store is always cleared.
    pub async fn logout(&self) -> Result<ApiResponse<Value>, ApiError> {
        let result = self.api.post_empty::<Value>("/auth/logout").await;
        let cleared = self.tokens().clear_all();

        let response = result?;
        cleared?;
        Ok(response)
    }

    /// Token and user both stored. Never contacts the server.
    pub fn is_logged_in(&self) -> Result<bool, StorageError> {
        let token = self.tokens().get()?;
        let user = self.tokens().get_user()?;
        Ok(token.is_some() && user.is_some())
    }

    pub fn current_user(&self) -> Result<Option<User>, StorageError> {
        self.tokens().get_user()
    }
}
