//! HTTP handlers
//!
//! Every response uses the `{success, message, data, timestamp}` envelope,
//! including errors.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use liftwatch_core::protocol::{ApiResponse, LoginData, ROLE_USER, VerifyData};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::state::{AccountError, AppState};

pub type SharedState = Arc<RwLock<AppState>>;

/// API routes under `/api`, plus `/health`
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/verify", get(verify_handler))
        .route("/api/auth/logout", post(logout_handler))
        .route("/api/elevators", get(list_elevators_handler))
        .route("/api/elevators/{id}", get(elevator_handler))
        .route("/api/elevators/{id}/sensors", get(sensors_handler))
        .with_state(state)
}

fn envelope<T: Serialize>(status: StatusCode, mut body: ApiResponse<T>) -> Response {
    body.timestamp = Some(chrono::Utc::now().to_rfc3339());
    (status, Json(body)).into_response()
}

fn ok<T: Serialize>(status: StatusCode, data: T, message: &str) -> Response {
    envelope(status, ApiResponse::ok(data, message))
}

fn fail(status: StatusCode, message: &str) -> Response {
    envelope(status, ApiResponse::<()>::failure(message))
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "liftwatch-server"
    }))
}

/// Register/login request body
#[derive(Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    role: Option<String>,
}

impl CredentialsRequest {
    /// Trimmed (username, password), or None if either is empty
    fn fields(&self) -> Option<(&str, &str)> {
        let username = self.username.trim();
        let password = self.password.trim();
        if username.is_empty() || password.is_empty() {
            None
        } else {
            Some((username, password))
        }
    }
}

pub async fn register_handler(
    State(state): State<SharedState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(req)) = payload else {
        return fail(StatusCode::BAD_REQUEST, "request body must be JSON");
    };
    let Some((username, password)) = req.fields() else {
        return fail(StatusCode::BAD_REQUEST, "username and password are required");
    };
    let role = req
        .role
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(ROLE_USER);

    let mut s = state.write().await;
    match s.register(username, password, role) {
        Ok(_) => envelope(StatusCode::CREATED, ApiResponse::<()> {
            success: true,
            data: None,
            message: Some("registered".to_string()),
            timestamp: None,
        }),
        Err(AccountError::AlreadyExists) => fail(StatusCode::CONFLICT, "username already exists"),
        Err(e) => {
            tracing::error!("Registration failed: {}", e);
            fail(StatusCode::INTERNAL_SERVER_ERROR, "registration failed, try again later")
        }
    }
}

pub async fn login_handler(
    State(state): State<SharedState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(req)) = payload else {
        return fail(StatusCode::BAD_REQUEST, "request body must be JSON");
    };
    let Some((username, password)) = req.fields() else {
        return fail(StatusCode::BAD_REQUEST, "username and password are required");
    };

    let s = state.read().await;
    let user = match s.authenticate(username, password) {
        Ok(user) => user,
        Err(AccountError::UnknownUser) => return fail(StatusCode::NOT_FOUND, "user not found"),
        Err(AccountError::BadPassword) => {
            return fail(StatusCode::UNAUTHORIZED, "invalid username or password");
        }
        Err(e) => {
            tracing::error!("Login failed: {}", e);
            return fail(StatusCode::INTERNAL_SERVER_ERROR, "login failed, try again later");
        }
    };

    match s.jwt_auth.generate_token(&user) {
        Ok(token) => {
            tracing::info!("User {} signed in", user.username);
            ok(StatusCode::OK, LoginData { token, user }, "login successful")
        }
        Err(e) => {
            tracing::error!("Token generation failed: {}", e);
            fail(StatusCode::INTERNAL_SERVER_ERROR, "login failed, try again later")
        }
    }
}

pub async fn verify_handler(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let Some(token) = token else {
        return fail(StatusCode::UNAUTHORIZED, "no valid bearer token provided");
    };

    let s = state.read().await;
    match s.jwt_auth.verify_token(token) {
        Ok(claims) => ok(StatusCode::OK, VerifyData { user: claims.user() }, "token valid"),
        Err(e) => {
            tracing::debug!("Token rejected: {}", e);
            fail(StatusCode::UNAUTHORIZED, "token invalid or expired")
        }
    }
}

/// Tokens are stateless; logout only acknowledges
pub async fn logout_handler() -> Response {
    envelope(StatusCode::OK, ApiResponse::<()> {
        success: true,
        data: None,
        message: Some("logged out".to_string()),
        timestamp: None,
    })
}

pub async fn list_elevators_handler(State(state): State<SharedState>) -> Response {
    let s = state.read().await;
    ok(StatusCode::OK, s.fleet.elevators(), "elevators loaded")
}

pub async fn elevator_handler(State(state): State<SharedState>, Path(id): Path<i64>) -> Response {
    let s = state.read().await;
    match s.fleet.by_id(id) {
        Some(elevator) => ok(StatusCode::OK, elevator, "elevator loaded"),
        None => fail(StatusCode::NOT_FOUND, "elevator not found"),
    }
}

pub async fn sensors_handler(State(state): State<SharedState>, Path(id): Path<i64>) -> Response {
    let s = state.read().await;
    match s.readings(id) {
        Some(readings) => ok(StatusCode::OK, readings, "sensor data loaded"),
        None => fail(StatusCode::NOT_FOUND, "sensor data not found"),
    }
}
