//! HTTP wire types for the liftwatch API
//!
//! Every endpoint answers with the same JSON envelope:
//! `{success, data?, message?, timestamp?}`. The payload types below are
//! what travels inside `data`.

use serde::{Deserialize, Serialize};

/// Response envelope shared by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Successful envelope carrying `data`
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
            timestamp: None,
        }
    }

    /// Failed envelope with only a message
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            timestamp: None,
        }
    }

    /// Payload of a successful response, if any
    pub fn into_data(self) -> Option<T> {
        if self.success { self.data } else { None }
    }
}

/// Sign-in / registration payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            role: role.into(),
        }
    }
}

fn default_role() -> String {
    ROLE_USER.to_string()
}

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

/// Authenticated user as reported by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: String,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

/// `data` of a successful `POST /auth/login`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginData {
    pub token: String,
    pub user: User,
}

/// `data` of a successful `GET /auth/verify`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyData {
    pub user: User,
}

/// Latest sensor values of one elevator
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorSnapshot {
    pub acceleration: f64,
    pub speed: f64,
    pub position: f64,
}

impl SensorSnapshot {
    pub fn new(speed: f64, acceleration: f64, position: f64) -> Self {
        Self {
            acceleration,
            speed,
            position,
        }
    }
}

/// Elevator record
///
/// The status label is never part of the record; it is derived from
/// `sensor` on every read (see [`crate::status`]). `sensor` is `None` for
/// an elevator that has never reported, and such an elevator has no
/// status. `status` below is the backend's own free-form maintenance
/// state, passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Elevator {
    pub id: i64,
    pub name: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor: Option<SensorSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, alias = "lastmaintenance", skip_serializing_if = "Option::is_none")]
    pub last_maintenance: Option<String>,
}

/// One stored sensor reading (`GET /elevators/:id/sensors`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: f64,
    pub is_abnormal: bool,
    #[serde(default)]
    pub timestamp: Option<String>,
}
