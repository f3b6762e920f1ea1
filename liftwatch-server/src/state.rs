//! Shared server state

use std::collections::HashMap;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use liftwatch_core::protocol::{SensorReading, SensorSnapshot, User};
use liftwatch_core::{ElevatorFleet, JwtAuth};
use thiserror::Error;

/// Registered account
pub struct UserRecord {
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("username already exists")]
    AlreadyExists,

    #[error("user not found")]
    UnknownUser,

    #[error("invalid username or password")]
    BadPassword,

    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Shared application state
pub struct AppState {
    /// JWT issuer/verifier
    pub jwt_auth: JwtAuth,

    /// Elevators served by `/api/elevators`
    pub fleet: ElevatorFleet,

    /// Accounts keyed by username
    users: HashMap<String, UserRecord>,
    next_user_id: i64,

    /// Stored readings per elevator id
    readings: HashMap<i64, Vec<SensorReading>>,
}

impl AppState {
    pub fn new(jwt_auth: JwtAuth, fleet: ElevatorFleet) -> Self {
        let timestamp = chrono::Utc::now().naive_utc().format("%Y-%m-%dT%H:%M:%S").to_string();

        // Elevators that never reported get no entry, so their sensors 404
        let mut next_reading_id = 1;
        let readings = fleet
            .elevators()
            .iter()
            .filter_map(|e| {
                let sensor = e.sensor?;
                let readings = readings_for(&sensor, next_reading_id, &timestamp);
                next_reading_id += readings.len() as i64;
                Some((e.id, readings))
            })
            .collect();

        Self {
            jwt_auth,
            fleet,
            users: HashMap::new(),
            next_user_id: 1,
            readings,
        }
    }

    /// Create an account with an argon2-hashed password
    pub fn register(&mut self, username: &str, password: &str, role: &str) -> Result<User, AccountError> {
        if self.users.contains_key(username) {
            return Err(AccountError::AlreadyExists);
        }

        let password_hash = hash_password(password)?;
        let user = User {
            id: self.next_user_id,
            username: username.to_string(),
            role: role.to_string(),
        };
        self.next_user_id += 1;

        self.users.insert(
            username.to_string(),
            UserRecord {
                user: user.clone(),
                password_hash,
            },
        );

        tracing::info!("Registered user {} ({})", user.username, user.role);
        Ok(user)
    }

    /// Check credentials
    pub fn authenticate(&self, username: &str, password: &str) -> Result<User, AccountError> {
        let record = self.users.get(username).ok_or(AccountError::UnknownUser)?;

        if !verify_password(password, &record.password_hash) {
            return Err(AccountError::BadPassword);
        }

        Ok(record.user.clone())
    }

    pub fn readings(&self, elevator_id: i64) -> Option<&[SensorReading]> {
        self.readings.get(&elevator_id).map(Vec::as_slice)
    }
}

fn hash_password(password: &str) -> Result<String, AccountError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AccountError::Hash(e.to_string()))
}

fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

/// One reading per sensor axis, flagged when over its limit
fn readings_for(sensor: &SensorSnapshot, first_id: i64, timestamp: &str) -> Vec<SensorReading> {
    let axes = [
        ("speed", sensor.speed),
        ("acceleration", sensor.acceleration),
        ("position", sensor.position),
    ];

    axes.into_iter()
        .zip(first_id..)
        .map(|((kind, value), id)| SensorReading {
            id,
            kind: kind.to_string(),
            value,
            is_abnormal: SensorSnapshot::axis_abnormal(kind, value),
            timestamp: Some(timestamp.to_string()),
        })
        .collect()
}
