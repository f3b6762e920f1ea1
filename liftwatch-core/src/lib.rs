//! liftwatch-core: Client library for the elevator-monitoring service
//!
//! This crate provides:
//! - Durable token/user storage
//! - HTTP API client with bearer auth and normalized errors
//! - Auth and elevator endpoint wrappers
//! - Session state machine
//! - Elevator status classification and the client-side fleet store
//! - Navigation routes, configuration and JWT helpers

pub mod auth;
pub mod client;
pub mod config;
pub mod elevators;
pub mod fleet;
pub mod jwt;
pub mod protocol;
pub mod routes;
pub mod session;
pub mod status;
pub mod storage;

pub use auth::AuthService;
pub use client::{ApiClient, ApiError, ClientEvent};
pub use config::Config;
pub use elevators::ElevatorApi;
pub use fleet::ElevatorFleet;
pub use jwt::{Claims, JwtAuth};
pub use protocol::{ApiResponse, Credentials, Elevator, SensorReading, SensorSnapshot, User};
pub use routes::{DetailTab, Route};
pub use session::{Session, SessionState};
pub use status::ElevatorStatus;
pub use storage::{StorageError, TokenStore};

/// Default HTTP port of the API backend
pub const DEFAULT_API_PORT: u16 = 5000;
