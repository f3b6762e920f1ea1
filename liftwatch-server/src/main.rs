//! liftwatch-server: demo backend for the liftwatch client
//!
//! Serves the JSON API the client talks to:
//! - Registration and login with argon2 password hashes and JWT issue
//! - Token verification
//! - The elevator fleet and per-elevator sensor readings

mod handlers;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use liftwatch_core::{Config, ElevatorFleet, JwtAuth};

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "liftwatch_server=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}, using defaults", e);
        Config::default()
    });

    let jwt_secret = match config.server.jwt_secret {
        Some(ref secret) => {
            use base64::Engine;
            base64::engine::general_purpose::STANDARD
                .decode(secret)
                .context("invalid JWT secret (must be base64)")?
        }
        None => {
            tracing::info!("Generated random JWT secret (will change on restart)");
            liftwatch_core::jwt::generate_secret().to_vec()
        }
    };

    let jwt_auth = JwtAuth::new(&jwt_secret, Some(config.server.token_ttl_secs()));
    let fleet = ElevatorFleet::demo();
    tracing::info!("Serving {} elevators", fleet.len());

    let state = Arc::new(RwLock::new(AppState::new(jwt_auth, fleet)));

    let app = handlers::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from((
        config.server.listen_addr.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));
    tracing::info!("liftwatch-server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
