//! liftwatch: command-line client for the elevator-monitoring service
//!
//! - Sign in, register, sign out, and show the stored session
//! - List elevators with their derived normal/warning/fault status
//! - Inspect one elevator and its sensor readings
//! - Resolve client routes against the local demo fleet

mod app;
mod args;
mod output;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use liftwatch_core::Config;

use crate::app::App;
use crate::args::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Log to a file so stdout stays clean for command output
    let log_dir = dirs::cache_dir()
        .map(|d| d.join("liftwatch"))
        .unwrap_or_else(|| std::env::temp_dir().join("liftwatch"));
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(&log_dir, "cli.log");

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "liftwatch=debug,liftwatch_core=debug".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(file_appender).with_ansi(false))
        .init();

    let mut config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load config: {}, using defaults", e);
            Config::default()
        }),
    };
    if let Some(api) = cli.api {
        config.client.api_base_url = api;
    }
    tracing::info!("Using API at {}", config.client.api_base_url);

    // Logout is the way out of a broken session file
    let discard_corrupt = matches!(cli.command, Command::Logout);
    let mut app = App::new(&config, cli.json, discard_corrupt)?;

    match app.run(cli.command).await {
        Ok(out) => {
            if !out.is_empty() {
                println!("{}", out);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!("Command failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}
