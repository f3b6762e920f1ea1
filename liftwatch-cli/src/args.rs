//! Command-line arguments

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use liftwatch_core::protocol::ROLE_USER;

#[derive(Debug, Parser)]
#[command(name = "liftwatch")]
#[command(about = "Elevator monitoring client", version)]
pub struct Cli {
    /// Config file (defaults to the per-user liftwatch config)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// API base URL, overrides the config file
    #[arg(long, global = true)]
    pub api: Option<String>,

    /// Print payloads as JSON
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Sign in and store the session
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
        #[arg(long, default_value = ROLE_USER)]
        role: String,
    },
    /// Create an account
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
        #[arg(long, default_value = ROLE_USER)]
        role: String,
    },
    /// Sign out and clear the stored session
    Logout,
    /// Show the stored session
    Whoami,
    /// List elevators with their derived status
    Elevators,
    /// Show one elevator
    Elevator { id: i64 },
    /// Show sensor readings of one elevator
    Sensors { id: i64 },
    /// Show the built-in demo fleet, no server needed
    Fleet,
    /// Resolve a client route such as /ElevatorInfo/detail/0/sensor
    Open { route: String },
}
