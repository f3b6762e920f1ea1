//! TOML configuration shared by the CLI and the demo backend
//!
//! The file lives at `<config dir>/liftwatch/config.toml` (`~/.config` on
//! Linux). A missing file is not an error; every field has a default.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const APP_DIR: &str = "liftwatch";
const CONFIG_FILE: &str = "config.toml";
const SESSION_FILE: &str = "session.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to encode config: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("No per-user config directory on this platform")]
    NoConfigDir,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// `liftwatch` CLI settings
    #[serde(default)]
    pub client: ClientConfig,

    /// `liftwatch-server` settings
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the HTTP API, including the `/api` prefix
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Verify a restored session with the server right after startup
    #[serde(default = "default_verify_on_startup")]
    pub verify_on_startup: bool,

    /// Session storage file. Defaults to `session.json` next to the config.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Base64 HMAC secret. Unset means a fresh random secret per start,
    /// which invalidates every issued token on restart.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt_secret: Option<String>,

    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: u64,
}

fn default_api_base_url() -> String {
    format!("http://localhost:{}/api", crate::DEFAULT_API_PORT)
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_verify_on_startup() -> bool {
    true
}

fn default_listen_addr() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    crate::DEFAULT_API_PORT
}

fn default_token_ttl_hours() -> u64 {
    24
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            timeout_secs: default_timeout_secs(),
            verify_on_startup: default_verify_on_startup(),
            storage_path: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
            jwt_secret: None,
            token_ttl_hours: default_token_ttl_hours(),
        }
    }
}

impl ClientConfig {
    /// Where the token store lives
    pub fn storage_path(&self) -> Result<PathBuf, ConfigError> {
        match self.storage_path {
            Some(ref path) => Ok(path.clone()),
            None => Ok(Config::config_dir()?.join(SESSION_FILE)),
        }
    }
}

impl ServerConfig {
    pub fn token_ttl_secs(&self) -> u64 {
        self.token_ttl_hours.saturating_mul(3600)
    }
}

impl Config {
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(ConfigError::NoConfigDir)
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Load the per-user config, or defaults when there is none yet
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path()?)
    }

    /// Write as TOML, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let text = toml::to_string_pretty(self)?;
        std::fs::write(path, text).map_err(io_err)
    }
}
