pub mod runtime;
pub use runtime::{new_runtime_config, RuntimeConfig, SharedRuntimeConfig};

use crate::status::{PolicyKind, DEFAULT_DELAYED_MULTIPLIER, DEFAULT_HEARTBEAT_WINDOW_SECONDS};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Complete service configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GreenhouseConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub status: StatusConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

/// SQLite location
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("greenhouse.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Liveness policy configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StatusConfig {
    #[serde(default)]
    pub policy: PolicyKind,
    /// DELAYED -> OFFLINE threshold as a multiple of the expected interval
    #[serde(default = "default_delayed_multiplier")]
    pub delayed_multiplier: f64,
    /// Freshness window for the heartbeat policy (seconds)
    #[serde(default = "default_heartbeat_window")]
    pub heartbeat_window_seconds: i64,
}

fn default_delayed_multiplier() -> f64 {
    DEFAULT_DELAYED_MULTIPLIER
}

fn default_heartbeat_window() -> i64 {
    DEFAULT_HEARTBEAT_WINDOW_SECONDS
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::default(),
            delayed_multiplier: default_delayed_multiplier(),
            heartbeat_window_seconds: default_heartbeat_window(),
        }
    }
}

/// Dashboard limits
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    /// Cap applied to "recent alerts" when the caller gives none
    #[serde(default = "default_recent_alert_limit")]
    pub recent_alert_limit: usize,
    /// Upper clamp for any caller-supplied alert limit
    #[serde(default = "default_max_alert_limit")]
    pub max_alert_limit: usize,
}

fn default_recent_alert_limit() -> usize {
    10
}

fn default_max_alert_limit() -> usize {
    500
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            recent_alert_limit: default_recent_alert_limit(),
            max_alert_limit: default_max_alert_limit(),
        }
    }
}

/// API key protection. No key = open access (dev mode).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub api_key: Option<String>,
}

impl GreenhouseConfig {
    /// `GREENHOUSE_API_KEY` takes precedence over the file.
    pub fn apply_env(mut self) -> Self {
        if let Ok(key) = std::env::var("GREENHOUSE_API_KEY") {
            if !key.is_empty() {
                self.auth.api_key = Some(key);
            }
        }
        self
    }
}

/// Load configuration from TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<GreenhouseConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: GreenhouseConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(config)
}

/// Load the file if it exists, otherwise fall back to defaults.
pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<GreenhouseConfig> {
    if path.as_ref().exists() {
        load_config(path)
    } else {
        Ok(GreenhouseConfig::default())
    }
}
