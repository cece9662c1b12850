//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/quizbeacon/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/quizbeacon/` (~/.config/quizbeacon/)
//! - Data: `$XDG_DATA_HOME/quizbeacon/` (~/.local/share/quizbeacon/)
//! - State/Logs: `$XDG_STATE_HOME/quizbeacon/` (~/.local/state/quizbeacon/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Tracker (emission + context resolution) configuration
    #[serde(default)]
    pub tracker: TrackerConfig,

    /// Session identity configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Tracker configuration
///
/// Covers the ingestion endpoint and the two-stage IP lookup used to
/// annotate events with a network origin.
#[derive(Debug, Deserialize, Clone)]
pub struct TrackerConfig {
    /// Ingestion endpoint events are POSTed to
    #[serde(default = "default_ingest_url")]
    pub ingest_url: String,

    /// Primary (public) IP lookup, expects `{"ip": "..."}`
    #[serde(default = "default_ip_service_url")]
    pub ip_service_url: String,

    /// Fallback IP lookup served by the quiz backend itself
    #[serde(default = "default_ip_fallback_url")]
    pub ip_fallback_url: String,

    /// Seconds between periodic timeSpent emissions
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,

    /// Timeout for each IP lookup at bootstrap, in seconds
    #[serde(default = "default_resolve_timeout_secs")]
    pub resolve_timeout_secs: u64,

    /// User-agent string describing the host environment; classified
    /// into OS/model on every event
    #[serde(default)]
    pub user_agent: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            ingest_url: default_ingest_url(),
            ip_service_url: default_ip_service_url(),
            ip_fallback_url: default_ip_fallback_url(),
            heartbeat_secs: default_heartbeat_secs(),
            resolve_timeout_secs: default_resolve_timeout_secs(),
            user_agent: String::new(),
        }
    }
}

impl TrackerConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.ingest_url.is_empty() {
            return Err(Error::Config("tracker.ingest_url is required".to_string()));
        }
        if self.heartbeat_secs == 0 {
            return Err(Error::Config(
                "tracker.heartbeat_secs must be at least 1".to_string(),
            ));
        }
        if self.resolve_timeout_secs == 0 {
            return Err(Error::Config(
                "tracker.resolve_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_ingest_url() -> String {
    "/api/track".to_string()
}

fn default_ip_service_url() -> String {
    "https://api.ipify.org?format=json".to_string()
}

fn default_ip_fallback_url() -> String {
    "/api/client-ip".to_string()
}

fn default_heartbeat_secs() -> u64 {
    15
}

fn default_resolve_timeout_secs() -> u64 {
    10
}

/// Session identity configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// Days until a persisted session id expires
    #[serde(default = "default_session_ttl_days")]
    pub ttl_days: u32,

    /// Override path for the session record (defaults to the XDG data dir)
    pub path: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_days: default_session_ttl_days(),
            path: None,
        }
    }
}

fn default_session_ttl_days() -> u32 {
    365
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.tracker.validate()?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/quizbeacon/config.toml` (~/.config/quizbeacon/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("quizbeacon").join("config.toml")
    }

    /// Returns the data directory path (for the session record)
    ///
    /// `$XDG_DATA_HOME/quizbeacon/` (~/.local/share/quizbeacon/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("quizbeacon")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/quizbeacon/` (~/.local/state/quizbeacon/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("quizbeacon")
    }

    /// Returns the session record path
    ///
    /// The `[session] path` override wins; otherwise
    /// `$XDG_DATA_HOME/quizbeacon/session.toml`
    pub fn session_path(&self) -> PathBuf {
        self.session
            .path
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("session.toml"))
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/quizbeacon/quizbeacon.log`
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("quizbeacon.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.tracker.ingest_url, "/api/track");
        assert_eq!(config.tracker.heartbeat_secs, 15);
        assert_eq!(config.session.ttl_days, 365);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[tracker]
ingest_url = "https://quiz.example.com/api/track"
ip_fallback_url = "https://quiz.example.com/api/client-ip"
heartbeat_secs = 30

[session]
ttl_days = 30

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.tracker.ingest_url, "https://quiz.example.com/api/track");
        assert_eq!(config.tracker.heartbeat_secs, 30);
        // Untouched fields keep their defaults
        assert_eq!(
            config.tracker.ip_service_url,
            "https://api.ipify.org?format=json"
        );
        assert_eq!(config.session.ttl_days, 30);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_tracker_config_validation() {
        let config = TrackerConfig::default();
        assert!(config.validate().is_ok());

        let config = TrackerConfig {
            ingest_url: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = TrackerConfig {
            heartbeat_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_session_path_override() {
        let mut config = Config::default();
        assert!(config.session_path().ends_with("session.toml"));

        config.session.path = Some(PathBuf::from("/tmp/custom-session.toml"));
        assert_eq!(
            config.session_path(),
            PathBuf::from("/tmp/custom-session.toml")
        );
    }
}
