//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files and the
//! process environment.
//!
//! Credentials are never compiled in: API keys come from the config file or
//! from `ROVER_CONTROL_API_KEY` / `ROVER_TELEMETRY_API_KEY`.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{Result, RoverRemoteError};

/// Environment variable naming the configuration file
pub const CONFIG_PATH_ENV: &str = "ROVER_REMOTE_CONFIG";

/// Configuration file used when [`CONFIG_PATH_ENV`] is unset
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Vehicle controller endpoint
#[derive(Deserialize, Clone)]
pub struct ControlConfig {
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Telemetry reporting endpoint
#[derive(Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Operator-side settings
#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    #[serde(default = "default_initial_speed")]
    pub initial_speed: i64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Write logs to a daily-rolling file in this directory instead of stderr
    #[serde(default)]
    pub log_dir: Option<String>,
}

// Default value functions
fn default_request_timeout_ms() -> u64 { 5000 }
fn default_poll_interval_ms() -> u64 { 10_000 }
fn default_initial_speed() -> i64 { 50 }
fn default_log_level() -> String { "info".to_string() }

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { initial_speed: default_initial_speed() }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), log_dir: None }
    }
}

fn redact(key: &str) -> &'static str {
    if key.is_empty() { "<unset>" } else { "<redacted>" }
}

impl std::fmt::Debug for ControlConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlConfig")
            .field("url", &self.url)
            .field("api_key", &redact(&self.api_key))
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

impl std::fmt::Debug for TelemetryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryConfig")
            .field("url", &self.url)
            .field("api_key", &redact(&self.api_key))
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

impl Config {
    /// Load configuration from a TOML file, then apply environment overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - An environment override is not a number where one is expected
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rover_remote::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.apply_overrides(env_lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from defaults and environment variables only
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();
        config.apply_overrides(env_lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file named by `ROVER_REMOTE_CONFIG` (or the default path)
    ///
    /// A missing file falls back to [`Config::from_env`].
    pub fn discover() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        if Path::new(&path).exists() {
            Self::load(&path)
        } else {
            Self::from_env()
        }
    }

    /// Apply `ROVER_*` overrides using the given variable lookup
    ///
    /// Takes a lookup function so tests do not have to mutate the process
    /// environment.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("ROVER_CONTROL_URL") {
            self.control.url = url;
        }
        if let Some(key) = lookup("ROVER_CONTROL_API_KEY") {
            self.control.api_key = key;
        }
        if let Some(url) = lookup("ROVER_TELEMETRY_URL") {
            self.telemetry.url = url;
        }
        if let Some(key) = lookup("ROVER_TELEMETRY_API_KEY") {
            self.telemetry.api_key = key;
        }
        if let Some(raw) = lookup("ROVER_POLL_INTERVAL_MS") {
            self.telemetry.poll_interval_ms = parse_number("ROVER_POLL_INTERVAL_MS", &raw)?;
        }
        if let Some(raw) = lookup("ROVER_INITIAL_SPEED") {
            self.client.initial_speed = parse_number("ROVER_INITIAL_SPEED", &raw)?;
        }
        if let Some(dir) = lookup("ROVER_LOG_DIR") {
            self.logging.log_dir = Some(dir);
        }
        Ok(())
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is missing or out of range
    pub fn validate(&self) -> Result<()> {
        if self.control.url.trim().is_empty() {
            return Err(RoverRemoteError::Config(
                "control url cannot be empty".to_string()
            ));
        }

        if self.telemetry.url.trim().is_empty() {
            return Err(RoverRemoteError::Config(
                "telemetry url cannot be empty".to_string()
            ));
        }

        for (name, url) in [("control", &self.control.url), ("telemetry", &self.telemetry.url)] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(RoverRemoteError::Config(
                    format!("{} url must start with http:// or https://", name)
                ));
            }
        }

        if self.telemetry.poll_interval_ms < 100 || self.telemetry.poll_interval_ms > 3_600_000 {
            return Err(RoverRemoteError::Config(
                "poll_interval_ms must be between 100 and 3600000".to_string()
            ));
        }

        for (name, value) in [
            ("control request_timeout_ms", self.control.request_timeout_ms),
            ("telemetry request_timeout_ms", self.telemetry.request_timeout_ms),
        ] {
            if value == 0 || value > 60_000 {
                return Err(RoverRemoteError::Config(
                    format!("{} must be between 1 and 60000", name)
                ));
            }
        }

        if !(0..=100).contains(&self.client.initial_speed) {
            return Err(RoverRemoteError::Config(
                "initial_speed must be between 0 and 100".to_string()
            ));
        }

        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(RoverRemoteError::Config(
                format!("unknown log level '{}'", self.logging.level)
            ));
        }

        Ok(())
    }
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| {
        RoverRemoteError::Config(format!("{} must be a number, got '{}'", name, raw))
    })
}
