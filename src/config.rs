//! Configuration management for NED CO2
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files with support for environment variable overrides.

use crate::error::{NedError, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

mod defaults;

/// Default NED utilizations endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.ned.nl/v1/utilizations";

/// Environment variable holding an explicit config file path
pub const CONFIG_PATH_ENV: &str = "NED_CO2_CONFIG";

/// Environment variable overriding `api.api_key`
pub const API_KEY_ENV: &str = "NED_API_KEY";

/// Environment variable overriding `api.base_url`
pub const BASE_URL_ENV: &str = "NED_CO2_BASE_URL";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// NED API access
    pub api: ApiConfig,

    /// Grid point and time window options
    pub window: WindowConfig,

    /// IANA timezone used as the host's local time
    pub timezone: String,

    /// Refresh interval in seconds
    pub update_interval_secs: u64,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Web server binding configuration
    pub web: WebConfig,
}

/// NED API access parameters
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Value sent in the `X-AUTH-TOKEN` header
    pub api_key: String,

    /// Endpoint queried for both classifications
    pub base_url: String,

    /// Optional per-request timeout; the HTTP client default applies when unset
    pub request_timeout_secs: Option<u64>,
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("api_key", &if self.api_key.is_empty() { "" } else { "***" })
            .field("base_url", &self.base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Time resolution code understood by the NED API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Granularity {
    /// 15-minute slots
    QuarterHour,
    /// Hourly slots
    Hour,
}

impl Granularity {
    pub fn code(self) -> u8 {
        match self {
            Self::QuarterHour => 4,
            Self::Hour => 5,
        }
    }
}

impl TryFrom<u8> for Granularity {
    type Error = String;

    fn try_from(code: u8) -> std::result::Result<Self, Self::Error> {
        match code {
            4 => Ok(Self::QuarterHour),
            5 => Ok(Self::Hour),
            other => Err(format!("granularity must be 4 or 5, got {}", other)),
        }
    }
}

impl From<Granularity> for u8 {
    fn from(g: Granularity) -> Self {
        g.code()
    }
}

/// Per-fetch query options; replaced wholesale on update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Grid location identifier (0 = Nederland)
    pub point: u32,

    /// Slot resolution
    pub granularity: Granularity,

    /// Days of forecast to request, 1..=3
    pub window_days: u8,

    /// Bucket by local calendar day instead of UTC
    pub local_tz_filter: bool,
}

pub const MIN_WINDOW_DAYS: u8 = 1;
pub const MAX_WINDOW_DAYS: u8 = 3;

impl WindowConfig {
    /// Validate option ranges
    pub fn validate(&self) -> Result<()> {
        if !(MIN_WINDOW_DAYS..=MAX_WINDOW_DAYS).contains(&self.window_days) {
            return Err(NedError::validation(
                "window.window_days",
                format!(
                    "Must be between {} and {}",
                    MIN_WINDOW_DAYS, MAX_WINDOW_DAYS
                ),
            ));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Path to log file (its directory receives the rolling files)
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

/// Web server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Bind address
    pub host: String,

    /// TCP port
    pub port: u16,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the first existing default location and
    /// apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::locate() {
            Some(path) => Self::from_file(path)?,
            None => Config::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn locate() -> Option<String> {
        if let Ok(explicit) = std::env::var(CONFIG_PATH_ENV)
            && !explicit.trim().is_empty()
        {
            return Some(explicit);
        }

        let default_paths = [
            "ned_co2.yaml",
            "/data/ned_co2.yaml",
            "/etc/ned-co2/config.yaml",
        ];
        default_paths
            .iter()
            .find(|p| Path::new(p).exists())
            .map(|p| (*p).to_string())
    }

    /// Apply `NED_API_KEY` / `NED_CO2_BASE_URL` overrides
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
        {
            self.api.api_key = key;
        }
        if let Some(url) = lookup(BASE_URL_ENV)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
        {
            self.api.base_url = url;
        }
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parsed host timezone
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| NedError::validation("timezone", e.to_string()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api.api_key.trim().is_empty() {
            return Err(NedError::validation(
                "api.api_key",
                format!("API key is required (set it in the file or {})", API_KEY_ENV),
            ));
        }

        if self.api.base_url.trim().is_empty() {
            return Err(NedError::validation(
                "api.base_url",
                "Base URL cannot be empty",
            ));
        }

        if self.api.request_timeout_secs == Some(0) {
            return Err(NedError::validation(
                "api.request_timeout_secs",
                "Must be greater than 0 when set",
            ));
        }

        self.window.validate()?;
        self.tz()?;

        if self.update_interval_secs == 0 {
            return Err(NedError::validation(
                "update_interval_secs",
                "Must be greater than 0",
            ));
        }

        if self.web.port == 0 {
            return Err(NedError::validation(
                "web.port",
                "Port must be greater than 0",
            ));
        }

        Ok(())
    }
}
