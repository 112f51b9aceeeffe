//! Configuration management
//!
//! This module handles loading and parsing configuration for the clinician portal.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Session storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Authentication configuration
///
/// The credential pair is the single demo identity accepted by the login flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Accepted username
    #[serde(default = "default_username")]
    pub username: String,
    /// Accepted password
    #[serde(default = "default_password")]
    pub password: String,
    /// Token lifetime in hours
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: u32,
    /// HMAC key for signed tokens; unsigned demo tokens when absent
    #[serde(default)]
    pub signing_key: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: default_username(),
            password: default_password(),
            token_ttl_hours: default_token_ttl_hours(),
            signing_key: None,
        }
    }
}

fn default_username() -> String {
    "admin".to_string()
}

fn default_password() -> String {
    "admin".to_string()
}

fn default_token_ttl_hours() -> u32 {
    8
}

/// Longest accepted token lifetime (one year)
pub const MAX_TOKEN_TTL_HOURS: u32 = 24 * 365;

/// Session storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage driver
    #[serde(default)]
    pub driver: StorageDriver,
    /// Maximum number of entries held by the storage area
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
    /// Drop entries that have not been touched for this long
    #[serde(default)]
    pub idle_timeout_seconds: Option<u64>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            driver: StorageDriver::default(),
            max_entries: default_max_entries(),
            idle_timeout_seconds: None,
        }
    }
}

fn default_max_entries() -> u64 {
    64
}

/// Storage driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageDriver {
    /// In-process storage scoped to one portal instance (default)
    #[default]
    Memory,
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - CLINICIAN_AUTH_USERNAME
    /// - CLINICIAN_AUTH_PASSWORD
    /// - CLINICIAN_AUTH_TOKEN_TTL_HOURS
    /// - CLINICIAN_AUTH_SIGNING_KEY
    /// - CLINICIAN_STORAGE_DRIVER
    /// - CLINICIAN_STORAGE_MAX_ENTRIES
    /// - CLINICIAN_STORAGE_IDLE_TIMEOUT_SECONDS
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the login flow unusable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.token_ttl_hours == 0 {
            return Err(ConfigError::ValidationError(
                "auth.token_ttl_hours must be greater than zero".to_string(),
            ));
        }
        if self.auth.token_ttl_hours > MAX_TOKEN_TTL_HOURS {
            return Err(ConfigError::ValidationError(format!(
                "auth.token_ttl_hours cannot exceed {}",
                MAX_TOKEN_TTL_HOURS
            )));
        }
        if self.auth.username.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.username cannot be empty".to_string(),
            ));
        }
        if matches!(self.auth.signing_key.as_deref(), Some(key) if key.is_empty()) {
            return Err(ConfigError::ValidationError(
                "auth.signing_key cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        // Auth configuration
        if let Ok(username) = std::env::var("CLINICIAN_AUTH_USERNAME") {
            self.auth.username = username;
        }
        if let Ok(password) = std::env::var("CLINICIAN_AUTH_PASSWORD") {
            self.auth.password = password;
        }
        if let Ok(ttl) = std::env::var("CLINICIAN_AUTH_TOKEN_TTL_HOURS") {
            if let Ok(ttl) = ttl.parse::<u32>() {
                self.auth.token_ttl_hours = ttl;
            }
        }
        if let Ok(key) = std::env::var("CLINICIAN_AUTH_SIGNING_KEY") {
            self.auth.signing_key = Some(key);
        }

        // Storage configuration
        if let Ok(driver) = std::env::var("CLINICIAN_STORAGE_DRIVER") {
            if driver.to_lowercase().as_str() == "memory" {
                self.storage.driver = StorageDriver::Memory;
            }
        }
        if let Ok(max_entries) = std::env::var("CLINICIAN_STORAGE_MAX_ENTRIES") {
            if let Ok(max_entries) = max_entries.parse::<u64>() {
                self.storage.max_entries = max_entries;
            }
        }
        if let Ok(idle) = std::env::var("CLINICIAN_STORAGE_IDLE_TIMEOUT_SECONDS") {
            if let Ok(idle) = idle.parse::<u64>() {
                self.storage.idle_timeout_seconds = Some(idle);
            }
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared mutex for all config tests that modify environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
