//! Main application configuration
//!
//! This module defines the primary configuration structures for the
//! ready-room service, including environment variable loading, optional
//! TOML files, and validation.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub ready_check: ReadyCheckSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Port for health check and metrics endpoint
    pub health_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// Ready-check lifecycle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyCheckSettings {
    /// How long players have to answer a ready check, in seconds.
    /// Also fills in `expires_at` for documents written without one.
    pub accept_timeout_seconds: u64,
    /// Re-join cooldown applied to a declining player, in seconds
    pub decline_cooldown_seconds: u64,
    /// Pending documents older than this window are ignored by the feed
    pub recent_window_hours: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "ready-room".to_string(),
            log_level: "info".to_string(),
            health_port: 8080,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl Default for ReadyCheckSettings {
    fn default() -> Self {
        Self {
            accept_timeout_seconds: 60,
            decline_cooldown_seconds: 300, // 5 minutes
            recent_window_hours: 24,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.service.log_level = log_level;
        }
        if let Ok(port) = env::var("HEALTH_PORT") {
            config.service.health_port = port
                .parse()
                .map_err(|_| anyhow!("Invalid HEALTH_PORT value: {}", port))?;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            config.service.shutdown_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid SHUTDOWN_TIMEOUT_SECONDS value: {}", timeout))?;
        }

        // Ready-check settings
        if let Ok(timeout) = env::var("ACCEPT_TIMEOUT_SECONDS") {
            config.ready_check.accept_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid ACCEPT_TIMEOUT_SECONDS value: {}", timeout))?;
        }
        if let Ok(cooldown) = env::var("DECLINE_COOLDOWN_SECONDS") {
            config.ready_check.decline_cooldown_seconds = cooldown
                .parse()
                .map_err(|_| anyhow!("Invalid DECLINE_COOLDOWN_SECONDS value: {}", cooldown))?;
        }
        if let Ok(window) = env::var("RECENT_WINDOW_HOURS") {
            config.ready_check.recent_window_hours = window
                .parse()
                .map_err(|_| anyhow!("Invalid RECENT_WINDOW_HOURS value: {}", window))?;
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        validate_config(&config)?;
        Ok(config)
    }

    /// Graceful shutdown timeout as a Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Ready-check answer window as a chrono Duration
    pub fn accept_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.ready_check.accept_timeout_seconds as i64)
    }

    /// Decline cooldown as a chrono Duration
    pub fn decline_cooldown(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.ready_check.decline_cooldown_seconds as i64)
    }

    /// Recent-document window as a chrono Duration
    pub fn recent_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.ready_check.recent_window_hours as i64)
    }
}

/// Validate a loaded configuration
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.service.name.is_empty() {
        return Err(anyhow!("service name must not be empty"));
    }
    if config.ready_check.accept_timeout_seconds == 0 {
        return Err(anyhow!("accept_timeout_seconds must be positive"));
    }
    if config.ready_check.recent_window_hours == 0 {
        return Err(anyhow!("recent_window_hours must be positive"));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.service.log_level.as_str()) {
        return Err(anyhow!(
            "invalid log level '{}', expected one of {:?}",
            config.service.log_level,
            valid_levels
        ));
    }

    Ok(())
}
