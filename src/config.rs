//! Configuration loaded from environment variables.
//!
//! All values have defaults suitable for development. In production,
//! configure via environment variables or a `.env` file.
//!
//! - `SHUTDOWN_SIGNALS`: Comma-separated signals to listen for (default: `int,term`)
//! - `SHUTDOWN_CLEANUP_TIMEOUT_SECS`: Upper bound on the cleanup phase, `0` = unbounded (default: 0)
//! - `HEARTBEAT_INTERVAL_SECS`: Interval of the demo heartbeat task (default: 5)
//! - `METRICS_PORT`: Prometheus endpoint port, `0` = disabled (default: 0)
//! - `RUST_LOG`: Log filter (default: `info`)

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{CoordinatorError, CoordinatorResult};
use crate::trigger::signal::{DEFAULT_SIGNALS, Signal};

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// Signals the signal trigger listens for
    pub signals: Vec<Signal>,

    /// Cleanup barrier deadline, `None` waits indefinitely
    pub cleanup_timeout: Option<Duration>,

    /// Interval between heartbeats of the background worker
    pub heartbeat_interval: Duration,

    /// Port for Prometheus metrics endpoint (0 = disabled)
    pub metrics_port: u16,

    /// Log level (e.g., "info", "debug", "trace")
    pub log_level: String,
}

impl ShutdownConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns `CoordinatorError::Config` if a value cannot be parsed or
    /// fails validation.
    pub fn from_env() -> CoordinatorResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let timeout_secs: u64 = Self::parse_env("SHUTDOWN_CLEANUP_TIMEOUT_SECS", 0)?;

        let config = Self {
            signals: match env::var("SHUTDOWN_SIGNALS") {
                Ok(raw) => Self::parse_signals(&raw)?,
                Err(_) => DEFAULT_SIGNALS.to_vec(),
            },
            cleanup_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            heartbeat_interval: Duration::from_secs(Self::parse_env("HEARTBEAT_INTERVAL_SECS", 5)?),
            metrics_port: Self::parse_env("METRICS_PORT", 0)?,
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `CoordinatorError::Config` if validation fails.
    fn validate(&self) -> CoordinatorResult<()> {
        if self.signals.is_empty() {
            return Err(CoordinatorError::Config(
                "SHUTDOWN_SIGNALS must name at least one signal".to_string(),
            ));
        }

        if self.heartbeat_interval.is_zero() {
            return Err(CoordinatorError::Config(
                "HEARTBEAT_INTERVAL_SECS must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Check if Prometheus metrics export is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Get the metrics endpoint address.
    ///
    /// Returns `None` if metrics are disabled (port = 0).
    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        self.metrics_enabled()
            .then(|| SocketAddr::from(([0, 0, 0, 0], self.metrics_port)))
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> CoordinatorResult<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .parse()
                .map_err(|e| CoordinatorError::Config(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }

    /// Parse a comma-separated signal list, skipping empty entries.
    fn parse_signals(raw: &str) -> CoordinatorResult<Vec<Signal>> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse::<Signal>)
            .collect()
    }
}

/// Default configuration for testing and development.
impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            signals: DEFAULT_SIGNALS.to_vec(),
            cleanup_timeout: None,
            heartbeat_interval: Duration::from_secs(5),
            metrics_port: 0,
            log_level: "info".to_string(),
        }
    }
}
