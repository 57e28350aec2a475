//! Configuration types for the GRX client.

use crate::errors::GrxClientError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Complete GRX client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Connection settings.
    pub connection: ConnectionConfig,
    /// Reconnection settings.
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    /// Event delivery settings.
    #[serde(default)]
    pub events: EventConfig,
}

/// Connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Processor hostname or IP address.
    pub host: String,
    /// Processor telnet port.
    pub port: u16,
    /// Username sent at the `login: ` prompt.
    pub username: String,
}

/// Reconnection configuration.
///
/// The reconnect cadence is a fixed interval with no backoff growth; the
/// processor is a local device and a tight, predictable retry is what
/// the integration expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Interval between reconnect attempts, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Bound on each login handshake read, in milliseconds.
    #[serde(default = "default_login_timeout_ms")]
    pub login_timeout_ms: u64,
    /// Maximum consecutive failed reconnect attempts (0 = retry forever).
    #[serde(default)]
    pub max_retries: u32,
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_login_timeout_ms() -> u64 {
    5_000
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            login_timeout_ms: default_login_timeout_ms(),
            max_retries: 0,
        }
    }
}

/// Event delivery configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventConfig {
    /// Forward `~ERROR` lines as typed events instead of logging only.
    #[serde(default)]
    pub forward_protocol_errors: bool,
}

impl Config {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, does not parse as
    /// TOML, or fails validation.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, GrxClientError> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            GrxClientError::Config(format!("cannot read {}: {e}", path.as_ref().display()))
        })?;
        let config: Self = toml::from_str(&text)
            .map_err(|e| GrxClientError::Config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<(), GrxClientError> {
        if self.connection.host.is_empty() {
            return Err(GrxClientError::Config("Host cannot be empty".to_string()));
        }

        if self.connection.port == 0 {
            return Err(GrxClientError::Config("Port cannot be 0".to_string()));
        }

        if self.connection.username.is_empty() {
            return Err(GrxClientError::Config(
                "Username cannot be empty".to_string(),
            ));
        }

        if self.reconnect.poll_interval_ms == 0 {
            return Err(GrxClientError::Config(
                "Poll interval cannot be 0".to_string(),
            ));
        }

        if self.reconnect.login_timeout_ms == 0 {
            return Err(GrxClientError::Config(
                "Login timeout cannot be 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Returns the reconnect polling interval.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect.poll_interval_ms)
    }

    /// Returns the per-step login handshake bound.
    #[must_use]
    pub fn login_timeout(&self) -> Duration {
        Duration::from_millis(self.reconnect.login_timeout_ms)
    }
}

/// Builder for creating a `Config`.
pub struct ConfigBuilder {
    config: Config,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self {
            config: Config {
                connection: ConnectionConfig {
                    host: String::new(),
                    port: 23,
                    username: String::new(),
                },
                reconnect: ReconnectConfig::default(),
                events: EventConfig::default(),
            },
        }
    }
}

impl ConfigBuilder {
    /// Sets the processor hostname or IP address.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.connection.host = host.into();
        self
    }

    /// Sets the processor port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.connection.port = port;
        self
    }

    /// Sets the login username.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.config.connection.username = username.into();
        self
    }

    /// Sets the reconnect polling interval.
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.reconnect.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Sets the login handshake bound.
    #[must_use]
    pub fn login_timeout(mut self, timeout: Duration) -> Self {
        self.config.reconnect.login_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Sets the reconnect attempt ceiling (0 = retry forever).
    #[must_use]
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.reconnect.max_retries = max_retries;
        self
    }

    /// Forward `~ERROR` lines as typed events.
    #[must_use]
    pub fn forward_protocol_errors(mut self, forward: bool) -> Self {
        self.config.events.forward_protocol_errors = forward;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> Result<Config, GrxClientError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
