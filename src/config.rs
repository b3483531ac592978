//! # Configuration Management
//!
//! Centralized configuration for the packet server.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment-specific overrides via `from_env()`
//!
//! ## Defaults
//! The defaults reproduce the classic model: unbounded connections, no idle
//! timeout, 1 KB socket reads, and packets up to the full 16-bit length.

use crate::core::packet::{HEADER_SIZE, MAX_PACKET_SIZE};
use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Default size of a single socket read
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;

/// Default time to wait for sessions to drain on shutdown
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Server-specific configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("PACKET_SERVER_ADDRESS") {
            config.server.address = addr;
        }

        if let Ok(max) = std::env::var("PACKET_SERVER_MAX_CONNECTIONS") {
            let val = max.parse::<usize>().map_err(|e| {
                ProtocolError::ConfigError(format!("Invalid PACKET_SERVER_MAX_CONNECTIONS: {e}"))
            })?;
            config.server.max_connections = Some(val);
        }

        if let Ok(timeout) = std::env::var("PACKET_SERVER_IDLE_TIMEOUT_MS") {
            let val = timeout.parse::<u64>().map_err(|e| {
                ProtocolError::ConfigError(format!("Invalid PACKET_SERVER_IDLE_TIMEOUT_MS: {e}"))
            })?;
            config.server.idle_timeout = Some(Duration::from_millis(val));
        }

        if let Ok(level) = std::env::var("PACKET_SERVER_LOG_LEVEL") {
            config.logging.log_level = level.parse::<Level>().map_err(|_| {
                ProtocolError::ConfigError(format!("Invalid PACKET_SERVER_LOG_LEVEL: {level}"))
            })?;
        }

        Ok(config)
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.server.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Server-specific configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server listen address (e.g., "127.0.0.1:3000")
    pub address: String,

    /// Bytes requested from the socket per read
    pub read_buffer_size: usize,

    /// Longest frame the framer will slice; larger length prefixes are clamped
    pub max_packet_size: usize,

    /// Cap on concurrent sessions, `None` for unbounded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<usize>,

    /// End sessions that send nothing for this long, `None` to never time out
    #[serde(with = "option_duration_serde", skip_serializing_if = "Option::is_none")]
    pub idle_timeout: Option<Duration>,

    /// Timeout for graceful server shutdown
    #[serde(with = "duration_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: String::from("127.0.0.1:3000"),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_packet_size: MAX_PACKET_SIZE,
            max_connections: None,
            idle_timeout: None,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Validate server configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.is_empty() {
            errors.push("Server address cannot be empty".to_string());
        } else if self.address.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!(
                "Invalid server address format: '{}' (expected format: '0.0.0.0:3000')",
                self.address
            ));
        }

        if self.read_buffer_size == 0 {
            errors.push("Read buffer size must be greater than 0".to_string());
        } else if self.read_buffer_size > 16 * 1024 * 1024 {
            errors.push(format!(
                "Read buffer size too large: {} bytes (maximum: 16 MB)",
                self.read_buffer_size
            ));
        }

        if self.max_packet_size < HEADER_SIZE {
            errors.push(format!(
                "Max packet size too small: {} (minimum: {HEADER_SIZE} bytes)",
                self.max_packet_size
            ));
        } else if self.max_packet_size > MAX_PACKET_SIZE {
            errors.push(format!(
                "Max packet size too large: {} (maximum: {MAX_PACKET_SIZE} bytes)",
                self.max_packet_size
            ));
        }

        if self.max_connections == Some(0) {
            errors.push("Max connections must be greater than 0".to_string());
        }

        if let Some(timeout) = self.idle_timeout {
            if timeout.as_millis() < 100 {
                errors.push("Idle timeout too short (minimum: 100ms)".to_string());
            }
        }

        if self.shutdown_timeout.as_secs() > 300 {
            errors.push("Shutdown timeout too long (maximum: 300s)".to_string());
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level, overridden by `RUST_LOG` when set
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("packet-server"),
            log_level: Level::INFO,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Optional durations, in milliseconds; absent means `None`
mod option_duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration
            .map(|d| d.as_millis() as u64)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
