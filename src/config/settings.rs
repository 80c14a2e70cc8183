//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::time::Duration;

use serde::Deserialize;

use crate::cache::DEFAULT_CACHE_PREFIX;
use crate::error::ConfigError;
use crate::mcp::protocol::SERVER_NAME;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Server identity and instructions.
    #[serde(default)]
    pub server: ServerConfig,

    /// Outbound keepalive pings.
    #[serde(default)]
    pub keepalive: KeepaliveConfig,

    /// Tool cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.name.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "server.name must not be empty".to_string(),
            });
        }

        if self.cache.prefix.is_empty() {
            return Err(ConfigError::ValidationError {
                message: "cache.prefix must not be empty".to_string(),
            });
        }

        if self.keepalive.enabled {
            if self.keepalive.interval_ms == 0 {
                return Err(ConfigError::ValidationError {
                    message: "keepalive.interval_ms must be greater than 0".to_string(),
                });
            }
            if self.keepalive.timeout_ms == 0 {
                return Err(ConfigError::ValidationError {
                    message: "keepalive.timeout_ms must be greater than 0".to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Server identity.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Name reported in `serverInfo`.
    #[serde(default = "default_server_name")]
    pub name: String,

    /// Instructions returned to the client on `initialize`.
    #[serde(default)]
    pub instructions: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            instructions: String::new(),
        }
    }
}

fn default_server_name() -> String {
    SERVER_NAME.to_string()
}

/// Keepalive ping configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeepaliveConfig {
    /// Send periodic pings once the client has initialised.
    #[serde(default)]
    pub enabled: bool,

    /// Milliseconds between pings.
    /// Default: 30000
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Milliseconds to wait for a pong before reporting a failure.
    /// Default: 3000
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl KeepaliveConfig {
    /// Ping interval as a duration.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Ping timeout as a duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: default_interval_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

const fn default_interval_ms() -> u64 {
    30_000
}

const fn default_timeout_ms() -> u64 {
    3_000
}

/// Cache configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Key namespace prefix.
    #[serde(default = "default_cache_prefix")]
    pub prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            prefix: default_cache_prefix(),
        }
    }
}

fn default_cache_prefix() -> String {
    DEFAULT_CACHE_PREFIX.to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
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
    "warn".to_string()
}
