//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::net::IpAddr;

use serde::Deserialize;

use crate::error::ConfigError;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Whether the MCP server starts with the host.
    #[serde(default = "default_true")]
    pub server_enabled: bool,

    /// Port the HTTP front-end listens on.
    #[serde(default = "default_port")]
    pub server_port: u16,

    /// Address the listener binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Host name advertised to SSE clients in the message endpoint URL.
    #[serde(default = "default_advertised_host")]
    pub advertised_host: String,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            _schema: None,
            _comment: None,
            server_enabled: default_true(),
            server_port: default_port(),
            bind_address: default_bind_address(),
            advertised_host: default_advertised_host(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_port == 0 {
            return Err(ConfigError::ValidationError {
                message: "server_port must be between 1 and 65535".to_string(),
            });
        }

        if self.bind_address.parse::<IpAddr>().is_err() {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid bind_address '{}'. Must be an IPv4 or IPv6 address",
                    self.bind_address
                ),
            });
        }

        if self.advertised_host.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "advertised_host must not be empty".to_string(),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            });
        }

        Ok(())
    }

    /// Returns the bind address as an [`IpAddr`].
    ///
    /// Falls back to the loopback address if the configured value does not
    /// parse; [`Config::validate`] rejects such configurations up front.
    #[must_use]
    pub fn bind_ip(&self) -> IpAddr {
        self.bind_address
            .parse()
            .unwrap_or(IpAddr::V4(std::net::Ipv4Addr::LOCALHOST))
    }
}

const fn default_true() -> bool {
    true
}

const fn default_port() -> u16 {
    8767
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_advertised_host() -> String {
    "localhost".to_string()
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
