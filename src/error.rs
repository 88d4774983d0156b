//! Error types for host-bridge-mcp.
//!
//! Protocol-level failures (bad JSON, unknown methods, invalid params) are not
//! Rust errors: they travel back to the client as JSON-RPC error responses.
//! The enums here cover the failures that happen *around* the protocol:
//! configuration, service registration, cross-thread dispatch and the
//! server lifecycle.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors raised while populating the service registry.
///
/// Registration happens once at startup, so these are fatal for the
/// embedding application.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The service prefix was empty.
    #[error("service prefix must not be empty")]
    EmptyPrefix,

    /// The service prefix contains a character that breaks `prefix/method` routing.
    #[error("service prefix '{prefix}' must not contain '/'")]
    InvalidPrefix {
        /// The rejected prefix.
        prefix: String,
    },

    /// A service was already registered under this prefix.
    #[error("service prefix '{prefix}' is already registered")]
    DuplicatePrefix {
        /// The conflicting prefix.
        prefix: String,
    },
}

/// Failures of the main-thread dispatcher.
///
/// Both variants mean the closure could not be (or was not) run to
/// completion on the main thread. The transport reports them as JSON-RPC
/// internal errors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// The main-thread queue was shut down before the task could be enqueued.
    #[error("main-thread queue is shut down")]
    QueueClosed,

    /// The task was accepted but dropped before signalling completion
    /// (queue dropped with pending work, or the closure panicked).
    #[error("main-thread task was dropped before completion")]
    TaskDropped,
}

/// Errors from the server lifecycle.
#[derive(Error, Debug)]
pub enum ServerError {
    /// `start` was called on a server that is already running.
    #[error("server is already running")]
    AlreadyRunning,

    /// The transport runtime could not be created.
    #[error("failed to create transport runtime")]
    Runtime(#[source] std::io::Error),

    /// The listener could not be bound.
    #[error("failed to bind to {addr}")]
    Bind {
        /// Address the server tried to bind.
        addr: SocketAddr,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let error = ConfigError::NotFound {
            path: PathBuf::from("/path/to/config.json"),
        };
        let msg = error.to_string();
        assert!(msg.contains("not found"));
        assert!(msg.contains("config.json"));
    }

    #[test]
    fn validation_error_display() {
        let error = ConfigError::ValidationError {
            message: "invalid setting".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("invalid setting"));
    }

    #[test]
    fn registry_error_names_prefix() {
        let error = RegistryError::DuplicatePrefix {
            prefix: "assets".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "service prefix 'assets' is already registered"
        );
    }

    #[test]
    fn bind_error_names_address() {
        let error = ServerError::Bind {
            addr: "127.0.0.1:8767".parse().unwrap(),
            source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
        };
        assert!(error.to_string().contains("127.0.0.1:8767"));
    }
}
