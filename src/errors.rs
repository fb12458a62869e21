//! Typed error hierarchy for the live-refresh client.
//!
//! - `TransportError`: connecting to, writing to, or reading from the push channel
//! - `ConfigError`: loading, saving, and interpreting `live.toml`
//!
//! Envelope and origin errors live in `kanban_common` next to their types.

use kanban_common::OriginError;
use thiserror::Error;

/// Errors from a single transport (one connection attempt and its lifetime).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Failed to connect to {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("Failed to send frame: {0}")]
    Send(String),

    #[error("Failed to receive frame: {0}")]
    Receive(String),
}

/// Errors from the configuration layer.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write config file at {path}: {source}")]
    Write {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse live.toml: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize live.toml: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid page origin: {0}")]
    InvalidOrigin(#[from] OriginError),
}
