// src/error.rs
//! Error types for reconciliation transports and configuration.

use thiserror::Error;

/// Failure of a discovery round trip. Local state is never touched when one
/// of these is returned.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("naming authority i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed discovery frame: {0}")]
    Malformed(String),

    #[error("naming authority unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T, E = TransportError> = std::result::Result<T, E>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}
