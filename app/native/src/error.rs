//! Error types for surface-portal.
//!
//! Reconciliation itself never fails; every degraded case hides the entry
//! and recovers on a later pass. These errors cover the outer surface:
//! configuration, registry queries and the CLI.

use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::platform::WindowId;

/// Errors that can occur outside of reconciliation.
///
/// Serializes as `{"kind": ..., "message": ...}` so the CLI can report it
/// as JSON.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "kind", content = "message")]
pub enum PortalError {
    /// Invalid command arguments.
    #[error("{0}")]
    InvalidArguments(String),
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// The registry has no portal for this window.
    #[error("Unknown window: {0}")]
    UnknownWindow(WindowId),
    /// IO error.
    #[error("IO error: {0}")]
    IoError(String),
    /// Generic command error.
    #[error("{0}")]
    CommandError(String),
}

/// Result alias used across the crate.
pub type PortalResult<T> = Result<T, PortalError>;

impl From<std::io::Error> for PortalError {
    fn from(err: std::io::Error) -> Self { Self::IoError(err.to_string()) }
}

impl From<serde_json::Error> for PortalError {
    fn from(err: serde_json::Error) -> Self { Self::CommandError(err.to_string()) }
}

impl From<ConfigError> for PortalError {
    fn from(err: ConfigError) -> Self { Self::ConfigError(err.to_string()) }
}
