//! Error types and handling for NED CO2
//!
//! This module defines the error types used throughout the application.
//! `NedError` covers setup and service failures; `RefreshError` is scoped to a
//! single refresh cycle and never ends the process.

use thiserror::Error;

/// Result type alias for NED CO2 operations
pub type Result<T> = std::result::Result<T, NedError>;

/// Maximum number of characters of a response body kept in a `RefreshError`
pub const MAX_ERROR_BODY_CHARS: usize = 256;

/// Main error type for NED CO2
#[derive(Debug, Error)]
pub enum NedError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// HTTP/Web server errors
    #[error("Web server error: {message}")]
    Web { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Network-related errors
    #[error("Network error: {message}")]
    Network { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Entry could not be set up because its first refresh failed
    #[error("Entry not ready: {0}")]
    NotReady(#[source] RefreshError),

    /// Entry id not present in the registry
    #[error("Unknown entry: {entry_id}")]
    UnknownEntry { entry_id: String },

    /// Coordinator task is gone and no longer accepts commands
    #[error("Coordinator stopped")]
    CoordinatorStopped,
}

impl NedError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        NedError::Config {
            message: message.into(),
        }
    }

    /// Create a new web error
    pub fn web<S: Into<String>>(message: S) -> Self {
        NedError::Web {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<F: Into<String>, S: Into<String>>(field: F, message: S) -> Self {
        NedError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        NedError::Io {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        NedError::Network {
            message: message.into(),
        }
    }

    /// Create an unknown-entry error
    pub fn unknown_entry<S: Into<String>>(entry_id: S) -> Self {
        NedError::UnknownEntry {
            entry_id: entry_id.into(),
        }
    }
}

impl From<std::io::Error> for NedError {
    fn from(err: std::io::Error) -> Self {
        NedError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for NedError {
    fn from(err: serde_yaml::Error) -> Self {
        NedError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for NedError {
    fn from(err: serde_json::Error) -> Self {
        NedError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for NedError {
    fn from(err: reqwest::Error) -> Self {
        NedError::network(err.to_string())
    }
}

impl From<chrono::ParseError> for NedError {
    fn from(err: chrono::ParseError) -> Self {
        NedError::validation("datetime", err.to_string())
    }
}

/// Failure of a single refresh cycle
///
/// The previous successful result stays published when one of these occurs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefreshError {
    /// Remote API answered with a non-200 status
    #[error("NED HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// DNS, connect, TLS, timeout or connection reset
    #[error("NED transport error: {0}")]
    Transport(String),

    /// Response body was not the expected JSON document
    #[error("NED decode error: {0}")]
    Decode(String),
}

impl RefreshError {
    /// Build an HTTP error, truncating the body to `MAX_ERROR_BODY_CHARS`
    pub fn http(status: u16, body: &str) -> Self {
        RefreshError::Http {
            status,
            body: truncate_body(body),
        }
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            RefreshError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RefreshError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RefreshError::Decode(err.to_string())
        } else {
            RefreshError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RefreshError {
    fn from(err: serde_json::Error) -> Self {
        RefreshError::Decode(err.to_string())
    }
}

fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_ERROR_BODY_CHARS {
        return trimmed.to_string();
    }
    // Ellipsis counts toward the limit
    let kept: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS - 1).collect();
    format!("{}…", kept)
}
