//! Error types for sensor-relay
//!
//! This module provides the error taxonomy for the library:
//! - Configuration errors (credential file missing or malformed)
//! - Validation errors, rejected before any I/O happens
//! - Authentication, HTTP, and polling-timeout errors from the transfer layer
//! - Runtime errors from the step pipeline (record counts, executor failures)

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for sensor-relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for sensor-relay
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "current_access_token")
        key: Option<String>,
    },

    /// Malformed call arguments, rejected before any network access
    #[error("validation error: {0}")]
    Validation(String),

    /// Token refresh failed; stored credentials are left unchanged
    #[error("authentication error: {0}")]
    Auth(String),

    /// The service returned a non-success status
    #[error("HTTP {status} from {url}")]
    Http {
        /// The status code returned by the service
        status: reqwest::StatusCode,
        /// The URL that produced the response
        url: String,
    },

    /// The asynchronous export never became ready within the polling budget
    #[error("export not ready after {waited:?}: {url}")]
    Timeout {
        /// The one-time download URL that kept answering 202
        url: String,
        /// Total time spent polling before giving up
        waited: Duration,
    },

    /// Download polling was aborted through the cancellation token
    #[error("operation cancelled")]
    Cancelled,

    /// Pipeline failure (unexpected record counts, zero harvested files,
    /// missing or failing executor entry point)
    #[error("runtime error: {0}")]
    Runtime(String),

    /// Staged export archive could not be extracted
    #[error("extraction failed for {archive}: {reason}")]
    Extraction {
        /// The archive file that failed to extract
        archive: PathBuf,
        /// The reason extraction failed
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Convenience constructor for configuration errors
    pub fn config(message: impl Into<String>, key: Option<&str>) -> Self {
        Error::Config {
            message: message.into(),
            key: key.map(str::to_string),
        }
    }
}
