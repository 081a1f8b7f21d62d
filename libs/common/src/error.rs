//! Custom error types for the common library
//!
//! This module defines the errors raised while loading configuration and while
//! talking to the upstream backend.

use std::collections::HashMap;

use reqwest::StatusCode;
use thiserror::Error;

/// Error raised by the upstream client
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// Upstream answered with a non-2xx status and a JSON body
    #[error("Upstream responded with {status}: {message}")]
    Status {
        status: StatusCode,
        message: String,
        code: Option<String>,
        details: Option<HashMap<String, Vec<String>>>,
        /// The error body exactly as upstream sent it
        body: serde_json::Value,
    },

    /// Upstream answered with a body that is not JSON
    #[error("Failed to parse upstream response as JSON (status {status})")]
    Unparsable { status: StatusCode },

    /// No response within the configured timeout
    #[error("Upstream request timed out")]
    Timeout,

    /// Connection-level failure reaching upstream
    #[error("Upstream transport error: {0}")]
    Transport(#[source] reqwest::Error),
}

impl UpstreamError {
    /// HTTP status reported by upstream, if a response was received at all
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            UpstreamError::Status { status, .. } | UpstreamError::Unparsable { status } => {
                Some(*status)
            }
            UpstreamError::Timeout | UpstreamError::Transport(_) => None,
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout
        } else {
            UpstreamError::Transport(err)
        }
    }
}

/// Configuration error
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration source could not be read or deserialized
    #[error("Configuration source error: {0}")]
    Source(#[from] config::ConfigError),

    /// A value was read but is not acceptable
    #[error("Invalid configuration value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Type alias for Result with UpstreamError
pub type UpstreamResult<T> = Result<T, UpstreamError>;
