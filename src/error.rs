//! Error types for the latency harness

use std::any::Any;
use thiserror::Error;

/// Harness-level error type
#[derive(Error, Debug)]
pub enum BenchError {
    /// Missing or invalid configuration (credentials, endpoint, counts)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Prompt source could not be loaded
    #[error("prompt error: {0}")]
    Prompt(String),

    /// Report or chart could not be written
    #[error("reporting error: {0}")]
    Reporting(String),

    /// A whole experiment runner failed
    #[error("runner '{name}' failed: {reason}")]
    Runner {
        /// Experiment name
        name: String,
        /// Failure description
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BenchError {
    /// Create a runner failure
    pub fn runner(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Runner {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a reporting error
    pub fn reporting(msg: impl Into<String>) -> Self {
        Self::Reporting(msg.into())
    }

    /// Create a prompt loading error
    pub fn prompt(msg: impl Into<String>) -> Self {
        Self::Prompt(msg.into())
    }
}

/// Result type alias
pub type BenchResult<T> = std::result::Result<T, BenchError>;

/// Configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set
    #[error("missing environment variable {0}")]
    MissingVar(&'static str),

    /// An endpoint URL is malformed
    #[error("invalid endpoint '{0}': expected an http(s) URL")]
    InvalidEndpoint(String),

    /// Invalid search count
    #[error("invalid search count: {0}")]
    InvalidSearchCount(String),

    /// Invalid timeout
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
}

/// Errors from a single search call
///
/// Every variant is recorded as an `error` attempt; none of them are retried.
#[derive(Debug, Error)]
pub enum SearchError {
    /// HTTP/network error (includes client-side timeouts)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response
    #[error("API error ({status}): {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly truncated
        body: String,
    },

    /// The call returned but carried no content
    #[error("empty response")]
    EmptyResponse,

    /// An agent run ended in a non-completed state
    #[error("agent run {run_id} ended with status '{status}'")]
    RunFailed {
        /// Run identifier
        run_id: String,
        /// Terminal status reported by the service
        status: String,
    },

    /// Response body could not be decoded
    #[error("decode error: {0}")]
    Decode(String),
}

impl SearchError {
    /// Build a status error, truncating long bodies
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        let mut body = body.into();
        if body.len() > 500 {
            let cut = (0..=500).rev().find(|i| body.is_char_boundary(*i)).unwrap_or(0);
            body.truncate(cut);
        }
        Self::Status { status, body }
    }
}

/// Text of a caught panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
