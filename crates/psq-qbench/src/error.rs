//! QBench client error types.

use psq_config::ConfigError;
use thiserror::Error;

/// Errors that can occur when talking to the QBench API.
#[derive(Debug, Error)]
pub enum QBenchError {
    /// The `qbench` configuration section is incomplete or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Credentials were rejected or the token endpoint refused to issue a token.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The batch or sample does not exist.
    #[error("not found: {resource}")]
    NotFound {
        /// Path of the missing resource (e.g., `batch/B-1001`).
        resource: String,
    },

    /// The service stayed unreachable or overloaded for the whole retry budget.
    #[error("QBench unavailable: {0}")]
    Transient(String),

    /// A response did not match any known payload shape.
    #[error("unexpected response shape for {context}: {message}")]
    Schema {
        /// What was being parsed (e.g., `batch B-1001`).
        context: String,
        /// What was wrong with it.
        message: String,
    },

    /// The API rejected the request with a non-retryable status.
    #[error("request rejected ({status}): {message}")]
    Request {
        /// HTTP status code returned by the API.
        status: u16,
        /// Error message or response body.
        message: String,
    },

    /// Transport failure that is neither a timeout nor a connection error.
    #[error("HTTP error: {0}")]
    Http(String),
}

impl QBenchError {
    /// Whether the failure came from the network or service availability.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
