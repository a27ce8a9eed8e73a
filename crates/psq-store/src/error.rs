use thiserror::Error;

/// Failure to persist or read back report records.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The store has no URL or key configured.
    #[error("report store is not configured: {0}")]
    Config(String),

    /// The request never got a response (connect, timeout, TLS, body).
    #[error("report store request failed: {0}")]
    Request(String),

    /// The store answered with a non-success status.
    #[error("report store rejected the request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("failed to encode report record: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for PersistenceError {
    fn from(err: reqwest::Error) -> Self {
        Self::Request(err.to_string())
    }
}
