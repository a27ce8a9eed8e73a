//! Cross-cutting error types for psq.
//!
//! Component-specific errors (`QBenchError`, `IngestError`, ...) live in their
//! own crates. `PipelineError` in `psq-pipeline` is where they converge.

use thiserror::Error;

/// Errors that can be raised by any psq crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A unit label that is not part of the supported set.
    #[error("Unknown concentration unit: '{0}'")]
    UnknownUnit(String),
}
