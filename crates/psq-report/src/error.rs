use std::path::PathBuf;

use thiserror::Error;

/// Report export failure. Nothing is left at `path` when this is returned.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write report {path}: {message}")]
    Write { path: PathBuf, message: String },
}

impl ExportError {
    pub(crate) fn write(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Write {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
