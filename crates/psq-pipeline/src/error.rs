use std::path::PathBuf;

use psq_engine::EngineError;
use psq_ingest::IngestError;
use psq_qbench::QBenchError;
use thiserror::Error;

/// Why a run produced no results.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no batch ids were given")]
    NoBatches,

    #[error("QBench returned no samples for batch(es) {}", .batches.join(", "))]
    NoMetadata { batches: Vec<String> },

    #[error("batch {batch}: {source}")]
    Metadata {
        batch: String,
        #[source]
        source: QBenchError,
    },

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Stopped by the caller. No samples are returned; `saved` and `exported`
    /// list what had already been committed before the run stopped.
    #[error("run cancelled ({} saved, {} exported)", .saved.len(), .exported.len())]
    Cancelled {
        saved: Vec<String>,
        exported: Vec<PathBuf>,
    },

    /// A worker task panicked or was aborted.
    #[error("run worker failed: {0}")]
    Worker(String),
}

impl PipelineError {
    /// Cancelled before anything was saved or written.
    #[must_use]
    pub const fn cancelled() -> Self {
        Self::Cancelled {
            saved: Vec::new(),
            exported: Vec::new(),
        }
    }
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Worker(err.to_string())
    }
}
