use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reconciliation failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Raw rows were supplied but not one sample could be reconciled.
    #[error("no results: none of the {samples} sample(s) in the sheet could be reconciled")]
    NoResults { samples: usize },
}

/// A non-fatal issue found while reconciling. Collected and reported per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconcileWarning {
    /// Sheet rows whose sample matched no QBench metadata. The sample is excluded.
    UnmatchedSample { sample_id: String, rows: usize },

    /// The sample id matched more than one QBench record equally well.
    AmbiguousSample {
        sample_id: String,
        candidates: Vec<String>,
    },

    /// The same analyte appeared again for a sample; the later row replaced the earlier.
    DuplicateRow {
        sample_id: String,
        analyte: String,
        row: u32,
        replaced_row: u32,
    },

    /// An extract concentration could not be normalized for lack of a usable mass.
    InvalidMass { sample_id: String, analyte: String },

    /// A raw value too large to normalize. The analyte is excluded.
    ValueOutOfRange {
        sample_id: String,
        analyte: String,
        row: u32,
    },
}

impl std::fmt::Display for ReconcileWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnmatchedSample { sample_id, rows } => {
                write!(f, "sample {sample_id}: no QBench metadata, {rows} row(s) excluded")
            }
            Self::AmbiguousSample {
                sample_id,
                candidates,
            } => write!(
                f,
                "sample {sample_id}: matches several QBench samples ({}), excluded",
                candidates.join(", ")
            ),
            Self::DuplicateRow {
                sample_id,
                analyte,
                row,
                replaced_row,
            } => write!(
                f,
                "sample {sample_id}: {analyte} repeated on row {row}, replacing row {replaced_row}"
            ),
            Self::InvalidMass { sample_id, analyte } => write!(
                f,
                "sample {sample_id}: {analyte} needs a positive sample mass, excluded"
            ),
            Self::ValueOutOfRange {
                sample_id,
                analyte,
                row,
            } => write!(
                f,
                "sample {sample_id}: {analyte} on row {row} is out of range, excluded"
            ),
        }
    }
}
