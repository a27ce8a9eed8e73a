//! # psq-core
//!
//! Core types shared across the psq crates:
//! - Sample metadata retrieved from QBench and the keys it can be matched by
//! - Raw spreadsheet rows and the processed per-sample results built from them
//! - Concentration units and pass/fail verdicts
//! - Sample identifier and analyte name normalization
//! - The state action-limit catalog
//! - Cross-cutting error types

pub mod analytes;
pub mod entities;
pub mod enums;
pub mod errors;
pub mod ids;

pub use entities::{
    MatchRank, ProcessedAnalyte, ProcessedSample, RawResultRow, SampleMetadata,
};
pub use enums::{Detection, Unit, Verdict};
pub use errors::CoreError;
pub use ids::{canonical_analyte_name, normalize_sample_id};
