//! Sample and result entities.

mod result;
mod sample;

pub use result::{ProcessedAnalyte, ProcessedSample, RawResultRow};
pub use sample::{MatchRank, SampleMetadata};
