//! Progress notifications sent from a running pipeline.

use std::fmt;

/// Step a run is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    FetchingMetadata,
    ParsingWorkbook,
    Reconciling,
    Saving,
    Exporting,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FetchingMetadata => "fetching metadata",
            Self::ParsingWorkbook => "parsing workbook",
            Self::Reconciling => "reconciling",
            Self::Saving => "saving",
            Self::Exporting => "exporting",
            Self::Done => "done",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    Progress { stage: Stage, message: String },
    /// Something the operator should see that did not stop the run.
    Warning { message: String },
}
