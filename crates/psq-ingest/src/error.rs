use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that stop a worksheet from being read at all.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("workbook not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("cannot read workbook {}: {message}", path.display())]
    Workbook { path: PathBuf, message: String },

    #[error("worksheet '{sheet}' not found (available: {})", available.join(", "))]
    MissingSheet { sheet: String, available: Vec<String> },

    #[error("missing required column(s): {}", columns.join(", "))]
    MissingColumns { columns: Vec<String> },
}

/// A single row that could not be parsed. Collected, not fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowParseError {
    /// 1-based worksheet row.
    pub row: u32,
    /// Header of the offending column.
    pub column: String,
    pub message: String,
}

impl fmt::Display for RowParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}, {}: {}", self.row, self.column, self.message)
    }
}

impl std::error::Error for RowParseError {}
