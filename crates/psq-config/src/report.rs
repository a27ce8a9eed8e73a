//! Spreadsheet input and report output settings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

fn default_output_dir() -> PathBuf {
    PathBuf::from("reports")
}

fn default_sheet_name() -> String {
    "raw results".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReportConfig {
    /// Root directory date-stamped report folders are created under.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Worksheet holding raw instrument results.
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            sheet_name: default_sheet_name(),
        }
    }
}
