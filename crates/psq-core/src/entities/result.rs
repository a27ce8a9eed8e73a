use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::SampleMetadata;
use crate::enums::{Detection, Unit, Verdict};

/// One parsed row from the raw-results worksheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResultRow {
    /// 1-based worksheet row the values came from.
    pub row: u32,
    /// Sample identifier as written in the sheet.
    pub sample_id: String,
    /// Normalized sample identifier used for joining.
    pub sample_key: String,
    /// Canonical analyte name (component index removed).
    pub analyte_name: String,
    /// Component label as written in the sheet.
    pub component: String,
    pub raw_value: Decimal,
    pub unit: Unit,
    pub dilution_factor: Option<Decimal>,
}

/// A single analyte result after unit normalization and limit comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedAnalyte {
    pub analyte_name: String,
    pub component: String,
    pub raw_value: Decimal,
    pub raw_unit: Unit,
    /// Value in `unit`, rounded half-up to the unit's precision.
    pub normalized_value: Decimal,
    pub unit: Unit,
    pub detection: Detection,
    pub verdict: Verdict,
    /// State action limit in `unit`, if the analyte is on the panel.
    pub limit: Option<Decimal>,
    /// Suggested re-injection dilution for over-range extract concentrations.
    pub dilution_recommendation: Option<u32>,
}

impl ProcessedAnalyte {
    /// Text printed in the "Final Result" column: `ND` or the value.
    #[must_use]
    pub fn final_result(&self) -> String {
        match self.detection {
            Detection::NotDetected => "ND".to_string(),
            Detection::Detected => self.normalized_value.normalize().to_string(),
        }
    }
}

/// All processed results for one reconciled sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedSample {
    /// Normalized sample id shared by the raw rows and the metadata record.
    pub sample_id: String,
    pub metadata: SampleMetadata,
    /// First dilution factor found among the sample's rows.
    pub dilution_factor: Option<Decimal>,
    /// Analytes in order of first appearance in the sheet.
    pub analytes: Vec<ProcessedAnalyte>,
}

impl ProcessedSample {
    /// Find a result by analyte name (case-insensitive).
    #[must_use]
    pub fn analyte(&self, name: &str) -> Option<&ProcessedAnalyte> {
        self.analytes
            .iter()
            .find(|a| a.analyte_name.eq_ignore_ascii_case(name.trim()))
    }

    /// Whether any analyte exceeded its action limit.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.analytes.iter().any(|a| a.verdict == Verdict::Fail)
    }
}
