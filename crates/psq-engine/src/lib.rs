//! # psq-engine
//!
//! Joins parsed sheet rows to QBench sample metadata and computes the
//! reportable result for every analyte.
//!
//! [`process`] is pure: the same rows and metadata always produce the same
//! samples, values and warnings. Problems that affect a single sample or row
//! become [`ReconcileWarning`]s; only a run in which nothing reconciles is an
//! error.

pub mod calc;
mod error;
mod matching;

use std::collections::HashMap;

use psq_core::analytes;
use psq_core::{ProcessedSample, RawResultRow, SampleMetadata};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use error::{EngineError, ReconcileWarning};
pub use matching::{MetadataIndex, Resolution};

use crate::calc::CalcError;

/// One line of the operator summary table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayRow {
    pub sample: String,
    pub analyte: String,
    pub status: String,
    /// Recommended dilution, or `-`.
    pub dilution: String,
}

/// Everything one reconciliation produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    /// Samples in order of first appearance in the sheet.
    pub samples: Vec<ProcessedSample>,
    pub warnings: Vec<ReconcileWarning>,
    pub display_rows: Vec<DisplayRow>,
}

/// Sheet rows for one normalized sample id, duplicates already resolved.
struct SampleGroup<'r> {
    key: String,
    /// All rows seen, including replaced duplicates.
    row_count: usize,
    /// One row per analyte, at the analyte's first position.
    rows: Vec<&'r RawResultRow>,
    positions: HashMap<String, usize>,
}

impl<'r> SampleGroup<'r> {
    fn new(key: String) -> Self {
        Self {
            key,
            row_count: 0,
            rows: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Add a row; a repeated analyte replaces the earlier row and returns it.
    /// Analytes are compared the way the panel lookup compares them.
    fn push(&mut self, row: &'r RawResultRow) -> Option<&'r RawResultRow> {
        self.row_count += 1;
        let analyte = analytes::lookup_key(&row.analyte_name);
        if let Some(&idx) = self.positions.get(&analyte) {
            return Some(std::mem::replace(&mut self.rows[idx], row));
        }
        self.positions.insert(analyte, self.rows.len());
        self.rows.push(row);
        None
    }

    /// First non-empty dilution factor among the kept rows.
    fn dilution_factor(&self) -> Option<Decimal> {
        self.rows.iter().find_map(|row| row.dilution_factor)
    }
}

/// Group rows by normalized sample id, keeping first-appearance order.
fn group_rows<'r>(
    rows: &'r [RawResultRow],
    warnings: &mut Vec<ReconcileWarning>,
) -> Vec<SampleGroup<'r>> {
    let mut groups: Vec<SampleGroup<'r>> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for row in rows {
        if row.sample_key.is_empty() {
            continue;
        }
        let idx = *index.entry(row.sample_key.as_str()).or_insert_with(|| {
            groups.push(SampleGroup::new(row.sample_key.clone()));
            groups.len() - 1
        });
        let group = &mut groups[idx];
        if let Some(replaced) = group.push(row) {
            warnings.push(ReconcileWarning::DuplicateRow {
                sample_id: group.key.clone(),
                analyte: row.analyte_name.clone(),
                row: row.row,
                replaced_row: replaced.row,
            });
        }
    }
    groups
}

/// Reconcile sheet rows with QBench metadata and compute every result.
///
/// - Rows are grouped by normalized sample id; a repeated analyte within a
///   sample keeps its first position and takes the later row's value.
/// - A group that matches no metadata, or ties between several QBench
///   samples, is excluded with a warning.
/// - Metadata without rows is ignored.
///
/// # Errors
///
/// Returns [`EngineError::NoResults`] if `rows` is non-empty but no sample
/// reconciled.
pub fn process(
    rows: &[RawResultRow],
    metadata: &[SampleMetadata],
) -> Result<Reconciliation, EngineError> {
    let mut out = Reconciliation::default();
    if rows.is_empty() {
        return Ok(out);
    }

    let groups = group_rows(rows, &mut out.warnings);
    let index = MetadataIndex::build(metadata);

    for group in &groups {
        let record = match index.resolve(&group.key) {
            Resolution::Matched(record) => record,
            Resolution::Ambiguous(candidates) => {
                out.warnings.push(ReconcileWarning::AmbiguousSample {
                    sample_id: group.key.clone(),
                    candidates,
                });
                continue;
            }
            Resolution::Unmatched => {
                out.warnings.push(ReconcileWarning::UnmatchedSample {
                    sample_id: group.key.clone(),
                    rows: group.row_count,
                });
                continue;
            }
        };

        if let Some(sample) = build_sample(group, record, &mut out.warnings) {
            out.display_rows.extend(display_rows(&sample));
            out.samples.push(sample);
        }
    }

    for warning in &out.warnings {
        tracing::warn!(%warning, "reconciliation warning");
    }
    tracing::info!(
        groups = groups.len(),
        samples = out.samples.len(),
        warnings = out.warnings.len(),
        "reconciled sheet rows",
    );

    if out.samples.is_empty() {
        return Err(EngineError::NoResults {
            samples: groups.len(),
        });
    }
    Ok(out)
}

fn build_sample(
    group: &SampleGroup<'_>,
    record: &SampleMetadata,
    warnings: &mut Vec<ReconcileWarning>,
) -> Option<ProcessedSample> {
    let dilution_factor = group.dilution_factor();
    let mut analytes = Vec::with_capacity(group.rows.len());

    for row in &group.rows {
        match calc::process_row(row, dilution_factor, record.sample_weight_mg) {
            Ok(analyte) => analytes.push(analyte),
            Err(CalcError::InvalidMass) => warnings.push(ReconcileWarning::InvalidMass {
                sample_id: group.key.clone(),
                analyte: row.analyte_name.clone(),
            }),
            Err(CalcError::OutOfRange) => warnings.push(ReconcileWarning::ValueOutOfRange {
                sample_id: group.key.clone(),
                analyte: row.analyte_name.clone(),
                row: row.row,
            }),
        }
    }

    if analytes.is_empty() {
        return None;
    }
    Some(ProcessedSample {
        sample_id: group.key.clone(),
        metadata: record.clone(),
        dilution_factor,
        analytes,
    })
}

fn display_rows(sample: &ProcessedSample) -> impl Iterator<Item = DisplayRow> + '_ {
    sample.analytes.iter().map(|analyte| DisplayRow {
        sample: sample.sample_id.clone(),
        analyte: analyte.analyte_name.clone(),
        status: analyte.verdict.label().to_string(),
        dilution: analyte
            .dilution_recommendation
            .map_or_else(|| "-".to_string(), |d| d.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use psq_core::{Unit, canonical_analyte_name, normalize_sample_id};

    use super::*;

    fn row(n: u32, sample: &str, analyte: &str, value: i64) -> RawResultRow {
        RawResultRow {
            row: n,
            sample_id: sample.into(),
            sample_key: normalize_sample_id(sample),
            analyte_name: canonical_analyte_name(analyte),
            component: analyte.into(),
            raw_value: Decimal::from(value),
            unit: Unit::Ppm,
            dilution_factor: None,
        }
    }

    #[test]
    fn grouping_keeps_first_position_and_last_value() {
        let rows = vec![
            row(2, "S1", "Naled", 1),
            row(3, "S1", "Abamectin", 2),
            row(4, "s-1", "naled", 3),
        ];
        let mut warnings = Vec::new();
        let groups = group_rows(&rows, &mut warnings);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].row_count, 3);
        let values: Vec<_> = groups[0].rows.iter().map(|r| r.raw_value).collect();
        assert_eq!(values, vec![Decimal::from(3), Decimal::from(2)]);
        assert_eq!(
            warnings,
            vec![ReconcileWarning::DuplicateRow {
                sample_id: "S1".into(),
                analyte: "naled".into(),
                row: 4,
                replaced_row: 2,
            }]
        );
    }

    #[test]
    fn starred_analyte_is_a_duplicate_of_the_plain_name() {
        let rows = vec![row(2, "S1", "Pyrethrins", 1), row(3, "S1", "Pyrethrins*", 2)];
        let mut warnings = Vec::new();
        let groups = group_rows(&rows, &mut warnings);

        assert_eq!(groups[0].rows.len(), 1);
        assert_eq!(groups[0].rows[0].raw_value, Decimal::from(2));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn empty_input_is_empty_output() {
        let result = process(&[], &[]).unwrap();
        assert!(result.samples.is_empty());
        assert!(result.warnings.is_empty());
    }
}
