//! End-to-end reconciliation over hand-built sheet rows and metadata.

use pretty_assertions::assert_eq;
use psq_core::{
    Detection, RawResultRow, SampleMetadata, Unit, Verdict, canonical_analyte_name,
    normalize_sample_id,
};
use psq_engine::{EngineError, ReconcileWarning, process};
use rust_decimal::Decimal;

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn row(n: u32, sample: &str, component: &str, value: &str, unit: Unit) -> RawResultRow {
    RawResultRow {
        row: n,
        sample_id: sample.into(),
        sample_key: normalize_sample_id(sample),
        analyte_name: canonical_analyte_name(component),
        component: component.into(),
        raw_value: d(value),
        unit,
        dilution_factor: None,
    }
}

fn meta(qbench_id: &str) -> SampleMetadata {
    SampleMetadata {
        sample_id: normalize_sample_id(qbench_id),
        qbench_id: qbench_id.into(),
        external_id: None,
        batch_id: "B-1001".into(),
        sample_name: Some(format!("Sample {qbench_id}")),
        matrix_type: Some("Flower".into()),
        state: None,
        date_created: None,
        sample_weight_mg: None,
    }
}

#[test]
fn duplicate_ids_in_different_spellings_merge_and_last_value_wins() {
    let rows = vec![
        row(2, "A-07", "Pyrethrin", "2.3", Unit::Ppm),
        row(3, "a07", "Pyrethrin", "2.35", Unit::Ppm),
    ];
    let metadata = vec![meta("A07")];

    let result = process(&rows, &metadata).unwrap();

    assert_eq!(result.samples.len(), 1);
    let sample = &result.samples[0];
    assert_eq!(sample.sample_id, "A07");
    assert_eq!(sample.analytes.len(), 1);
    assert_eq!(sample.analytes[0].normalized_value.to_string(), "2.350");
    assert_eq!(sample.analytes[0].final_result(), "2.35");
    assert_eq!(
        result.warnings,
        vec![ReconcileWarning::DuplicateRow {
            sample_id: "A07".into(),
            analyte: "Pyrethrin".into(),
            row: 3,
            replaced_row: 2,
        }]
    );
}

#[test]
fn unmatched_sample_is_excluded_with_warning() {
    let rows = vec![
        row(2, "S1", "Naled", "0.2", Unit::Ppm),
        row(3, "S2", "Naled", "0.9", Unit::Ppm),
        row(4, "S2", "Abamectin", "0.9", Unit::Ppm),
    ];
    let metadata = vec![meta("S1")];

    let result = process(&rows, &metadata).unwrap();

    let ids: Vec<_> = result.samples.iter().map(|s| s.sample_id.as_str()).collect();
    assert_eq!(ids, vec!["S1"]);
    assert_eq!(
        result.warnings,
        vec![ReconcileWarning::UnmatchedSample {
            sample_id: "S2".into(),
            rows: 2,
        }]
    );
}

#[test]
fn nothing_reconciled_is_an_error() {
    let rows = vec![
        row(2, "S1", "Naled", "0.2", Unit::Ppm),
        row(3, "S2", "Naled", "0.9", Unit::Ppm),
    ];

    let err = process(&rows, &[meta("Z9")]).unwrap_err();
    assert_eq!(err, EngineError::NoResults { samples: 2 });
}

#[test]
fn metadata_without_rows_is_ignored() {
    let rows = vec![row(2, "S1", "Naled", "0.2", Unit::Ppm)];
    let metadata = vec![meta("S1"), meta("S2"), meta("S3")];

    let result = process(&rows, &metadata).unwrap();
    assert_eq!(result.samples.len(), 1);
    assert!(result.warnings.is_empty());
}

#[test]
fn samples_and_analytes_keep_sheet_order() {
    let rows = vec![
        row(2, "20", "Naled", "0.2", Unit::Ppm),
        row(3, "3", "Naled", "0.2", Unit::Ppm),
        row(4, "20", "Abamectin", "0.2", Unit::Ppm),
        row(5, "3", "Bifenazate 1", "0.01", Unit::Ppm),
    ];
    let metadata = vec![meta("3"), meta("20")];

    let result = process(&rows, &metadata).unwrap();

    let ids: Vec<_> = result.samples.iter().map(|s| s.sample_id.as_str()).collect();
    assert_eq!(ids, vec!["20", "3"]);
    let analytes: Vec<_> = result.samples[0]
        .analytes
        .iter()
        .map(|a| a.analyte_name.as_str())
        .collect();
    assert_eq!(analytes, vec!["Naled", "Abamectin"]);
    assert_eq!(result.samples[1].analytes[1].analyte_name, "Bifenazate");
    assert_eq!(result.samples[1].analytes[1].detection, Detection::NotDetected);
}

#[test]
fn extract_concentrations_use_sample_mass() {
    let mut bifenazate = row(2, "481", "Bifenazate", "50", Unit::NgPerMl);
    bifenazate.dilution_factor = Some(d("10"));
    let naled = row(3, "481", "Naled", "1000", Unit::NgPerMl);
    let mut metadata = meta("481");
    metadata.sample_weight_mg = Some(d("250"));

    let result = process(&[bifenazate, naled], &[metadata]).unwrap();
    let sample = &result.samples[0];

    assert_eq!(sample.dilution_factor, Some(d("10")));
    let bifenazate = sample.analyte("Bifenazate").unwrap();
    assert_eq!(bifenazate.normalized_value, d("2.000"));
    assert_eq!(bifenazate.verdict, Verdict::Fail);
    assert_eq!(bifenazate.dilution_recommendation, None);

    // Sample-level dilution applies to rows that carry none.
    let naled = sample.analyte("Naled").unwrap();
    assert_eq!(naled.normalized_value, d("40.000"));
    assert_eq!(naled.dilution_recommendation, Some(5));

    let dilutions: Vec<_> = result.display_rows.iter().map(|r| r.dilution.as_str()).collect();
    assert_eq!(dilutions, vec!["-", "5"]);
    assert_eq!(result.display_rows[0].status, Verdict::Fail.label());
}

#[test]
fn extract_concentration_without_mass_excludes_the_analyte() {
    let rows = vec![
        row(2, "481", "Naled", "0.2", Unit::Ppm),
        row(3, "481", "Bifenazate", "50", Unit::NgPerMl),
    ];

    let result = process(&rows, &[meta("481")]).unwrap();

    assert_eq!(result.samples[0].analytes.len(), 1);
    assert_eq!(
        result.warnings,
        vec![ReconcileWarning::InvalidMass {
            sample_id: "481".into(),
            analyte: "Bifenazate".into(),
        }]
    );
}

#[test]
fn external_id_tail_matches_numeric_sheet_id() {
    let rows = vec![row(2, "0123", "Naled", "0.2", Unit::Ppm)];
    let mut metadata = meta("900");
    metadata.external_id = Some("PS-123".into());

    let result = process(&rows, &[metadata]).unwrap();
    assert_eq!(result.samples[0].sample_id, "123");
    assert_eq!(result.samples[0].metadata.qbench_id, "900");
}

#[test]
fn ambiguous_sample_is_excluded() {
    let rows = vec![
        row(2, "123", "Naled", "0.2", Unit::Ppm),
        row(3, "S1", "Naled", "0.2", Unit::Ppm),
    ];
    let mut first = meta("900");
    first.external_id = Some("PS-123".into());
    let mut second = meta("901");
    second.external_id = Some("QC-123".into());

    let result = process(&rows, &[first, second, meta("S1")]).unwrap();

    assert_eq!(result.samples.len(), 1);
    assert_eq!(
        result.warnings,
        vec![ReconcileWarning::AmbiguousSample {
            sample_id: "123".into(),
            candidates: vec!["900".into(), "901".into()],
        }]
    );
}

#[test]
fn processing_is_deterministic() {
    let rows = vec![
        row(2, "S1", "Naled", "0.55", Unit::Ppm),
        row(3, "S1", "Naled", "0.45", Unit::Ppm),
        row(4, "S2", "Abamectin", "120", Unit::Ppb),
        row(5, "S3", "Abamectin", "1", Unit::Ppm),
    ];
    let metadata = vec![meta("S1"), meta("S2")];

    let first = process(&rows, &metadata).unwrap();
    let second = process(&rows, &metadata).unwrap();
    assert_eq!(first, second);
}

#[test]
fn warnings_serialize_with_kind_tag() {
    let warning = ReconcileWarning::UnmatchedSample {
        sample_id: "S2".into(),
        rows: 2,
    };
    let json = serde_json::to_value(&warning).unwrap();
    assert_eq!(
        json,
        serde_json::json!({"kind": "unmatched_sample", "sample_id": "S2", "rows": 2})
    );
}

#[test]
fn oversized_value_is_excluded_with_warning_instead_of_panicking() {
    let rows = vec![
        row(2, "S1", "Naled", "0.2", Unit::Ppm),
        row(3, "S1", "Bifenazate", "10000000000000000000000000", Unit::Percent),
    ];

    let result = process(&rows, &[meta("S1")]).unwrap();

    let analytes: Vec<_> = result.samples[0]
        .analytes
        .iter()
        .map(|a| a.analyte_name.as_str())
        .collect();
    assert_eq!(analytes, vec!["Naled"]);
    assert_eq!(
        result.warnings,
        vec![ReconcileWarning::ValueOutOfRange {
            sample_id: "S1".into(),
            analyte: "Bifenazate".into(),
            row: 3,
        }]
    );
}

#[test]
fn sample_with_only_oversized_values_leaves_no_results() {
    let rows = vec![row(2, "S1", "Naled", "10000000000000000000000000", Unit::Percent)];

    let err = process(&rows, &[meta("S1")]).unwrap_err();

    assert_eq!(err, EngineError::NoResults { samples: 1 });
}
