//! Row shapes for the report table.

use psq_core::{ProcessedSample, Unit};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;

/// Who a batch of records is saved for and by.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveContext {
    pub client_name: Option<String>,
    pub processed_by: Option<String>,
}

/// One analyte inside `results_json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyteRecord {
    pub analyte: String,
    pub component: String,
    pub raw_value: Decimal,
    pub normalized_value: Decimal,
    pub unit: Unit,
    pub final_result: String,
    pub status: String,
    pub dil: Option<u32>,
}

/// One row inserted per processed sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub batch_number: String,
    pub sample_number: String,
    pub custom_formatted_id: Option<String>,
    pub sample_name: Option<String>,
    pub sample_date: Option<String>,
    pub dilution_factor: Option<Decimal>,
    pub mass_mg: Option<Decimal>,
    /// JSON-encoded array of [`AnalyteRecord`].
    pub results_json: String,
    pub client_name: Option<String>,
    pub processed_by: Option<String>,
}

impl ReportRecord {
    /// # Errors
    ///
    /// Returns [`PersistenceError::Encode`] if the analyte list cannot be serialized.
    pub fn from_sample(
        sample: &ProcessedSample,
        context: &SaveContext,
    ) -> Result<Self, PersistenceError> {
        let analytes: Vec<AnalyteRecord> = sample
            .analytes
            .iter()
            .map(|a| AnalyteRecord {
                analyte: a.analyte_name.clone(),
                component: a.component.clone(),
                raw_value: a.raw_value,
                normalized_value: a.normalized_value,
                unit: a.unit,
                final_result: a.final_result(),
                status: a.verdict.label().to_string(),
                dil: a.dilution_recommendation,
            })
            .collect();

        let meta = &sample.metadata;
        Ok(Self {
            batch_number: meta.batch_id.clone(),
            sample_number: sample.sample_id.clone(),
            custom_formatted_id: meta.external_id.clone(),
            sample_name: meta.sample_name.clone(),
            sample_date: meta.date_created.clone(),
            dilution_factor: sample.dilution_factor,
            mass_mg: meta.sample_weight_mg,
            results_json: serde_json::to_string(&analytes)?,
            client_name: context.client_name.clone(),
            processed_by: context.processed_by.clone(),
        })
    }

    /// Decode `results_json` back into analyte rows.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Encode`] if the stored text is not valid.
    pub fn analytes(&self) -> Result<Vec<AnalyteRecord>, PersistenceError> {
        Ok(serde_json::from_str(&self.results_json)?)
    }
}

/// Summary columns returned by [`crate::SupabaseStore::fetch_recent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedReport {
    pub batch_number: Option<String>,
    pub sample_number: Option<String>,
    pub custom_formatted_id: Option<String>,
    pub sample_name: Option<String>,
    pub created_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use psq_core::{Detection, ProcessedAnalyte, SampleMetadata, Verdict};

    use super::*;

    fn sample() -> ProcessedSample {
        ProcessedSample {
            sample_id: "A07".into(),
            metadata: SampleMetadata {
                sample_id: "A07".into(),
                qbench_id: "a07".into(),
                external_id: Some("PS-A07".into()),
                batch_id: "B-1001".into(),
                sample_name: Some("Blue Dream".into()),
                matrix_type: None,
                state: None,
                date_created: Some("2026-10-18".into()),
                sample_weight_mg: Some(Decimal::new(250, 0)),
            },
            dilution_factor: Some(Decimal::new(10, 0)),
            analytes: vec![ProcessedAnalyte {
                analyte_name: "Naled".into(),
                component: "Naled 1".into(),
                raw_value: Decimal::new(1000, 0),
                raw_unit: Unit::NgPerMl,
                normalized_value: Decimal::new(40_000, 3),
                unit: Unit::Ppm,
                detection: Detection::Detected,
                verdict: Verdict::Fail,
                limit: Some(Decimal::new(5, 1)),
                dilution_recommendation: Some(5),
            }],
        }
    }

    #[test]
    fn record_carries_metadata_and_context() {
        let context = SaveContext {
            client_name: None,
            processed_by: Some("jdoe".into()),
        };
        let record = ReportRecord::from_sample(&sample(), &context).unwrap();

        assert_eq!(record.batch_number, "B-1001");
        assert_eq!(record.sample_number, "A07");
        assert_eq!(record.custom_formatted_id.as_deref(), Some("PS-A07"));
        assert_eq!(record.mass_mg, Some(Decimal::new(250, 0)));
        assert_eq!(record.processed_by.as_deref(), Some("jdoe"));
    }

    #[test]
    fn results_json_is_an_encoded_array() {
        let record = ReportRecord::from_sample(&sample(), &SaveContext::default()).unwrap();

        let value: serde_json::Value = serde_json::from_str(&record.results_json).unwrap();
        assert_eq!(value[0]["analyte"], "Naled");
        assert_eq!(value[0]["final_result"], "40");
        assert_eq!(value[0]["status"], "Fail");
        assert_eq!(value[0]["unit"], "ppm");
        assert_eq!(value[0]["dil"], 5);

        let analytes = record.analytes().unwrap();
        assert_eq!(analytes[0].normalized_value, Decimal::new(40, 0));
    }
}
