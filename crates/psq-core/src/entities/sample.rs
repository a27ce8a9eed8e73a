use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::normalize_sample_id;

/// How strongly a normalized key identifies a sample. Lower is stronger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRank {
    /// The QBench sample id.
    SampleId,
    /// The lab's custom formatted id (e.g. `PS-0123`).
    ExternalId,
    /// The part of the custom formatted id after its last `-`.
    ExternalIdTail,
}

/// Sample metadata as retrieved from QBench. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleMetadata {
    /// Normalized QBench sample id.
    pub sample_id: String,
    /// QBench sample id exactly as returned by the API.
    pub qbench_id: String,
    /// Custom formatted id (`custom_formatted_id`).
    pub external_id: Option<String>,
    /// Batch label detected on the sample, or the batch it was requested under.
    pub batch_id: String,
    pub sample_name: Option<String>,
    pub matrix_type: Option<String>,
    pub state: Option<String>,
    pub date_created: Option<String>,
    /// Sample mass in milligrams used for extract normalization.
    pub sample_weight_mg: Option<Decimal>,
}

impl SampleMetadata {
    /// Every normalized key this sample can be matched by, strongest first.
    #[must_use]
    pub fn match_keys(&self) -> Vec<(String, MatchRank)> {
        let mut keys = Vec::with_capacity(3);
        if !self.sample_id.is_empty() {
            keys.push((self.sample_id.clone(), MatchRank::SampleId));
        }

        if let Some(external) = self.external_id.as_deref() {
            let normalized = normalize_sample_id(external);
            if !normalized.is_empty() {
                keys.push((normalized, MatchRank::ExternalId));
            }
            if let Some((_, tail)) = external.rsplit_once('-') {
                let normalized_tail = normalize_sample_id(tail);
                if !normalized_tail.is_empty() {
                    keys.push((normalized_tail, MatchRank::ExternalIdTail));
                }
            }
        }

        keys
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn metadata(qbench_id: &str, external_id: Option<&str>) -> SampleMetadata {
        SampleMetadata {
            sample_id: normalize_sample_id(qbench_id),
            qbench_id: qbench_id.into(),
            external_id: external_id.map(Into::into),
            batch_id: "B-1001".into(),
            sample_name: None,
            matrix_type: None,
            state: None,
            date_created: None,
            sample_weight_mg: None,
        }
    }

    #[test]
    fn match_keys_include_external_id_and_tail() {
        let keys = metadata("00481", Some("PS-0123")).match_keys();
        assert_eq!(
            keys,
            vec![
                ("481".to_string(), MatchRank::SampleId),
                ("PS0123".to_string(), MatchRank::ExternalId),
                ("123".to_string(), MatchRank::ExternalIdTail),
            ]
        );
    }

    #[test]
    fn match_keys_without_external_id() {
        let keys = metadata("A07", None).match_keys();
        assert_eq!(keys, vec![("A07".to_string(), MatchRank::SampleId)]);
    }

    #[test]
    fn rank_orders_strongest_first() {
        assert!(MatchRank::SampleId < MatchRank::ExternalId);
        assert!(MatchRank::ExternalId < MatchRank::ExternalIdTail);
    }
}
