//! Resolving normalized sheet sample ids to QBench metadata.

use std::collections::HashMap;

use psq_core::{MatchRank, SampleMetadata};

/// Outcome of looking up one sheet sample id.
#[derive(Debug, PartialEq, Eq)]
pub enum Resolution<'a> {
    Matched(&'a SampleMetadata),
    /// Several distinct QBench samples tie for the strongest key.
    Ambiguous(Vec<String>),
    Unmatched,
}

/// Every match key of every metadata record.
#[derive(Debug, Default)]
pub struct MetadataIndex<'a> {
    by_key: HashMap<String, Vec<(MatchRank, &'a SampleMetadata)>>,
}

impl<'a> MetadataIndex<'a> {
    #[must_use]
    pub fn build(metadata: &'a [SampleMetadata]) -> Self {
        let mut by_key: HashMap<String, Vec<(MatchRank, &'a SampleMetadata)>> = HashMap::new();
        for record in metadata {
            for (key, rank) in record.match_keys() {
                by_key.entry(key).or_default().push((rank, record));
            }
        }
        Self { by_key }
    }

    /// Strongest-ranked match for a normalized sample id.
    ///
    /// The same QBench sample listed under two batches counts once.
    #[must_use]
    pub fn resolve(&self, key: &str) -> Resolution<'a> {
        let Some(candidates) = self.by_key.get(key) else {
            return Resolution::Unmatched;
        };
        let Some(best) = candidates.iter().map(|(rank, _)| *rank).min() else {
            return Resolution::Unmatched;
        };

        let mut winners: Vec<&'a SampleMetadata> = Vec::new();
        for &(_, record) in candidates.iter().filter(|(rank, _)| *rank == best) {
            if !winners.iter().any(|w| w.qbench_id == record.qbench_id) {
                winners.push(record);
            }
        }

        match winners.as_slice() {
            [only] => Resolution::Matched(*only),
            _ => Resolution::Ambiguous(winners.iter().map(|w| w.qbench_id.clone()).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use psq_core::normalize_sample_id;

    use super::*;

    fn meta(qbench_id: &str, external: Option<&str>, batch: &str) -> SampleMetadata {
        SampleMetadata {
            sample_id: normalize_sample_id(qbench_id),
            qbench_id: qbench_id.into(),
            external_id: external.map(Into::into),
            batch_id: batch.into(),
            sample_name: None,
            matrix_type: None,
            state: None,
            date_created: None,
            sample_weight_mg: None,
        }
    }

    #[test]
    fn direct_id_match() {
        let metadata = vec![meta("a07", None, "B-1001")];
        let index = MetadataIndex::build(&metadata);
        assert_eq!(index.resolve("A07"), Resolution::Matched(&metadata[0]));
        assert_eq!(index.resolve("A08"), Resolution::Unmatched);
    }

    #[test]
    fn sample_id_outranks_external_tail() {
        let metadata = vec![meta("900", Some("PS-123"), "B-1"), meta("123", None, "B-1")];
        let index = MetadataIndex::build(&metadata);
        assert_eq!(index.resolve("123"), Resolution::Matched(&metadata[1]));
        assert_eq!(index.resolve("PS123"), Resolution::Matched(&metadata[0]));
    }

    #[test]
    fn tie_between_distinct_samples_is_ambiguous() {
        let metadata = vec![
            meta("900", Some("PS-123"), "B-1"),
            meta("901", Some("QC-123"), "B-1"),
        ];
        let index = MetadataIndex::build(&metadata);
        assert_eq!(
            index.resolve("123"),
            Resolution::Ambiguous(vec!["900".into(), "901".into()])
        );
    }

    #[test]
    fn same_sample_in_two_batches_is_not_ambiguous() {
        let metadata = vec![meta("481", None, "B-1"), meta("481", None, "B-2")];
        let index = MetadataIndex::build(&metadata);
        assert_eq!(index.resolve("481"), Resolution::Matched(&metadata[0]));
    }
}
