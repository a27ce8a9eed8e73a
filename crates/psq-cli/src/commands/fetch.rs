use anyhow::Context;
use psq_config::PsqConfig;
use psq_core::SampleMetadata;
use psq_pipeline::MetadataSource;
use psq_qbench::QBenchClient;
use serde::Serialize;

use crate::cli::{FetchArgs, GlobalFlags};
use crate::output::output;
use crate::progress::Progress;

const DEFAULT_LIMIT: usize = 200;

#[derive(Debug, Serialize)]
struct SampleRow {
    batch: String,
    sample_id: String,
    qbench_id: String,
    external_id: Option<String>,
    name: Option<String>,
    matrix: Option<String>,
    created: Option<String>,
    mass_mg: Option<String>,
}

impl From<SampleMetadata> for SampleRow {
    fn from(sample: SampleMetadata) -> Self {
        Self {
            batch: sample.batch_id,
            sample_id: sample.sample_id,
            qbench_id: sample.qbench_id,
            external_id: sample.external_id,
            name: sample.sample_name,
            matrix: sample.matrix_type,
            created: sample.date_created,
            mass_mg: sample.sample_weight_mg.map(|mass| mass.normalize().to_string()),
        }
    }
}

/// Handle `psq fetch`.
pub async fn handle(args: &FetchArgs, config: &PsqConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    let client = QBenchClient::new(&config.qbench).context("QBench client unavailable")?;
    let progress = Progress::spinner("querying QBench");

    let mut rows = Vec::new();
    for batch in &args.batches {
        progress.set_message(&format!("querying batch {batch}"));
        let samples = match client.batch_samples(batch).await {
            Ok(samples) => samples,
            Err(error) => {
                progress.finish_err("QBench query failed");
                return Err(error).with_context(|| format!("failed to fetch batch {batch}"));
            }
        };
        rows.extend(samples.into_iter().map(SampleRow::from));
    }
    progress.finish_ok(&format!("{} sample(s)", rows.len()));

    rows.truncate(flags.limit_or(DEFAULT_LIMIT));
    output(&rows, flags.format)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use psq_core::SampleMetadata;

    use super::SampleRow;

    #[test]
    fn mass_is_shown_without_trailing_zeros() {
        let row = SampleRow::from(SampleMetadata {
            sample_id: "123".into(),
            qbench_id: "123".into(),
            external_id: Some("PS-123".into()),
            batch_id: "B-1001".into(),
            sample_name: Some("Blue Dream".into()),
            matrix_type: Some("Flower".into()),
            state: None,
            date_created: None,
            sample_weight_mg: Some("250.000".parse().expect("decimal")),
        });

        assert_eq!(row.mass_mg.as_deref(), Some("250"));
        assert_eq!(row.batch, "B-1001");
    }
}
