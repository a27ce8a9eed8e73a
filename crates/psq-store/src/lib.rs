//! # psq-store
//!
//! Persists processed samples as rows in the report table.
//!
//! [`save`] submits every sample on its own and reports which ones landed, so
//! a caller can retry just the failures. [`RecordSink`] is the seam between
//! that logic and the backend; [`SupabaseStore`] is the production sink.

mod error;
mod record;
mod supabase;

use std::future::Future;

use psq_core::ProcessedSample;

pub use error::PersistenceError;
pub use record::{AnalyteRecord, ReportRecord, SaveContext, SavedReport};
pub use supabase::{SupabaseStore, check_response};

/// Destination for report records.
pub trait RecordSink: Send + Sync {
    /// Insert a single record.
    fn insert(
        &self,
        record: &ReportRecord,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
}

/// A sample that could not be saved.
#[derive(Debug)]
pub struct FailedSave {
    pub sample_id: String,
    pub error: PersistenceError,
}

/// Which samples were saved and which were not.
#[derive(Debug, Default)]
pub struct SaveOutcome {
    pub saved: Vec<String>,
    pub failed: Vec<FailedSave>,
}

impl SaveOutcome {
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Ids of the samples to resubmit.
    #[must_use]
    pub fn failed_ids(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.sample_id.as_str()).collect()
    }
}

/// Save each sample independently and report per-sample results.
pub async fn save<S: RecordSink>(
    sink: &S,
    samples: &[ProcessedSample],
    context: &SaveContext,
) -> SaveOutcome {
    save_while(sink, samples, context, || true).await
}

/// Like [`save`], but checks `keep_going` before each sample and stops at the
/// first `false`. An insert already in flight always completes, so `saved`
/// lists exactly the rows that reached the store.
pub async fn save_while<S, F>(
    sink: &S,
    samples: &[ProcessedSample],
    context: &SaveContext,
    keep_going: F,
) -> SaveOutcome
where
    S: RecordSink,
    F: Fn() -> bool + Sync,
{
    let mut outcome = SaveOutcome::default();

    for sample in samples {
        if !keep_going() {
            tracing::info!(
                remaining = samples.len() - outcome.saved.len() - outcome.failed.len(),
                "saving stopped",
            );
            break;
        }
        let result = match ReportRecord::from_sample(sample, context) {
            Ok(record) => sink.insert(&record).await,
            Err(err) => Err(err),
        };
        match result {
            Ok(()) => outcome.saved.push(sample.sample_id.clone()),
            Err(error) => {
                tracing::warn!(sample = %sample.sample_id, %error, "failed to save report");
                outcome.failed.push(FailedSave {
                    sample_id: sample.sample_id.clone(),
                    error,
                });
            }
        }
    }

    tracing::info!(
        saved = outcome.saved.len(),
        failed = outcome.failed.len(),
        "saved reports",
    );
    outcome
}
