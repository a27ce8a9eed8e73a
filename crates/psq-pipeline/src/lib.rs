//! # psq-pipeline
//!
//! Runs one batch-processing job off the caller's task: collect QBench
//! metadata, parse the raw-results workbook, reconcile, then optionally save
//! and export.
//!
//! [`Orchestrator::spawn`] returns immediately with a [`RunHandle`]. Progress
//! arrives as [`RunEvent`]s on a channel; the final [`RunSummary`] (or error)
//! is awaited separately. Runs that share a batch id never overlap.
//!
//! Cancellation interrupts lookups and parsing immediately. Saving and export
//! stop before their next sample, and the run then reports what was already
//! committed through [`PipelineError::Cancelled`].

mod error;
mod events;
mod locks;
mod source;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use psq_config::ReportConfig;
use psq_core::{ProcessedSample, SampleMetadata};
use psq_engine::{DisplayRow, ReconcileWarning};
use psq_ingest::RowParseError;
use psq_report::ReportExporter;
use psq_store::{RecordSink, SaveContext};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use error::PipelineError;
pub use events::{RunEvent, Stage};
pub use locks::BatchLocks;
pub use source::MetadataSource;

/// Unread events held before new ones are dropped.
const EVENT_BUFFER: usize = 64;

/// What to run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub batches: Vec<String>,
    pub workbook: PathBuf,
    /// Overrides the configured report directory.
    pub output_dir: Option<PathBuf>,
    pub persist: bool,
    pub export: bool,
    pub processed_by: Option<String>,
    /// Date stamped on report folders; today when unset.
    pub report_date: Option<NaiveDate>,
}

impl RunRequest {
    /// Save and export enabled, everything else defaulted.
    #[must_use]
    pub fn new(batches: Vec<String>, workbook: impl Into<PathBuf>) -> Self {
        Self {
            batches,
            workbook: workbook.into(),
            output_dir: None,
            persist: true,
            export: true,
            processed_by: None,
            report_date: None,
        }
    }

    /// Trimmed, non-empty, sorted and de-duplicated batch ids.
    #[must_use]
    pub fn normalized_batches(&self) -> Vec<String> {
        let mut batches: Vec<String> = self
            .batches
            .iter()
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .collect();
        batches.sort();
        batches.dedup();
        batches
    }
}

/// A sample a later step could not handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub sample_id: String,
    pub message: String,
}

/// Consolidated result of one run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub batches: Vec<String>,
    pub metadata_count: usize,
    pub samples: Vec<ProcessedSample>,
    pub display_rows: Vec<DisplayRow>,
    pub warnings: Vec<ReconcileWarning>,
    pub row_errors: Vec<RowParseError>,
    /// Sample ids persisted; empty when saving was off or unavailable.
    pub saved: Vec<String>,
    pub save_failures: Vec<StepFailure>,
    pub exported: Vec<PathBuf>,
    pub export_failures: Vec<StepFailure>,
}

/// A run in progress.
#[derive(Debug)]
pub struct RunHandle {
    /// Closed once the run finishes.
    pub events: mpsc::Receiver<RunEvent>,
    cancel: CancellationToken,
    task: JoinHandle<Result<RunSummary, PipelineError>>,
}

impl RunHandle {
    /// Ask the run to stop. In-flight lookups are dropped and the outcome
    /// becomes [`PipelineError::Cancelled`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the run to finish.
    ///
    /// # Errors
    ///
    /// Returns whatever stopped the run, or [`PipelineError::Worker`] if the
    /// run task panicked.
    pub async fn outcome(self) -> Result<RunSummary, PipelineError> {
        self.task.await?
    }
}

/// Spawns runs against a metadata source and an optional record sink.
#[derive(Debug)]
pub struct Orchestrator<S, K> {
    source: Arc<S>,
    sink: Option<Arc<K>>,
    exporter: ReportExporter,
    sheet_name: String,
    locks: Arc<BatchLocks>,
}

impl<S, K> Orchestrator<S, K> {
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S, K> Clone for Orchestrator<S, K> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            sink: self.sink.clone(),
            exporter: self.exporter.clone(),
            sheet_name: self.sheet_name.clone(),
            locks: Arc::clone(&self.locks),
        }
    }
}

impl<S, K> Orchestrator<S, K>
where
    S: MetadataSource + 'static,
    K: RecordSink + 'static,
{
    #[must_use]
    pub fn new(source: S, sink: Option<K>, report: &ReportConfig) -> Self {
        Self {
            source: Arc::new(source),
            sink: sink.map(Arc::new),
            exporter: ReportExporter::from(report),
            sheet_name: report.sheet_name.clone(),
            locks: Arc::new(BatchLocks::default()),
        }
    }

    /// Start a run on the tokio runtime and return its handle.
    #[must_use]
    pub fn spawn(&self, request: RunRequest) -> RunHandle {
        let (tx, events) = mpsc::channel(EVENT_BUFFER);
        let cancel = CancellationToken::new();
        let run = Run {
            orchestrator: self.clone(),
            events: tx,
            cancel: cancel.clone(),
        };

        let task = tokio::spawn(run.execute(request));

        RunHandle {
            events,
            cancel,
            task,
        }
    }
}

/// State of one spawned run.
struct Run<S, K> {
    orchestrator: Orchestrator<S, K>,
    events: mpsc::Sender<RunEvent>,
    cancel: CancellationToken,
}

impl<S, K> Run<S, K>
where
    S: MetadataSource + 'static,
    K: RecordSink + 'static,
{
    fn progress(&self, stage: Stage, message: impl Into<String>) {
        self.emit(RunEvent::Progress {
            stage,
            message: message.into(),
        });
    }

    fn warn(&self, message: impl Into<String>) {
        self.emit(RunEvent::Warning {
            message: message.into(),
        });
    }

    fn emit(&self, event: RunEvent) {
        if let Err(err) = self.events.try_send(event) {
            tracing::debug!(error = %err, "run event dropped");
        }
    }

    /// Drive `fut` unless the run is cancelled first. Only for steps with no
    /// side effects.
    async fn until_cancelled<F: Future>(&self, fut: F) -> Result<F::Output, PipelineError> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                tracing::info!("run cancelled");
                Err(PipelineError::cancelled())
            }
            out = fut => Ok(out),
        }
    }

    /// Stop between steps, reporting what was committed so far.
    fn checkpoint(&self, summary: &RunSummary) -> Result<(), PipelineError> {
        if !self.cancel.is_cancelled() {
            return Ok(());
        }
        tracing::info!(
            saved = summary.saved.len(),
            exported = summary.exported.len(),
            "run cancelled",
        );
        Err(PipelineError::Cancelled {
            saved: summary.saved.clone(),
            exported: summary.exported.clone(),
        })
    }

    async fn execute(self, request: RunRequest) -> Result<RunSummary, PipelineError> {
        let batches = request.normalized_batches();
        if batches.is_empty() {
            return Err(PipelineError::NoBatches);
        }

        let _guards = self
            .until_cancelled(self.orchestrator.locks.acquire(&batches))
            .await?;
        tracing::info!(batches = ?batches, workbook = %request.workbook.display(), "run started");

        let metadata = self
            .until_cancelled(self.collect_metadata(&batches))
            .await??;

        self.progress(Stage::ParsingWorkbook, "reading raw results workbook");
        let path = request.workbook.clone();
        let sheet = self.orchestrator.sheet_name.clone();
        let parsed = self
            .until_cancelled(tokio::task::spawn_blocking(move || {
                psq_ingest::parse_raw_results(&path, &sheet)
            }))
            .await???;
        if let Some(report) = parsed.error_report() {
            self.warn(report);
        }

        self.progress(Stage::Reconciling, format!("{} row(s)", parsed.rows.len()));
        let reconciled = psq_engine::process(&parsed.rows, &metadata)?;
        for warning in &reconciled.warnings {
            self.warn(warning.to_string());
        }

        let mut summary = RunSummary {
            batches,
            metadata_count: metadata.len(),
            samples: reconciled.samples,
            display_rows: reconciled.display_rows,
            warnings: reconciled.warnings,
            row_errors: parsed.row_errors,
            ..RunSummary::default()
        };

        if request.persist {
            self.checkpoint(&summary)?;
            self.persist(&request, &mut summary).await;
        }
        if request.export {
            self.checkpoint(&summary)?;
            self.export(&request, &mut summary).await?;
        }
        self.checkpoint(&summary)?;

        self.progress(
            Stage::Done,
            format!("{} sample(s) processed", summary.samples.len()),
        );
        tracing::info!(
            samples = summary.samples.len(),
            warnings = summary.warnings.len(),
            saved = summary.saved.len(),
            exported = summary.exported.len(),
            "run finished",
        );
        Ok(summary)
    }

    async fn collect_metadata(
        &self,
        batches: &[String],
    ) -> Result<Vec<SampleMetadata>, PipelineError> {
        let mut metadata = Vec::new();
        for batch in batches {
            self.progress(Stage::FetchingMetadata, format!("querying batch {batch}"));
            let samples = self
                .orchestrator
                .source
                .batch_samples(batch)
                .await
                .map_err(|source| PipelineError::Metadata {
                    batch: batch.clone(),
                    source,
                })?;
            self.progress(
                Stage::FetchingMetadata,
                format!("batch {batch}: {} sample(s)", samples.len()),
            );
            metadata.extend(samples);
        }

        if metadata.is_empty() {
            return Err(PipelineError::NoMetadata {
                batches: batches.to_vec(),
            });
        }
        Ok(metadata)
    }

    async fn persist(&self, request: &RunRequest, summary: &mut RunSummary) {
        let Some(sink) = &self.orchestrator.sink else {
            self.warn("report store is not configured, results were not saved");
            return;
        };

        self.progress(
            Stage::Saving,
            format!("saving {} sample(s)", summary.samples.len()),
        );
        let context = SaveContext {
            client_name: None,
            processed_by: request.processed_by.clone(),
        };
        let cancel = &self.cancel;
        let outcome = psq_store::save_while(sink.as_ref(), &summary.samples, &context, || {
            !cancel.is_cancelled()
        })
        .await;
        for failed in &outcome.failed {
            self.warn(format!("sample {}: not saved: {}", failed.sample_id, failed.error));
        }

        summary.save_failures = outcome
            .failed
            .into_iter()
            .map(|f| StepFailure {
                sample_id: f.sample_id,
                message: f.error.to_string(),
            })
            .collect();
        summary.saved = outcome.saved;
    }

    async fn export(
        &self,
        request: &RunRequest,
        summary: &mut RunSummary,
    ) -> Result<(), PipelineError> {
        let exporter = request.output_dir.as_ref().map_or_else(
            || self.orchestrator.exporter.clone(),
            |dir| ReportExporter::new(dir.clone(), self.orchestrator.sheet_name.clone()),
        );
        let date = request
            .report_date
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        self.progress(
            Stage::Exporting,
            format!("writing reports under {}", exporter.output_dir().display()),
        );

        let samples = summary.samples.clone();
        let cancel = self.cancel.clone();
        let results = tokio::task::spawn_blocking(move || {
            exporter.export_while(&samples, date, || !cancel.is_cancelled())
        })
        .await?;

        for export in results {
            match export.result {
                Ok(path) => summary.exported.push(path),
                Err(err) => {
                    self.warn(format!("sample {}: {err}", export.sample_id));
                    summary.export_failures.push(StepFailure {
                        sample_id: export.sample_id,
                        message: err.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}
