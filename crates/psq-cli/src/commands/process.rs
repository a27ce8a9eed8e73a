use anyhow::Context;
use psq_config::PsqConfig;
use psq_engine::DisplayRow;
use psq_pipeline::{Orchestrator, PipelineError, RunEvent, RunRequest, RunSummary};
use psq_qbench::QBenchClient;
use psq_store::SupabaseStore;
use serde::Serialize;

use crate::cli::{GlobalFlags, OutputFormat, ProcessArgs};
use crate::output::{output, render};
use crate::progress::Progress;

/// Serializable view of a finished run.
#[derive(Debug, Serialize)]
struct ProcessReport {
    batches: Vec<String>,
    metadata_count: usize,
    sample_count: usize,
    results: Vec<DisplayRow>,
    warnings: Vec<String>,
    row_errors: Vec<String>,
    saved: Vec<String>,
    save_failures: Vec<String>,
    exported: Vec<String>,
    export_failures: Vec<String>,
}

impl From<RunSummary> for ProcessReport {
    fn from(summary: RunSummary) -> Self {
        Self {
            batches: summary.batches,
            metadata_count: summary.metadata_count,
            sample_count: summary.samples.len(),
            results: summary.display_rows,
            warnings: summary.warnings.iter().map(ToString::to_string).collect(),
            row_errors: summary.row_errors.iter().map(ToString::to_string).collect(),
            saved: summary.saved,
            save_failures: summary
                .save_failures
                .into_iter()
                .map(|f| format!("{}: {}", f.sample_id, f.message))
                .collect(),
            exported: summary
                .exported
                .iter()
                .map(|path| path.display().to_string())
                .collect(),
            export_failures: summary
                .export_failures
                .into_iter()
                .map(|f| format!("{}: {}", f.sample_id, f.message))
                .collect(),
        }
    }
}

impl ProcessReport {
    fn footer(&self) -> String {
        format!(
            "{} sample(s) from {} batch(es), {} warning(s), {} row error(s), {} saved, {} exported",
            self.sample_count,
            self.batches.len(),
            self.warnings.len(),
            self.row_errors.len(),
            self.saved.len(),
            self.exported.len(),
        )
    }
}

fn run_request(args: ProcessArgs) -> RunRequest {
    let mut request = RunRequest::new(args.batches, args.workbook);
    request.output_dir = args.output;
    request.persist = !args.no_save;
    request.export = !args.no_export;
    request.processed_by = args.processed_by;
    request
}

/// Handle `psq process`. Ctrl-C cancels the run.
pub async fn handle(args: ProcessArgs, config: &PsqConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    let client = QBenchClient::new(&config.qbench).context("QBench client unavailable")?;
    let store = if !args.no_save && config.supabase.is_configured() {
        Some(SupabaseStore::new(&config.supabase).context("report store unavailable")?)
    } else {
        None
    };

    let orchestrator = Orchestrator::new(client, store, &config.report);
    let mut handle = orchestrator.spawn(run_request(args));
    let progress = Progress::spinner("starting run");

    loop {
        tokio::select! {
            event = handle.events.recv() => match event {
                Some(RunEvent::Progress { stage, message }) => {
                    progress.set_message(&format!("{stage}: {message}"));
                }
                Some(RunEvent::Warning { message }) => {
                    if !flags.quiet {
                        progress.note(&format!("warning: {message}"));
                    }
                }
                None => break,
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                progress.set_message("cancelling");
                handle.cancel();
            }
        }
    }

    let summary = match handle.outcome().await {
        Ok(summary) => summary,
        Err(PipelineError::Cancelled { saved, exported }) => {
            progress.finish_err("cancelled");
            for path in &exported {
                progress.note(&format!("written before cancel: {}", path.display()));
            }
            anyhow::bail!(
                "run cancelled after saving {} sample(s) [{}] and writing {} report(s)",
                saved.len(),
                saved.join(", "),
                exported.len()
            );
        }
        Err(error) => {
            progress.finish_err("run failed");
            return Err(error.into());
        }
    };
    progress.finish_ok(&format!("{} sample(s) processed", summary.samples.len()));

    let report = ProcessReport::from(summary);
    match flags.format {
        OutputFormat::Table => {
            println!("{}", render(&report.results, OutputFormat::Table)?);
            if !flags.quiet {
                println!("\n{}", report.footer());
                for path in &report.exported {
                    println!("  {path}");
                }
            }
            Ok(())
        }
        format => output(&report, format),
    }
}
