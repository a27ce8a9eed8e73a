//! # psq-report
//!
//! Writes one formatted `.xlsx` report per processed sample.
//!
//! Reports land in a date-stamped folder:
//! `<output_dir>/<YYYYMMDD>/<YYYYMMDD>_<sample>_PSQuants.xlsx`. Each workbook is
//! rendered in memory, written to a temp file beside its destination and
//! renamed into place, so a failed export never leaves a truncated file.

mod error;
mod sheet;

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use psq_config::ReportConfig;
use psq_core::ProcessedSample;

pub use error::ExportError;
pub use sheet::{REPORT_SHEET, ReportLine, report_lines};

/// File name stem used when a sample id has no usable characters.
const FALLBACK_ID: &str = "NoSampleNum";

/// Result of exporting one sample as part of a batch.
#[derive(Debug)]
pub struct SampleExport {
    pub sample_id: String,
    pub result: Result<PathBuf, ExportError>,
}

/// Sample id reduced to characters safe in a file name.
#[must_use]
pub fn safe_sample_id(sample_id: &str) -> String {
    let safe: String = sample_id
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '_' | '-'))
        .collect();
    if safe.is_empty() {
        FALLBACK_ID.to_string()
    } else {
        safe
    }
}

/// Where the report for `sample_id` exported on `date` is written.
#[must_use]
pub fn report_path(output_dir: &Path, sample_id: &str, date: NaiveDate) -> PathBuf {
    let stamp = date.format("%Y%m%d").to_string();
    let file = format!("{stamp}_{}_PSQuants.xlsx", safe_sample_id(sample_id));
    output_dir.join(&stamp).join(file)
}

/// Exports processed samples as xlsx reports.
#[derive(Debug, Clone)]
pub struct ReportExporter {
    output_dir: PathBuf,
    raw_sheet: String,
}

impl ReportExporter {
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>, raw_sheet: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            raw_sheet: raw_sheet.into(),
        }
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write the report for one sample and return its path.
    ///
    /// An existing report for the same sample and date is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Write`] if the folder cannot be created, the
    /// workbook cannot be rendered, or the file cannot be written or renamed.
    pub fn export(&self, sample: &ProcessedSample, date: NaiveDate) -> Result<PathBuf, ExportError> {
        let path = report_path(&self.output_dir, &sample.sample_id, date);
        let dir = path.parent().unwrap_or(&self.output_dir);
        std::fs::create_dir_all(dir).map_err(|e| ExportError::write(dir, e))?;

        let bytes = sheet::render(sample, &self.raw_sheet).map_err(|e| ExportError::write(&path, e))?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".psq-")
            .suffix(".xlsx.tmp")
            .tempfile_in(dir)
            .map_err(|e| ExportError::write(&path, e))?;
        tmp.write_all(&bytes)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| ExportError::write(&path, e))?;
        tmp.persist(&path)
            .map_err(|e| ExportError::write(&path, e.error))?;

        tracing::debug!(sample = %sample.sample_id, path = %path.display(), "report written");
        Ok(path)
    }

    /// Export every sample. One failure does not stop the rest.
    #[must_use]
    pub fn export_all(&self, samples: &[ProcessedSample], date: NaiveDate) -> Vec<SampleExport> {
        self.export_while(samples, date, || true)
    }

    /// Like [`Self::export_all`], but checks `keep_going` before each sample
    /// and stops at the first `false`. Samples not reached have no entry.
    pub fn export_while(
        &self,
        samples: &[ProcessedSample],
        date: NaiveDate,
        keep_going: impl Fn() -> bool,
    ) -> Vec<SampleExport> {
        let mut results = Vec::with_capacity(samples.len());
        for sample in samples {
            if !keep_going() {
                tracing::info!(
                    remaining = samples.len() - results.len(),
                    "report export stopped",
                );
                break;
            }
            let result = self.export(sample, date);
            if let Err(err) = &result {
                tracing::warn!(sample = %sample.sample_id, error = %err, "report export failed");
            }
            results.push(SampleExport {
                sample_id: sample.sample_id.clone(),
                result,
            });
        }

        let written = results.iter().filter(|r| r.result.is_ok()).count();
        tracing::info!(
            written,
            failed = results.len() - written,
            dir = %self.output_dir.display(),
            "exported reports",
        );
        results
    }
}

impl From<&ReportConfig> for ReportExporter {
    fn from(config: &ReportConfig) -> Self {
        Self::new(config.output_dir.clone(), config.sheet_name.clone())
    }
}
