//! Worksheet layout for a single sample report.

use std::collections::HashMap;

use psq_core::analytes::{self, loq};
use psq_core::{ProcessedAnalyte, ProcessedSample, Verdict};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{ColNum, Format, RowNum, Workbook, Worksheet, XlsxError};

pub const REPORT_SHEET: &str = "Report";

const TABLE_HEADER: [&str; 6] = [
    "Analyte Name",
    "Analyte Amount",
    "LOQ",
    "State Limit",
    "Final Result",
    "Status",
];

const RAW_HEADER: [&str; 4] = ["Sample ID", "Analyte", "Raw Value", "Unit"];

/// One row of the analyte table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLine {
    pub analyte: String,
    pub amount: Decimal,
    pub limit: Option<Decimal>,
    pub final_result: String,
    pub status: &'static str,
}

impl ReportLine {
    fn measured(name: &str, analyte: &ProcessedAnalyte) -> Self {
        Self {
            analyte: name.to_string(),
            amount: analyte.normalized_value,
            limit: analyte.limit,
            final_result: analyte.final_result(),
            status: analyte.verdict.label(),
        }
    }
}

/// Every panel analyte in catalog order, then measured analytes the panel
/// does not list. Unmeasured panel analytes report `ND`.
#[must_use]
pub fn report_lines(sample: &ProcessedSample) -> Vec<ReportLine> {
    let measured: HashMap<String, &ProcessedAnalyte> = sample
        .analytes
        .iter()
        .map(|a| (analytes::lookup_key(&a.analyte_name), a))
        .collect();

    let mut lines: Vec<ReportLine> = analytes::PANEL
        .iter()
        .map(|entry| match measured.get(&analytes::lookup_key(entry.name)) {
            Some(analyte) => ReportLine::measured(entry.name, analyte),
            None => ReportLine {
                analyte: entry.name.to_string(),
                amount: Decimal::ZERO,
                limit: Some(entry.limit_ppm()),
                final_result: "ND".to_string(),
                status: Verdict::Pass.label(),
            },
        })
        .collect();

    lines.extend(
        sample
            .analytes
            .iter()
            .filter(|a| analytes::find(&a.analyte_name).is_none())
            .map(|a| ReportLine::measured(&a.analyte_name, a)),
    );
    lines
}

/// Writes cells while tracking the widest value per column.
struct SheetWriter<'w> {
    sheet: &'w mut Worksheet,
    widths: Vec<usize>,
}

impl<'w> SheetWriter<'w> {
    const fn new(sheet: &'w mut Worksheet) -> Self {
        Self {
            sheet,
            widths: Vec::new(),
        }
    }

    fn track(&mut self, col: ColNum, len: usize) {
        let idx = usize::from(col);
        if self.widths.len() <= idx {
            self.widths.resize(idx + 1, 0);
        }
        self.widths[idx] = self.widths[idx].max(len);
    }

    fn text(&mut self, row: RowNum, col: ColNum, value: &str) -> Result<(), XlsxError> {
        self.track(col, value.chars().count());
        self.sheet.write_string(row, col, value)?;
        Ok(())
    }

    fn bold(&mut self, row: RowNum, col: ColNum, value: &str, bold: &Format) -> Result<(), XlsxError> {
        self.track(col, value.chars().count());
        self.sheet.write_string_with_format(row, col, value, bold)?;
        Ok(())
    }

    fn number(&mut self, row: RowNum, col: ColNum, value: Decimal) -> Result<(), XlsxError> {
        self.track(col, value.normalize().to_string().len());
        self.sheet
            .write_number(row, col, value.to_f64().unwrap_or_default())?;
        Ok(())
    }

    /// Size every column to its widest cell plus two characters.
    fn autofit(self) -> Result<(), XlsxError> {
        for (col, width) in self.widths.iter().enumerate() {
            let col = ColNum::try_from(col).unwrap_or(ColNum::MAX);
            let width = u16::try_from(width + 2).unwrap_or(u16::MAX);
            self.sheet.set_column_width(col, f64::from(width))?;
        }
        Ok(())
    }
}

fn header_block(sample: &ProcessedSample) -> [(&'static str, HeaderValue); 6] {
    let meta = &sample.metadata;
    let grams = meta
        .sample_weight_mg
        .map_or(Decimal::ZERO, |mg| mg / Decimal::ONE_THOUSAND);
    [
        ("Sample Number:", HeaderValue::Text(sample.sample_id.clone())),
        (
            "Sample Name:",
            HeaderValue::Text(meta.sample_name.clone().unwrap_or_default()),
        ),
        (
            "Sample Date:",
            HeaderValue::Text(meta.date_created.clone().unwrap_or_default()),
        ),
        ("Batch Number:", HeaderValue::Text(meta.batch_id.clone())),
        (
            "Dilution Factor:",
            HeaderValue::Number(sample.dilution_factor.unwrap_or_default()),
        ),
        ("Mass (g):", HeaderValue::Number(grams)),
    ]
}

enum HeaderValue {
    Text(String),
    Number(Decimal),
}

fn write_report_sheet(sheet: &mut Worksheet, sample: &ProcessedSample) -> Result<(), XlsxError> {
    let bold = Format::new().set_bold();
    let mut out = SheetWriter::new(sheet);

    let mut row: RowNum = 0;
    for (label, value) in header_block(sample) {
        out.bold(row, 0, label, &bold)?;
        match value {
            HeaderValue::Text(text) => out.text(row, 1, &text)?,
            HeaderValue::Number(number) => out.number(row, 1, number)?,
        }
        row += 1;
    }

    row += 1;
    for (col, title) in (0..).zip(TABLE_HEADER) {
        out.bold(row, col, title, &bold)?;
    }

    for line in report_lines(sample) {
        row += 1;
        out.text(row, 0, &line.analyte)?;
        out.number(row, 1, line.amount)?;
        out.number(row, 2, loq())?;
        match line.limit {
            Some(limit) => out.number(row, 3, limit)?,
            None => out.text(row, 3, "N/A")?,
        }
        out.text(row, 4, &line.final_result)?;
        out.text(row, 5, line.status)?;
    }

    out.autofit()
}

/// Measured values in the same layout the ingestor reads.
fn write_raw_sheet(sheet: &mut Worksheet, sample: &ProcessedSample) -> Result<(), XlsxError> {
    let mut out = SheetWriter::new(sheet);
    for (col, title) in (0..).zip(RAW_HEADER) {
        out.text(0, col, title)?;
    }

    for (row, analyte) in (1..).zip(&sample.analytes) {
        out.text(row, 0, &sample.sample_id)?;
        out.text(row, 1, &analyte.analyte_name)?;
        out.number(row, 2, analyte.normalized_value)?;
        out.text(row, 3, analyte.unit.symbol())?;
    }

    out.autofit()
}

/// Build the full workbook for one sample and return its bytes.
///
/// # Errors
///
/// Returns the writer's error if a sheet name is invalid or serialization fails.
pub fn render(sample: &ProcessedSample, raw_sheet: &str) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();

    let report = workbook.add_worksheet();
    report.set_name(REPORT_SHEET)?;
    write_report_sheet(report, sample)?;

    let raw = workbook.add_worksheet();
    raw.set_name(raw_sheet)?;
    write_raw_sheet(raw, sample)?;

    workbook.save_to_buffer()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use psq_core::{Detection, SampleMetadata, Unit};

    use super::*;

    fn analyte(name: &str, value: &str, verdict: Verdict, limit: Option<&str>) -> ProcessedAnalyte {
        let value: Decimal = value.parse().unwrap();
        ProcessedAnalyte {
            analyte_name: name.into(),
            component: name.into(),
            raw_value: value,
            raw_unit: Unit::Ppm,
            normalized_value: value,
            unit: Unit::Ppm,
            detection: Detection::Detected,
            verdict,
            limit: limit.map(|l| l.parse().unwrap()),
            dilution_recommendation: None,
        }
    }

    fn sample(analytes: Vec<ProcessedAnalyte>) -> ProcessedSample {
        ProcessedSample {
            sample_id: "A07".into(),
            metadata: SampleMetadata {
                sample_id: "A07".into(),
                qbench_id: "a07".into(),
                external_id: None,
                batch_id: "B-1001".into(),
                sample_name: None,
                matrix_type: None,
                state: None,
                date_created: None,
                sample_weight_mg: None,
            },
            dilution_factor: None,
            analytes,
        }
    }

    #[test]
    fn full_panel_with_unlisted_analytes_last() {
        let sample = sample(vec![
            analyte("Caffeine", "3.2", Verdict::NoLimit, None),
            analyte("naled", "0.9", Verdict::Fail, Some("0.5")),
        ]);

        let lines = report_lines(&sample);

        assert_eq!(lines.len(), analytes::PANEL.len() + 1);
        assert_eq!(lines[0].analyte, analytes::PANEL[0].name);
        assert_eq!(lines[0].final_result, "ND");
        assert_eq!(lines[0].status, "Pass");

        let naled = lines.iter().find(|l| l.analyte == "Naled").unwrap();
        assert_eq!(naled.final_result, "0.9");
        assert_eq!(naled.status, "Fail");

        let last = lines.last().unwrap();
        assert_eq!(last.analyte, "Caffeine");
        assert_eq!(last.limit, None);
        assert_eq!(last.status, "-");
    }

    #[test]
    fn group_marker_matches_measured_analyte() {
        let sample = sample(vec![analyte("Pyrethrins", "0.35", Verdict::Pass, Some("1"))]);
        let lines = report_lines(&sample);

        assert_eq!(lines.len(), analytes::PANEL.len());
        let pyrethrins = lines.iter().find(|l| l.analyte == "Pyrethrins*").unwrap();
        assert_eq!(pyrethrins.amount, Decimal::new(35, 2));
    }

    #[test]
    fn render_produces_xlsx_bytes() {
        let bytes = render(&sample(Vec::new()), "raw results").unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn render_rejects_invalid_sheet_name() {
        assert!(render(&sample(Vec::new()), "bad/name").is_err());
    }
}
