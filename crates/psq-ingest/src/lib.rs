//! # psq-ingest
//!
//! Reads the instrument's raw-results worksheet into [`RawResultRow`]s.
//!
//! The first row of the sheet's used range is the header. Required columns
//! are `Sample ID`, `Analyte`, `Raw Value` and `Unit`; `Dilution Factor` and
//! `Include` are optional. Header matching ignores case and surrounding
//! whitespace. Rows that fail to parse are reported with their worksheet row
//! number and the rest of the sheet is still read.

mod cells;
mod error;

use std::path::Path;

use calamine::{Data, Range, Reader, open_workbook_auto};
use psq_core::{RawResultRow, Unit, canonical_analyte_name, normalize_sample_id};

pub use error::{IngestError, RowParseError};

use crate::cells::{cell_decimal, cell_text, is_included};

pub const SAMPLE_ID: &str = "Sample ID";
pub const ANALYTE: &str = "Analyte";
pub const RAW_VALUE: &str = "Raw Value";
pub const UNIT: &str = "Unit";
pub const DILUTION_FACTOR: &str = "Dilution Factor";
pub const INCLUDE: &str = "Include";

/// Rows parsed from a worksheet along with the rows that were rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSheet {
    pub rows: Vec<RawResultRow>,
    pub row_errors: Vec<RowParseError>,
}

impl ParsedSheet {
    /// All row errors as one report, one line per row. `None` if there were none.
    #[must_use]
    pub fn error_report(&self) -> Option<String> {
        if self.row_errors.is_empty() {
            return None;
        }
        let lines: Vec<String> = self.row_errors.iter().map(ToString::to_string).collect();
        Some(format!(
            "{} row(s) could not be parsed:\n{}",
            self.row_errors.len(),
            lines.join("\n")
        ))
    }
}

/// Parse the raw-results sheet of the workbook at `path`.
///
/// # Errors
///
/// Returns [`IngestError::NotFound`] if the file does not exist,
/// [`IngestError::Workbook`] if it cannot be opened,
/// [`IngestError::MissingSheet`] if no sheet matches `sheet_name`, and
/// [`IngestError::MissingColumns`] naming every absent required header.
pub fn parse_raw_results(path: &Path, sheet_name: &str) -> Result<ParsedSheet, IngestError> {
    if !path.exists() {
        return Err(IngestError::NotFound(path.to_path_buf()));
    }

    let workbook_error = |e: calamine::Error| IngestError::Workbook {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    let mut workbook = open_workbook_auto(path).map_err(workbook_error)?;

    let wanted = sheet_name.trim().to_lowercase();
    let available = workbook.sheet_names().to_vec();
    let Some(sheet) = available
        .iter()
        .find(|name| name.trim().to_lowercase() == wanted)
        .cloned()
    else {
        return Err(IngestError::MissingSheet {
            sheet: sheet_name.trim().to_string(),
            available,
        });
    };

    let range = workbook.worksheet_range(&sheet).map_err(workbook_error)?;
    let parsed = parse_range(&range)?;

    tracing::info!(
        path = %path.display(),
        sheet = %sheet,
        rows = parsed.rows.len(),
        row_errors = parsed.row_errors.len(),
        "parsed raw results",
    );
    Ok(parsed)
}

/// Column positions resolved from the header row.
#[derive(Debug)]
struct Columns {
    sample_id: usize,
    analyte: usize,
    raw_value: usize,
    unit: usize,
    dilution_factor: Option<usize>,
    include: Option<usize>,
}

impl Columns {
    fn resolve(header: &[Data]) -> Result<Self, IngestError> {
        let position = |label: &str| {
            header.iter().position(|cell| {
                cell_text(cell).is_some_and(|text| text.eq_ignore_ascii_case(label))
            })
        };

        let required = [SAMPLE_ID, ANALYTE, RAW_VALUE, UNIT].map(|label| (label, position(label)));
        let missing: Vec<String> = required
            .iter()
            .filter(|(_, pos)| pos.is_none())
            .map(|(label, _)| (*label).to_string())
            .collect();

        match required {
            [(_, Some(sample_id)), (_, Some(analyte)), (_, Some(raw_value)), (_, Some(unit))] => {
                Ok(Self {
                    sample_id,
                    analyte,
                    raw_value,
                    unit,
                    dilution_factor: position(DILUTION_FACTOR),
                    include: position(INCLUDE),
                })
            }
            _ => Err(IngestError::MissingColumns { columns: missing }),
        }
    }
}

/// Parse an already-loaded worksheet range.
///
/// # Errors
///
/// Returns [`IngestError::MissingColumns`] if the header row lacks a required
/// column (an empty range lacks all of them).
pub fn parse_range(range: &Range<Data>) -> Result<ParsedSheet, IngestError> {
    let mut rows = range.rows();
    let header = rows.next().unwrap_or_default();
    let columns = Columns::resolve(header)?;

    // Worksheet row of the header, 1-based.
    let header_row = range.start().map_or(1, |(row, _)| row + 1);

    let mut parsed = ParsedSheet::default();
    for (offset, cells) in (1_u32..).zip(rows) {
        let row = header_row + offset;
        if let Some(result) = parse_row(row, cells, &columns) {
            match result {
                Ok(raw) => parsed.rows.push(raw),
                Err(errors) => parsed.row_errors.extend(errors),
            }
        }
    }

    for error in &parsed.row_errors {
        tracing::warn!(row = error.row, column = %error.column, "{}", error.message);
    }
    Ok(parsed)
}

/// `None` for rows that are skipped without complaint.
fn parse_row(
    row: u32,
    cells: &[Data],
    columns: &Columns,
) -> Option<Result<RawResultRow, Vec<RowParseError>>> {
    let cell = |idx: usize| cells.get(idx).unwrap_or(&Data::Empty);

    if let Some(include) = columns.include
        && !is_included(cell(include))
    {
        return None;
    }

    let sample_id = cell_text(cell(columns.sample_id))?;
    let component = cell_text(cell(columns.analyte))?;

    let mut errors = Vec::new();
    let mut reject = |column: &str, message: String| {
        errors.push(RowParseError {
            row,
            column: column.to_string(),
            message,
        });
    };

    let raw_value = match cell_decimal(cell(columns.raw_value)) {
        Ok(Some(value)) => Some(value),
        Ok(None) => return None,
        Err(message) => {
            reject(RAW_VALUE, message);
            None
        }
    };

    let unit = match cell_text(cell(columns.unit)).map(|text| text.parse::<Unit>()) {
        Some(Ok(unit)) => Some(unit),
        Some(Err(e)) => {
            reject(UNIT, e.to_string());
            None
        }
        None => {
            reject(UNIT, "unit is blank".into());
            None
        }
    };

    let dilution_factor = match columns.dilution_factor.map(|idx| cell_decimal(cell(idx))) {
        None | Some(Ok(None)) => None,
        Some(Ok(Some(value))) if value.is_sign_positive() && !value.is_zero() => Some(value),
        Some(Ok(Some(value))) => {
            reject(DILUTION_FACTOR, format!("dilution factor must be positive, got {value}"));
            None
        }
        Some(Err(message)) => {
            reject(DILUTION_FACTOR, message);
            None
        }
    };

    match (raw_value, unit) {
        (Some(raw_value), Some(unit)) if errors.is_empty() => Some(Ok(RawResultRow {
            row,
            sample_key: normalize_sample_id(&sample_id),
            sample_id,
            analyte_name: canonical_analyte_name(&component),
            component,
            raw_value,
            unit,
            dilution_factor,
        })),
        _ => Some(Err(errors)),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    use super::*;

    fn text(s: &str) -> Data {
        Data::String(s.into())
    }

    fn sheet(rows: &[Vec<Data>]) -> Range<Data> {
        let width = rows.iter().map(Vec::len).max().unwrap_or(1);
        let height = rows.len();
        let mut range = Range::new(
            (0, 0),
            (u32::try_from(height).unwrap() - 1, u32::try_from(width).unwrap() - 1),
        );
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                range.set_value(
                    (u32::try_from(r).unwrap(), u32::try_from(c).unwrap()),
                    value.clone(),
                );
            }
        }
        range
    }

    fn header() -> Vec<Data> {
        vec![text("Sample ID"), text("Analyte"), text("Raw Value"), text("Unit")]
    }

    #[test]
    fn parses_rows_with_canonical_names() {
        let range = sheet(&[
            header(),
            vec![text("A-07"), text("Pyrethrins 1"), Data::Float(2.35), text("ppm")],
            vec![Data::Float(481.0), text("Bifenazate"), Data::Int(12), text("ppb")],
        ]);

        let parsed = parse_range(&range).unwrap();
        assert!(parsed.row_errors.is_empty());
        assert_eq!(parsed.rows.len(), 2);

        let first = &parsed.rows[0];
        assert_eq!(first.row, 2);
        assert_eq!(first.sample_id, "A-07");
        assert_eq!(first.sample_key, "A07");
        assert_eq!(first.analyte_name, "Pyrethrins");
        assert_eq!(first.component, "Pyrethrins 1");
        assert_eq!(first.raw_value, Decimal::new(235, 2));
        assert_eq!(first.unit, Unit::Ppm);

        let second = &parsed.rows[1];
        assert_eq!(second.sample_id, "481");
        assert_eq!(second.raw_value, Decimal::from(12));
        assert_eq!(second.unit, Unit::Ppb);
    }

    #[test]
    fn headers_match_case_insensitively_in_any_order() {
        let range = sheet(&[
            vec![text(" unit "), text("RAW VALUE"), text("analyte"), text("sample id")],
            vec![text("ppm"), Data::Float(0.5), text("Naled"), text("S1")],
        ]);
        let parsed = parse_range(&range).unwrap();
        assert_eq!(parsed.rows[0].analyte_name, "Naled");
        assert_eq!(parsed.rows[0].sample_key, "S1");
    }

    #[test]
    fn missing_columns_are_all_named() {
        let range = sheet(&[vec![text("Sample ID"), text("Analyte")]]);
        let err = parse_range(&range).unwrap_err();
        match err {
            IngestError::MissingColumns { columns } => {
                assert_eq!(columns, vec!["Raw Value", "Unit"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_sheet_misses_every_column() {
        let err = parse_range(&Range::empty()).unwrap_err();
        assert!(matches!(err, IngestError::MissingColumns { columns } if columns.len() == 4));
    }

    #[test]
    fn bad_rows_are_collected_and_parsing_continues() {
        let range = sheet(&[
            header(),
            vec![text("S1"), text("Naled"), text("<LOQ"), text("ppm")],
            vec![text("S2"), text("Naled"), Data::Float(0.2), text("furlongs")],
            vec![text("S3"), text("Naled"), Data::Float(0.3), text("ppm")],
        ]);

        let parsed = parse_range(&range).unwrap();
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].sample_id, "S3");
        assert_eq!(parsed.row_errors.len(), 2);
        assert_eq!(parsed.row_errors[0].row, 2);
        assert_eq!(parsed.row_errors[0].column, "Raw Value");
        assert_eq!(parsed.row_errors[1].row, 3);
        assert_eq!(parsed.row_errors[1].column, "Unit");

        let report = parsed.error_report().unwrap();
        assert!(report.starts_with("2 row(s) could not be parsed"));
        assert!(report.contains("row 3, Unit: Unknown concentration unit: 'furlongs'"));
    }

    #[test]
    fn blank_rows_are_skipped_silently() {
        let range = sheet(&[
            header(),
            vec![Data::Empty, text("Naled"), Data::Float(0.2), text("ppm")],
            vec![text("S1"), text("  "), Data::Float(0.2), text("ppm")],
            vec![text("S1"), text("Naled"), Data::Empty, text("ppm")],
        ]);
        let parsed = parse_range(&range).unwrap();
        assert!(parsed.rows.is_empty());
        assert!(parsed.row_errors.is_empty());
    }

    #[test]
    fn optional_columns_filter_and_carry_dilution() {
        let range = sheet(&[
            vec![
                text("Sample ID"),
                text("Analyte"),
                text("Raw Value"),
                text("Unit"),
                text("Dilution Factor"),
                text("Include"),
            ],
            vec![text("S1"), text("Naled"), Data::Float(250.0), text("ng/mL"), Data::Int(5), text("yes")],
            vec![text("S1"), text("Abamectin"), Data::Float(1.0), text("ppm"), Data::Empty, text("NO")],
            vec![text("S2"), text("Naled"), Data::Float(1.0), text("ppm"), Data::Float(0.0), text("Y")],
        ]);

        let parsed = parse_range(&range).unwrap();
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].dilution_factor, Some(Decimal::from(5)));
        assert_eq!(parsed.rows[0].unit, Unit::NgPerMl);
        assert_eq!(parsed.row_errors.len(), 1);
        assert_eq!(parsed.row_errors[0].column, "Dilution Factor");
    }

    #[test]
    fn row_numbers_follow_range_offset() {
        let mut range = Range::new((3, 0), (4, 3));
        for (c, value) in header().into_iter().enumerate() {
            range.set_value((3, u32::try_from(c).unwrap()), value);
        }
        range.set_value((4, 0), text("S1"));
        range.set_value((4, 1), text("Naled"));
        range.set_value((4, 2), text("oops"));
        range.set_value((4, 3), text("ppm"));

        let parsed = parse_range(&range).unwrap();
        assert_eq!(parsed.row_errors[0].row, 5);
    }
}
