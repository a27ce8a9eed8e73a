//! Cell value conversion.

use std::str::FromStr;

use calamine::Data;
use rust_decimal::Decimal;

/// Cell content as trimmed text. `None` for empty or blank cells.
///
/// Numbers use their shortest round-trip form, so a sample id typed as `481`
/// and stored as `481.0` comes back as `"481"`.
pub fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty => return None,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::Error(e) => e.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

/// Cell content as an exact decimal. `Ok(None)` for empty cells.
///
/// # Errors
///
/// Returns a message describing the cell when it holds something other than
/// a finite number.
pub fn cell_decimal(cell: &Data) -> Result<Option<Decimal>, String> {
    match cell {
        Data::Empty => Ok(None),
        Data::Int(i) => Ok(Some(Decimal::from(*i))),
        Data::Float(f) if f.is_finite() => Decimal::from_str(&f.to_string())
            .map(Some)
            .map_err(|e| format!("{f} is out of range: {e}")),
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            Decimal::from_str(trimmed)
                .or_else(|_| Decimal::from_scientific(trimmed))
                .map(Some)
                .map_err(|_| format!("'{trimmed}' is not a number"))
        }
        Data::Error(e) => Err(format!("cell holds the error {e}")),
        other => Err(format!("expected a number, found {other}")),
    }
}

/// Whether an `Include` cell marks the row for reporting.
pub fn is_included(cell: &Data) -> bool {
    cell_text(cell).is_some_and(|text| {
        matches!(text.to_ascii_uppercase().as_str(), "YES" | "Y" | "TRUE" | "1")
    })
}
