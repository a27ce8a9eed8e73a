//! Unit normalization, rounding, and verdicts.

use psq_core::analytes::{self, loq};
use psq_core::{Detection, ProcessedAnalyte, RawResultRow, Unit, Verdict};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Unit every result is reported in.
pub const REPORT_UNIT: Unit = Unit::Ppm;

/// Extract concentrations above this are re-injected at a higher dilution.
const DILUTION_CEILING: u32 = 200;

/// Why a row could not be turned into a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalcError {
    /// `ng/mL` with no usable sample mass.
    InvalidMass,
    /// The converted value does not fit a `Decimal`.
    OutOfRange,
}

/// Convert a raw value to ppm.
///
/// `ng/mL` is an extract concentration: it becomes a sample concentration
/// through `value × dilution ÷ mass_mg`, with dilution defaulting to 1.
///
/// # Errors
///
/// Returns [`CalcError::InvalidMass`] for an extract concentration when the
/// mass is missing or not positive, and [`CalcError::OutOfRange`] when the
/// conversion overflows.
pub fn to_ppm(
    value: Decimal,
    unit: Unit,
    dilution_factor: Option<Decimal>,
    mass_mg: Option<Decimal>,
) -> Result<Decimal, CalcError> {
    let converted = match unit {
        Unit::Ppm => Some(value),
        Unit::Ppb => value.checked_div(Decimal::ONE_THOUSAND),
        Unit::Percent => value.checked_mul(Decimal::from(10_000)),
        Unit::NgPerMl => {
            let mass = mass_mg
                .filter(|m| m.is_sign_positive() && !m.is_zero())
                .ok_or(CalcError::InvalidMass)?;
            let dilution = dilution_factor.unwrap_or(Decimal::ONE);
            value
                .checked_mul(dilution)
                .and_then(|scaled| scaled.checked_div(mass))
        }
    };
    converted.ok_or(CalcError::OutOfRange)
}

/// Round half away from zero to the unit's reporting precision, keeping
/// trailing zeros so every value carries the same scale.
#[must_use]
pub fn round_for(value: Decimal, unit: Unit) -> Decimal {
    let places = unit.decimal_places();
    let mut rounded = value.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(places);
    rounded
}

/// `ceil(amount / 200)` for extract concentrations above 200.
#[must_use]
pub fn dilution_recommendation(value: Decimal, unit: Unit) -> Option<u32> {
    let ceiling = Decimal::from(DILUTION_CEILING);
    if !unit.is_extract_concentration() || value <= ceiling {
        return None;
    }
    (value / ceiling).ceil().to_u32()
}

/// Detection state and verdict for a value already in ppm.
#[must_use]
pub fn judge(analyte: &str, ppm: Decimal) -> (Detection, Verdict, Option<Decimal>) {
    let limit = analytes::find(analyte).map(analytes::AnalyteLimit::limit_ppm);
    // Not detected passes whether or not the analyte is on the panel.
    if ppm < loq() {
        return (Detection::NotDetected, Verdict::Pass, limit);
    }
    let verdict = match limit {
        Some(limit) if ppm > limit => Verdict::Fail,
        Some(_) => Verdict::Pass,
        None => Verdict::NoLimit,
    };
    (Detection::Detected, verdict, limit)
}

/// Full calculation for one sheet row.
///
/// # Errors
///
/// Propagates [`CalcError`] from [`to_ppm`].
pub fn process_row(
    row: &RawResultRow,
    sample_dilution: Option<Decimal>,
    mass_mg: Option<Decimal>,
) -> Result<ProcessedAnalyte, CalcError> {
    let dilution = row.dilution_factor.or(sample_dilution);
    let ppm = round_for(to_ppm(row.raw_value, row.unit, dilution, mass_mg)?, REPORT_UNIT);
    let (detection, verdict, limit) = judge(&row.analyte_name, ppm);

    Ok(ProcessedAnalyte {
        analyte_name: row.analyte_name.clone(),
        component: row.component.clone(),
        raw_value: row.raw_value,
        raw_unit: row.unit,
        normalized_value: ppm,
        unit: REPORT_UNIT,
        detection,
        verdict,
        limit,
        dilution_recommendation: dilution_recommendation(row.raw_value, row.unit),
    })
}
