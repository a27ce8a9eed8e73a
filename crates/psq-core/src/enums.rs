//! Concentration units, detection state, and pass/fail verdicts.
//!
//! All enums use `snake_case` serialization.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::CoreError;

// ---------------------------------------------------------------------------
// Unit
// ---------------------------------------------------------------------------

/// Concentration unit attached to a raw or normalized value.
///
/// `Ppm`, `Ppb` and `Percent` are mass fractions of the sample itself.
/// `NgPerMl` is a concentration in the prepared extract and only becomes a
/// sample concentration once sample mass and dilution are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Ppm,
    Ppb,
    Percent,
    NgPerMl,
}

impl Unit {
    /// Label used in spreadsheets and reports.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Ppm => "ppm",
            Self::Ppb => "ppb",
            Self::Percent => "%",
            Self::NgPerMl => "ng/mL",
        }
    }

    /// Decimal places values in this unit are reported with.
    #[must_use]
    pub const fn decimal_places(self) -> u32 {
        match self {
            Self::Ppm => 3,
            Self::Ppb | Self::NgPerMl => 1,
            Self::Percent => 4,
        }
    }

    /// Whether converting to ppm needs the sample mass.
    #[must_use]
    pub const fn is_extract_concentration(self) -> bool {
        matches!(self, Self::NgPerMl)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Unit {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .trim()
            .chars()
            .filter(|ch| !ch.is_whitespace())
            .map(|ch| if matches!(ch, 'µ' | 'μ') { 'u' } else { ch })
            .collect::<String>()
            .to_ascii_lowercase()
            .replace("mcg", "ug");

        match folded.as_str() {
            "ppm" | "mg/kg" | "ug/g" => Ok(Self::Ppm),
            "ppb" | "ug/kg" | "ng/g" => Ok(Self::Ppb),
            "%" | "percent" => Ok(Self::Percent),
            "ng/ml" => Ok(Self::NgPerMl),
            _ => Err(CoreError::UnknownUnit(s.trim().to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// Whether a normalized value reached the limit of quantitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Detection {
    Detected,
    NotDetected,
}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

/// Pass/fail determination against the state action limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
    /// The analyte has no entry in the limit catalog.
    NoLimit,
}

impl Verdict {
    /// Label used in reports (`Pass`, `Fail`, `-`).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pass => "Pass",
            Self::Fail => "Fail",
            Self::NoLimit => "-",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("ppm", Unit::Ppm)]
    #[case(" PPM ", Unit::Ppm)]
    #[case("mg/kg", Unit::Ppm)]
    #[case("µg/g", Unit::Ppm)]
    #[case("mcg/g", Unit::Ppm)]
    #[case("ppb", Unit::Ppb)]
    #[case("ng/g", Unit::Ppb)]
    #[case("%", Unit::Percent)]
    #[case("ng/mL", Unit::NgPerMl)]
    fn parses_unit_aliases(#[case] raw: &str, #[case] expected: Unit) {
        assert_eq!(raw.parse::<Unit>(), Ok(expected));
    }

    #[test]
    fn rejects_unknown_unit() {
        let err = "furlongs".parse::<Unit>().unwrap_err();
        assert_eq!(err, CoreError::UnknownUnit("furlongs".into()));
    }

    #[test]
    fn unit_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Unit::NgPerMl).unwrap(), r#""ng_per_ml""#);
        assert_eq!(serde_json::to_string(&Verdict::NoLimit).unwrap(), r#""no_limit""#);
    }

    #[test]
    fn verdict_labels() {
        assert_eq!(Verdict::Pass.to_string(), "Pass");
        assert_eq!(Verdict::Fail.to_string(), "Fail");
        assert_eq!(Verdict::NoLimit.to_string(), "-");
    }
}
