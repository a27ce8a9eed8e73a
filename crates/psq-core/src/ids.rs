//! Identifier normalization shared by the ingestor, the API client, and the engine.
//!
//! Sample identifiers arrive in different shapes depending on the source: the
//! spreadsheet may hold `7`, `7.0`, or `A-07`, while QBench hands back `"007"`
//! or `"a07"`. Everything is joined on the output of [`normalize_sample_id`].

/// Canonicalize a sample identifier for joining across data sources.
///
/// - surrounding whitespace is ignored
/// - integral numbers lose leading zeros and a zero fraction (`"007"`, `"7.0"` → `"7"`)
/// - anything else is uppercased with whitespace, `-` and `_` removed (`"a-07"` → `"A07"`)
/// - if only digits remain after that, leading zeros are dropped
#[must_use]
pub fn normalize_sample_id(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    if let Some(integral) = integral_text(trimmed) {
        return integral;
    }

    let compact: String = trimmed
        .chars()
        .filter(|ch| !ch.is_whitespace() && !matches!(ch, '-' | '_'))
        .flat_map(char::to_uppercase)
        .collect();

    if !compact.is_empty() && compact.bytes().all(|b| b.is_ascii_digit()) {
        return strip_leading_zeros(&compact);
    }

    compact
}

/// Canonical analyte name for a spreadsheet component label.
///
/// Instruments suffix duplicated transitions with a single-digit index
/// (`"Bifenazate 1"`). Multi-digit suffixes are part of the name (`"MGK 264"`).
#[must_use]
pub fn canonical_analyte_name(component: &str) -> String {
    let trimmed = component.trim();
    let mut chars = trimmed.chars().rev();
    if let (Some(last), Some(before)) = (chars.next(), chars.next())
        && last.is_ascii_digit()
        && last != '0'
        && before.is_whitespace()
    {
        return trimmed[..trimmed.len() - 1].trim_end().to_string();
    }
    trimmed.to_string()
}

/// `"0012"`, `"12.0"`, `"12."` → `Some("12")`. `None` for anything non-integral.
fn integral_text(value: &str) -> Option<String> {
    let (int_part, frac_part) = match value.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (value, None),
    };

    if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if let Some(frac) = frac_part
        && !frac.bytes().all(|b| b == b'0')
    {
        return None;
    }

    Some(strip_leading_zeros(int_part))
}

fn strip_leading_zeros(digits: &str) -> String {
    let stripped = digits.trim_start_matches('0');
    if stripped.is_empty() {
        "0".to_string()
    } else {
        stripped.to_string()
    }
}
