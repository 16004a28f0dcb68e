// Field Normalizer - Raw Values to Typed Numbers
//
// Accepts whatever extraction captured: plain numbers, currency strings
// ("$1,250,000"), abbreviated magnitudes ("1.2M", "450K"), ranges
// ("400K-500K", "30 to 45 days") and unit-suffixed text ("$450/sqft",
// "-2.5%", "6 weeks").
//
// Policy:
// - Currency symbols, thousands separators and whitespace are stripped.
// - K/thousand (x1e3) and M/mil/million (x1e6) expand case-insensitively.
//   Scaling is done on the decimal text so "$1.2M" is exactly 1_200_000.0.
// - A range yields the arithmetic mean of its bounds. When only the upper
//   bound carries a suffix the lower bound inherits it ("400-500K").
// - Weeks and months convert to days (x7, x30).
// - Unparseable or empty input is an error value, never a panic; JSON null
//   means the source did not report the field.

use crate::types::{
    AnalysisIssue, Metric, NormalizedObservation, NormalizedValue, RawObservation, RawValue, Unit,
};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Why a raw value could not be normalized
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("empty value")]
    Empty,

    #[error("unsupported value type: {0}")]
    UnsupportedType(&'static str),

    #[error("unparseable value {0:?}")]
    Unparseable(String),
}

/// Symbols dropped before parsing; any of them marks the value as money
const CURRENCY_SYMBOLS: [char; 4] = ['$', '\u{20ac}', '\u{a3}', '\u{a5}'];

/// Magnitude words and letters with their power of ten, longest first
const MAGNITUDES: &[(&str, i32)] = &[
    ("thousand", 3),
    ("million", 6),
    ("mil", 6),
    ("m", 6),
    ("k", 3),
];

/// Unit suffixes, longest first so "/sqft" wins over "sqft" and "days" over "day"
const UNIT_SUFFIXES: &[(&str, Unit, f64)] = &[
    ("per square foot", Unit::DollarsPerSqft, 1.0),
    ("per square feet", Unit::DollarsPerSqft, 1.0),
    ("per sq ft", Unit::DollarsPerSqft, 1.0),
    ("per sqft", Unit::DollarsPerSqft, 1.0),
    ("/sq ft", Unit::DollarsPerSqft, 1.0),
    ("/sqft", Unit::DollarsPerSqft, 1.0),
    ("square feet", Unit::SquareFeet, 1.0),
    ("sq ft", Unit::SquareFeet, 1.0),
    ("sqft", Unit::SquareFeet, 1.0),
    ("months", Unit::Days, 30.0),
    ("month", Unit::Days, 30.0),
    ("weeks", Unit::Days, 7.0),
    ("week", Unit::Days, 7.0),
    ("days", Unit::Days, 1.0),
    ("day", Unit::Days, 1.0),
    ("properties", Unit::Count, 1.0),
    ("property", Unit::Count, 1.0),
    ("listings", Unit::Count, 1.0),
    ("listing", Unit::Count, 1.0),
    ("homes", Unit::Count, 1.0),
    ("home", Unit::Count, 1.0),
    ("%", Unit::Percent, 1.0),
];

/// Normalize a raw value to a plain number, `None` when absent or unparseable
pub fn normalize_value(raw: &RawValue) -> Option<f64> {
    normalize_field(raw).ok().flatten().map(|v| v.value)
}

/// Normalize a raw value, keeping the unit its text advertised
///
/// `Ok(None)` means the value is JSON null (not reported).
pub fn normalize_field(raw: &RawValue) -> Result<Option<NormalizedValue>, NormalizeError> {
    match raw {
        RawValue::Null => Ok(None),
        RawValue::Number(n) => n
            .as_f64()
            .map(|v| Some(NormalizedValue::plain(v)))
            .ok_or_else(|| NormalizeError::Unparseable(n.to_string())),
        RawValue::String(s) => parse_text(s).map(Some),
        RawValue::Bool(_) => Err(NormalizeError::UnsupportedType("boolean")),
        RawValue::Array(_) => Err(NormalizeError::UnsupportedType("array")),
        RawValue::Object(_) => Err(NormalizeError::UnsupportedType("object")),
    }
}

/// Parse one textual value
pub fn parse_text(text: &str) -> Result<NormalizedValue, NormalizeError> {
    let lowered = text.trim().to_lowercase();
    if lowered.is_empty() {
        return Err(NormalizeError::Empty);
    }

    let (uncoded, has_code) = strip_currency_code(&lowered);
    let (body, mut unit_hint, factor) = strip_unit_suffix(uncoded);
    if unit_hint.is_none() && (has_code || body.contains(&CURRENCY_SYMBOLS[..])) {
        unit_hint = Some(Unit::Dollars);
    }

    let unified = body.replace(" to ", "-").replace(['\u{2013}', '\u{2014}'], "-");
    let compact: String = unified
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && !CURRENCY_SYMBOLS.contains(c))
        .collect();
    if compact.is_empty() {
        return Err(NormalizeError::Unparseable(text.to_string()));
    }

    let unparseable = || NormalizeError::Unparseable(text.to_string());
    let value = match split_range(&compact) {
        Some((low, high)) => {
            let (high_value, high_exponent) = parse_magnitude(high, None).ok_or_else(unparseable)?;
            let (low_value, _) = parse_magnitude(low, high_exponent).ok_or_else(unparseable)?;
            (low_value + high_value) / 2.0
        }
        None => parse_magnitude(&compact, None).ok_or_else(unparseable)?.0,
    };

    Ok(NormalizedValue {
        value: value * factor,
        unit_hint,
    })
}

/// Normalize every field of one source
///
/// Unknown field names, duplicate aliases and unparseable values are returned
/// as normalization misses; the rest of the source is unaffected.
pub fn normalize_observation(raw: &RawObservation) -> (NormalizedObservation, Vec<AnalysisIssue>) {
    let mut values: BTreeMap<Metric, Option<NormalizedValue>> = BTreeMap::new();
    let mut issues = Vec::new();

    for (field, raw_value) in &raw.fields {
        let Some(metric) = Metric::from_field_name(field) else {
            issues.push(miss(&raw.source, field, "unknown field".to_string()));
            continue;
        };

        if matches!(values.get(&metric), Some(Some(_))) {
            if !raw_value.is_null() {
                issues.push(miss(
                    &raw.source,
                    field,
                    format!("duplicate value for {}; first one kept", metric),
                ));
            }
            continue;
        }

        match normalize_field(raw_value) {
            Ok(Some(value)) => {
                debug!(
                    "{}.{} -> {} = {} ({:?})",
                    raw.source, field, metric, value.value, value.unit_hint
                );
                values.insert(metric, Some(value));
            }
            Ok(None) => {
                debug!("{}.{} is null; treated as not reported", raw.source, field);
            }
            Err(e) => {
                issues.push(miss(&raw.source, field, e.to_string()));
                values.insert(metric, None);
            }
        }
    }

    (
        NormalizedObservation {
            source: raw.source.clone(),
            values,
        },
        issues,
    )
}

fn miss(source: &str, field: &str, detail: String) -> AnalysisIssue {
    warn!("Normalization miss for {}.{}: {}", source, field, detail);
    AnalysisIssue::NormalizationMiss {
        source_id: source.to_string(),
        field: field.to_string(),
        detail,
    }
}

/// Strip an ISO "usd" code written before or after the amount
fn strip_currency_code(text: &str) -> (&str, bool) {
    if let Some(rest) = text.strip_prefix("usd") {
        return (rest.trim_start(), true);
    }
    if let Some(rest) = text.strip_suffix("usd") {
        return (rest.trim_end(), true);
    }
    (text, false)
}

fn strip_unit_suffix(text: &str) -> (&str, Option<Unit>, f64) {
    for (suffix, unit, factor) in UNIT_SUFFIXES {
        if let Some(rest) = text.strip_suffix(suffix) {
            return (rest.trim_end(), Some(*unit), *factor);
        }
    }
    (text, None, 1.0)
}

/// Split "a-b" on the first dash that is not a leading sign
fn split_range(compact: &str) -> Option<(&str, &str)> {
    let idx = compact
        .char_indices()
        .skip(1)
        .find(|&(_, c)| c == '-')
        .map(|(i, _)| i)?;
    Some((&compact[..idx], &compact[idx + 1..]))
}

/// Parse "[+-]digits[.digits][magnitude]"
///
/// Returns the value and the power of ten that was applied. `inherit`
/// supplies the power when the text carries no magnitude of its own.
fn parse_magnitude(text: &str, inherit: Option<i32>) -> Option<(f64, Option<i32>)> {
    let text = text.strip_prefix('+').unwrap_or(text);
    let (mantissa, exponent) = MAGNITUDES
        .iter()
        .find_map(|(word, exp)| text.strip_suffix(word).map(|rest| (rest, Some(*exp))))
        .unwrap_or((text, inherit));

    let digits = mantissa.strip_prefix('-').unwrap_or(mantissa);
    let digit_count = digits.chars().filter(|c| c.is_ascii_digit()).count();
    let dot_count = digits.chars().filter(|&c| c == '.').count();
    if digit_count == 0 || dot_count > 1 || digit_count + dot_count != digits.len() {
        return None;
    }

    let value: f64 = format!("{}e{}", mantissa, exponent.unwrap_or(0)).parse().ok()?;
    Some((value, exponent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn value_of(text: &str) -> f64 {
        parse_text(text).unwrap().value
    }

    #[test]
    fn test_currency_with_separators() {
        assert_eq!(value_of("$1,250,000"), 1_250_000.0);
        assert_eq!(value_of(" $ 650,500 "), 650_500.0);
    }

    #[test]
    fn test_other_currency_symbols_and_codes() {
        assert_eq!(value_of("\u{a3}600,000"), 600_000.0);
        assert_eq!(value_of("\u{20ac}450K"), 450_000.0);
        assert_eq!(value_of("\u{a5}1,250,000"), 1_250_000.0);
        assert_eq!(value_of("USD 615,000"), 615_000.0);
        assert_eq!(value_of("615000 usd"), 615_000.0);
        assert_eq!(parse_text("\u{a3}600,000").unwrap().unit_hint, Some(Unit::Dollars));
        assert_eq!(parse_text("USD 615,000").unwrap().unit_hint, Some(Unit::Dollars));
    }

    #[test]
    fn test_magnitude_words() {
        assert_eq!(value_of("$1.2 million"), 1_200_000.0);
        assert_eq!(value_of("$1.35 Million"), 1_350_000.0);
        assert_eq!(value_of("2.5 mil"), 2_500_000.0);
        assert_eq!(value_of("$450 thousand"), 450_000.0);
        assert_eq!(value_of("1.5-2 million"), 1_750_000.0);
        assert_eq!(parse_text("$1.2 million").unwrap().unit_hint, Some(Unit::Dollars));
    }

    #[test]
    fn test_magnitude_suffixes_exact() {
        assert_eq!(value_of("$1.2M"), 1_200_000.0);
        assert_eq!(value_of("450K"), 450_000.0);
        assert_eq!(value_of("$2.3m"), 2_300_000.0);
        assert_eq!(value_of("$612.5k"), 612_500.0);
    }

    #[test]
    fn test_range_uses_mean() {
        assert_eq!(value_of("400K-500K"), 450_000.0);
        assert_eq!(value_of("$400K - $500K"), 450_000.0);
        assert_eq!(value_of("400-500K"), 450_000.0);
        assert_eq!(value_of("30 to 45 days"), 37.5);
    }

    #[test]
    fn test_negative_values_are_not_ranges() {
        assert_eq!(value_of("-5"), -5.0);
        assert_eq!(value_of("-2.5%"), -2.5);
        assert_eq!(value_of("+3.1%"), 3.1);
    }

    #[test]
    fn test_unit_hints() {
        assert_eq!(parse_text("$450/sqft").unwrap().unit_hint, Some(Unit::DollarsPerSqft));
        assert_eq!(parse_text("$450 per square foot").unwrap().value, 450.0);
        assert_eq!(parse_text("3.5%").unwrap().unit_hint, Some(Unit::Percent));
        assert_eq!(parse_text("$600K").unwrap().unit_hint, Some(Unit::Dollars));
        assert_eq!(parse_text("1,850 sq ft").unwrap().unit_hint, Some(Unit::SquareFeet));
        assert_eq!(parse_text("1,204 homes").unwrap().value, 1204.0);
        assert_eq!(parse_text("42").unwrap().unit_hint, None);
    }

    #[test]
    fn test_weeks_and_months_become_days() {
        let weeks = parse_text("6 weeks").unwrap();
        assert_eq!(weeks.value, 42.0);
        assert_eq!(weeks.unit_hint, Some(Unit::Days));
        assert_eq!(value_of("2 months"), 60.0);
    }

    #[test]
    fn test_unparseable_inputs() {
        assert_eq!(parse_text("   "), Err(NormalizeError::Empty));
        assert!(matches!(parse_text("n/a"), Err(NormalizeError::Unparseable(_))));
        assert!(matches!(parse_text("inf"), Err(NormalizeError::Unparseable(_))));
        assert!(matches!(parse_text("NaN"), Err(NormalizeError::Unparseable(_))));
        assert!(matches!(parse_text("1.2.3"), Err(NormalizeError::Unparseable(_))));
        assert!(matches!(parse_text("$"), Err(NormalizeError::Unparseable(_))));
        assert!(matches!(parse_text("1e9"), Err(NormalizeError::Unparseable(_))));
    }

    #[test]
    fn test_json_shapes() {
        assert_eq!(normalize_value(&json!(615000)), Some(615_000.0));
        assert_eq!(normalize_value(&json!(null)), None);
        assert_eq!(normalize_field(&json!(null)), Ok(None));
        assert_eq!(
            normalize_field(&json!(true)),
            Err(NormalizeError::UnsupportedType("boolean"))
        );
        assert!(normalize_field(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_idempotent_on_normalized_numbers() {
        for raw in ["$1.2M", "450K", "$1,250,000", "400K-500K", "-2.5%"] {
            let first = normalize_value(&json!(raw)).unwrap();
            let second = normalize_value(&json!(first)).unwrap();
            assert_eq!(first, second, "normalizing {} twice changed it", raw);
            assert_eq!(normalize_value(&json!(second)), Some(second));
        }
    }

    #[test]
    fn test_observation_records_misses_per_field() {
        let raw = RawObservation::new("zillow")
            .with_field("median_price", json!("$610K"))
            .with_field("days_on_market", json!("soon"))
            .with_field("school_rating", json!(9))
            .with_field("inventory", json!(null));

        let (normalized, issues) = normalize_observation(&raw);

        assert_eq!(normalized.get(Metric::MedianPrice).unwrap().value, 610_000.0);
        assert_eq!(normalized.values.get(&Metric::DaysOnMarket), Some(&None));
        assert!(!normalized.values.contains_key(&Metric::InventoryCount));
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| matches!(i, AnalysisIssue::NormalizationMiss { .. })));
    }

    #[test]
    fn test_duplicate_alias_keeps_first() {
        // BTreeMap order: "home_value" < "median_price"
        let raw = RawObservation::new("redfin")
            .with_field("home_value", json!(500_000))
            .with_field("median_price", json!(520_000));

        let (normalized, issues) = normalize_observation(&raw);
        assert_eq!(normalized.get(Metric::MedianPrice).unwrap().value, 500_000.0);
        assert_eq!(issues.len(), 1);
    }
}
