// Page Text Extractor - Raw Fields from Market Page Text
//
// Scans the readable text of a market-overview page for the handful of
// phrasings the major listing sites use ("median sale price ... $612K",
// "homes sell in around 34 days", "$418 per square foot", ...). The first
// matching pattern per metric wins.
//
// Output values are raw strings that keep their unit text ("34 days",
// "$418/sqft", "-2.1%") so normalization and unit checks apply to them
// exactly as to structured fields. Nothing is validated here.

use crate::types::{Metric, RawValue};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use tracing::debug;

struct FieldPattern {
    regex: Regex,
    render: fn(&Captures<'_>) -> Option<String>,
}

impl FieldPattern {
    fn new(pattern: &str, render: fn(&Captures<'_>) -> Option<String>) -> Self {
        Self {
            regex: Regex::new(pattern).expect("field pattern is a valid regex"),
            render,
        }
    }
}

/// Whole number with optional thousands separators; never ends on a comma
const COUNT: &str = r"([0-9](?:[0-9,]*[0-9])?)";
const AMOUNT: &str = r"([0-9](?:[0-9,]*[0-9])?(?:\.[0-9]+)?)";

fn price(c: &Captures<'_>) -> Option<String> {
    let amount = c.get(1)?.as_str();
    let suffix = match c.get(2).map(|m| m.as_str()) {
        Some("m") | Some("million") => "M",
        Some("k") | Some("thousand") => "K",
        _ => "",
    };
    Some(format!("${}{}", amount, suffix))
}

fn signed_change(c: &Captures<'_>) -> Option<String> {
    let sign = if c.get(1)?.as_str() == "down" { "-" } else { "" };
    Some(format!("{}{}%", sign, c.get(2)?.as_str()))
}

fn worded_change(c: &Captures<'_>) -> Option<String> {
    let sign = if c.get(2)?.as_str() == "decrease" { "-" } else { "" };
    Some(format!("{}{}%", sign, c.get(1)?.as_str()))
}

fn percent(c: &Captures<'_>) -> Option<String> {
    Some(format!("{}%", c.get(1)?.as_str()))
}

fn days(c: &Captures<'_>) -> Option<String> {
    Some(format!("{} days", c.get(1)?.as_str()))
}

fn per_sqft(c: &Captures<'_>) -> Option<String> {
    Some(format!("${}/sqft", c.get(1)?.as_str()))
}

fn homes(c: &Captures<'_>) -> Option<String> {
    Some(format!("{} homes", c.get(1)?.as_str()))
}

static PATTERNS: Lazy<Vec<(Metric, Vec<FieldPattern>)>> = Lazy::new(|| {
    let magnitude = r"\s*(million|thousand|m|k)?\b";
    let last_year = r"(?:since|compared to|over|in the) last year";

    vec![
        (
            Metric::MedianPrice,
            vec![
                FieldPattern::new(
                    &format!(r"median (?:sale )?price.*?\${}{}", AMOUNT, magnitude),
                    price,
                ),
                FieldPattern::new(
                    &format!(r"median.*?home value.*?\${}{}", AMOUNT, magnitude),
                    price,
                ),
                FieldPattern::new(
                    &format!(r"average.*?home value.*?\${}{}", AMOUNT, magnitude),
                    price,
                ),
            ],
        ),
        (
            Metric::PriceChange,
            vec![
                FieldPattern::new(
                    &format!(r"(up|down)\s+([0-9]+(?:\.[0-9]+)?)%\s+{}", last_year),
                    signed_change,
                ),
                FieldPattern::new(
                    &format!(
                        r"([0-9]+(?:\.[0-9]+)?)%\s+(increase|decrease)\s+{}",
                        last_year
                    ),
                    worded_change,
                ),
                FieldPattern::new(r"([+-]?[0-9]+(?:\.[0-9]+)?)%\s+1-yr", percent),
            ],
        ),
        (
            Metric::DaysOnMarket,
            vec![
                FieldPattern::new(r"(?:sell|sold) (?:in|after) (?:around )?([0-9]+) days", days),
                FieldPattern::new(
                    r"(?:average|median) (?:of )?([0-9]+) days on (?:the )?market",
                    days,
                ),
                FieldPattern::new(r"([0-9]+) days on (?:the )?market", days),
                FieldPattern::new(r"pending in (?:around )?([0-9]+) days", days),
            ],
        ),
        (
            Metric::PricePerSqft,
            vec![
                FieldPattern::new(
                    &format!(r"\${} per square (?:foot|feet|ft)", AMOUNT),
                    per_sqft,
                ),
                FieldPattern::new(
                    &format!(
                        r"price per (?:square )?(?:foot|feet|ft|sq\.? ?ft).*?\${}",
                        AMOUNT
                    ),
                    per_sqft,
                ),
            ],
        ),
        (
            Metric::InventoryCount,
            vec![
                FieldPattern::new(
                    &format!(r"{} homes? (?:for sale|available|active)", COUNT),
                    homes,
                ),
                FieldPattern::new(&format!(r"inventory of {} homes", COUNT), homes),
                FieldPattern::new(
                    &format!(r"{} propert(?:y|ies) (?:for sale|available|active)", COUNT),
                    homes,
                ),
            ],
        ),
    ]
});

static MARKET_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:seller|buyer)(?:['\x{2019}]s|s)? market\b|\b(?:neutral|balanced) market\b")
        .expect("market type pattern is a valid regex")
});

/// First market condition label in page text, as printed ("seller's market")
pub fn extract_market_type(text: &str) -> Option<String> {
    let lowered = text.to_lowercase();
    let found = MARKET_TYPE.find(&lowered).map(|m| m.as_str().to_string());
    if let Some(label) = &found {
        debug!("Page text: market_type = {:?}", label);
    }
    found
}

/// Extract raw metric fields from page text, keyed by metric name
pub fn extract_fields(text: &str) -> BTreeMap<String, RawValue> {
    let lowered = text.to_lowercase();
    let mut fields = BTreeMap::new();

    for (metric, patterns) in PATTERNS.iter() {
        let found = patterns.iter().find_map(|p| {
            p.regex
                .captures(&lowered)
                .and_then(|c| (p.render)(&c))
        });
        if let Some(raw) = found {
            debug!("Page text: {} = {:?}", metric, raw);
            fields.insert(metric.as_str().to_string(), RawValue::String(raw));
        }
    }

    fields
}
