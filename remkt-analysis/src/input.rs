//! Inbound payload parsing
//!
//! The extraction collaborator hands over one JSON object keyed by source:
//!
//! ```json
//! {
//!   "zillow":  { "median_price": "$612K", "days_on_market": 31,
//!                "url": "https://www.zillow.com/home-values/..." },
//!   "redfin":  { "text": "... median sale price of $598K ...",
//!                "metadata": { "canonicalUrl": "...", "loadedTime": "2024-03-02T10:00:00Z" } }
//! }
//! ```
//!
//! Besides metric fields a source may carry provenance keys (`url`,
//! `canonical_url`, `loaded_url`, `source_date`, `loaded_time`, or the
//! crawler's `metadata` object), a `market_type` label and the page `text`,
//! which is mined for any metric or label the source did not report as a
//! structured field.

use crate::extractors::{extract_fields, extract_market_type};
use crate::types::{Metric, RawObservation, RawValue};
use remkt_common::{Error, Result};
use serde_json::Map;
use std::collections::BTreeSet;
use tracing::debug;

const URL_KEYS: &[&str] = &["url", "canonical_url", "canonicalUrl", "loaded_url", "loadedUrl"];
const DATE_KEYS: &[&str] = &["source_date", "loaded_time", "loadedTime"];
const MARKET_TYPE_KEYS: &[&str] = &["market_type", "market_condition"];
const IGNORED_KEYS: &[&str] = &["markdown", "html", "title"];
const TEXT_KEY: &str = "text";
const METADATA_KEY: &str = "metadata";

/// Parse the inbound JSON text
pub fn parse_market_input_str(json: &str) -> Result<Vec<RawObservation>> {
    let value: RawValue = serde_json::from_str(json)?;
    parse_market_input(&value)
}

/// Turn `{ source: { field: value } }` into one observation per source
///
/// Sources come out ordered by name. An empty object yields no observations.
pub fn parse_market_input(value: &RawValue) -> Result<Vec<RawObservation>> {
    let sources = value.as_object().ok_or_else(|| {
        Error::InvalidInput(format!(
            "expected an object keyed by source, got {}",
            json_type(value)
        ))
    })?;

    let mut observations = Vec::with_capacity(sources.len());
    for (source, entry) in sources {
        let fields = entry.as_object().ok_or_else(|| {
            Error::InvalidInput(format!(
                "source {:?} must be an object of fields, got {}",
                source,
                json_type(entry)
            ))
        })?;
        observations.push(parse_source(source, fields));
    }

    debug!("Parsed {} source(s) from input", observations.len());
    Ok(observations)
}

fn parse_source(source: &str, entry: &Map<String, RawValue>) -> RawObservation {
    let mut observation = RawObservation::new(source);
    let metadata = entry.get(METADATA_KEY).and_then(|m| m.as_object());

    observation.url = first_string(entry, URL_KEYS).or_else(|| metadata.and_then(|m| first_string(m, URL_KEYS)));
    observation.source_date =
        first_string(entry, DATE_KEYS).or_else(|| metadata.and_then(|m| first_string(m, DATE_KEYS)));
    observation.market_type = first_string(entry, MARKET_TYPE_KEYS);

    for (key, value) in entry {
        let reserved = key == TEXT_KEY
            || key == METADATA_KEY
            || URL_KEYS.contains(&key.as_str())
            || DATE_KEYS.contains(&key.as_str())
            || MARKET_TYPE_KEYS.contains(&key.as_str())
            || IGNORED_KEYS.contains(&key.as_str());
        if !reserved {
            observation.fields.insert(key.clone(), value.clone());
        }
    }

    if let Some(text) = entry.get(TEXT_KEY).and_then(|t| t.as_str()) {
        if observation.market_type.is_none() {
            observation.market_type = extract_market_type(text);
        }

        let reported: BTreeSet<Metric> = observation
            .fields
            .keys()
            .filter_map(|k| Metric::from_field_name(k))
            .collect();

        for (name, value) in extract_fields(text) {
            let already = Metric::from_field_name(&name).is_some_and(|m| reported.contains(&m));
            if !already {
                debug!("{}: {} taken from page text", source, name);
                observation.fields.insert(name, value);
            }
        }
    }

    observation
}

fn first_string(map: &Map<String, RawValue>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| map.get(*k).and_then(|v| v.as_str()))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn json_type(value: &RawValue) -> &'static str {
    match value {
        RawValue::Null => "null",
        RawValue::Bool(_) => "boolean",
        RawValue::Number(_) => "number",
        RawValue::String(_) => "string",
        RawValue::Array(_) => "array",
        RawValue::Object(_) => "object",
    }
}
