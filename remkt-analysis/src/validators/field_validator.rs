// Field Validator - Per-Field Plausibility Checks
//
// One verdict per (source, metric) value, checked in order:
//   non_numeric  - NaN or infinite
//   stale_unit   - text advertised a unit the metric cannot be in
//   wrong_sign   - negative where the metric cannot be negative
//   out_of_range - outside the tier-scaled inclusive bounds
//
// Rejection is per field: the source's other metrics are still validated.
// Missing values never reach the validator.

use crate::config::AnalysisConfig;
use crate::types::{
    Bounds, MarketTier, Metric, NormalizedObservation, NormalizedValue, RejectReason,
    ValidationOutcome, ValidationResult,
};
use std::collections::BTreeMap;
use tracing::debug;

/// Validator bound to a single tier for the whole run
pub struct FieldValidator {
    tier: MarketTier,
    bounds: BTreeMap<Metric, Bounds>,
}

impl FieldValidator {
    pub fn new(config: &AnalysisConfig, tier: MarketTier) -> Self {
        let bounds = Metric::ALL
            .iter()
            .map(|&m| (m, config.bounds_for(m, tier)))
            .collect();
        Self { tier, bounds }
    }

    pub fn tier(&self) -> MarketTier {
        self.tier
    }

    /// Effective bounds used for every decision
    pub fn bounds(&self) -> &BTreeMap<Metric, Bounds> {
        &self.bounds
    }

    pub fn validate(&self, source: &str, metric: Metric, value: &NormalizedValue) -> ValidationResult {
        let outcome = match self.check(metric, value) {
            None => ValidationOutcome::Accepted,
            Some(reason) => ValidationOutcome::Rejected { reason },
        };

        debug!(
            "{}.{} = {} under {} tier: {:?}",
            source, metric, value.value, self.tier, outcome
        );

        ValidationResult {
            source: source.to_string(),
            metric,
            value: value.value,
            outcome,
        }
    }

    /// Validate every present value of one source
    pub fn validate_observation(&self, observation: &NormalizedObservation) -> Vec<ValidationResult> {
        observation
            .values
            .iter()
            .filter_map(|(metric, value)| {
                value
                    .as_ref()
                    .map(|v| self.validate(&observation.source, *metric, v))
            })
            .collect()
    }

    fn check(&self, metric: Metric, value: &NormalizedValue) -> Option<RejectReason> {
        if !value.value.is_finite() {
            return Some(RejectReason::NonNumeric);
        }
        if let Some(unit) = value.unit_hint {
            if !metric.accepts_unit(unit) {
                return Some(RejectReason::StaleUnit);
            }
        }
        if value.value < 0.0 && !metric.allows_negative() {
            return Some(RejectReason::WrongSign);
        }
        let bounds = self.bounds.get(&metric)?;
        if !bounds.contains(value.value) {
            return Some(RejectReason::OutOfRange);
        }
        None
    }
}
