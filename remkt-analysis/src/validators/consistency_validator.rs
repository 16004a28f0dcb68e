// Consistency Validator - Cross-Metric Sanity Check
//
// median_price should be roughly price_per_sqft x median_sqft. A larger gap
// than the tolerance produces a warning; no data is rejected.

use crate::config::ConsistencyConfig;
use crate::types::{AnalysisIssue, MarketMetrics, Metric};
use tracing::{debug, warn};

pub struct ConsistencyValidator {
    /// Allowed relative divergence, as a fraction of the reported median price
    tolerance: f64,
}

impl Default for ConsistencyValidator {
    fn default() -> Self {
        Self::new(&ConsistencyConfig::default())
    }
}

impl ConsistencyValidator {
    pub fn new(config: &ConsistencyConfig) -> Self {
        Self {
            tolerance: config.tolerance,
        }
    }

    /// Compare aggregated price metrics; `None` when consistent or not checkable
    pub fn check(&self, metrics: &MarketMetrics) -> Option<AnalysisIssue> {
        let reported = metrics.value(Metric::MedianPrice)?;
        let per_sqft = metrics.value(Metric::PricePerSqft)?;
        let sqft = metrics.value(Metric::MedianSqft)?;
        if reported <= 0.0 {
            return None;
        }

        let implied = per_sqft * sqft;
        let divergence = (implied - reported).abs() / reported;
        debug!(
            "Consistency: implied ${:.0} vs reported ${:.0} (divergence {:.3})",
            implied, reported, divergence
        );

        if divergence <= self.tolerance {
            return None;
        }

        warn!(
            "median_price ${:.0} diverges {:.1}% from price_per_sqft x median_sqft ${:.0}",
            reported,
            divergence * 100.0,
            implied
        );
        Some(AnalysisIssue::ConsistencyWarning {
            implied_median_price: implied,
            reported_median_price: reported,
            divergence,
            tolerance: self.tolerance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AggregatedMetric, Confidence, MarketTier};

    fn metrics(values: &[(Metric, f64)]) -> MarketMetrics {
        let mut out = MarketMetrics::default();
        for &(metric, value) in values {
            out.insert(
                metric,
                AggregatedMetric {
                    value,
                    unit: metric.unit(),
                    contributing_source_count: 1,
                    contributing_sources: vec!["zillow".to_string()],
                    tier_used: MarketTier::Standard,
                    confidence: Confidence::Low,
                    confidence_note: String::new(),
                },
            );
        }
        out
    }

    #[test]
    fn test_consistent_metrics_pass() {
        let m = metrics(&[
            (Metric::MedianPrice, 600_000.0),
            (Metric::PricePerSqft, 320.0),
            (Metric::MedianSqft, 1_900.0),
        ]);
        assert!(ConsistencyValidator::default().check(&m).is_none());
    }

    #[test]
    fn test_divergent_metrics_warn() {
        let m = metrics(&[
            (Metric::MedianPrice, 600_000.0),
            (Metric::PricePerSqft, 150.0),
            (Metric::MedianSqft, 1_800.0),
        ]);
        let issue = ConsistencyValidator::default().check(&m).unwrap();
        match issue {
            AnalysisIssue::ConsistencyWarning {
                implied_median_price,
                divergence,
                ..
            } => {
                assert_eq!(implied_median_price, 270_000.0);
                assert!((divergence - 0.55).abs() < 1e-9);
            }
            other => panic!("unexpected issue {:?}", other),
        }
    }

    #[test]
    fn test_missing_metric_skips_check() {
        let m = metrics(&[
            (Metric::MedianPrice, 600_000.0),
            (Metric::PricePerSqft, 10.0),
        ]);
        assert!(ConsistencyValidator::default().check(&m).is_none());
    }
}
