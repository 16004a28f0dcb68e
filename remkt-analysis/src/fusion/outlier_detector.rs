// Outlier Detector - Median Absolute Deviation Filter
//
// For one metric's accepted values across sources:
// 1. Fewer than `min_sample` values: keep all (insufficient sample)
// 2. Compute median and MAD
// 3. MAD (near) zero: keep all
// 4. Flag values whose distance from the median exceeds
//    mad_threshold x mad_scale x MAD
// 5. If that would flag every value, keep all instead
//
// MAD is used rather than mean/stddev so a single wild value cannot inflate
// the dispersion estimate that is supposed to catch it.

use crate::config::OutlierConfig;
use crate::fusion::median;
use crate::types::{MetricSample, OutlierBasis, OutlierReport, SourcedValue};
use tracing::{debug, info, warn};

/// Relative MAD below which values count as identical
const ZERO_MAD_EPSILON: f64 = 1e-9;

pub struct OutlierDetector {
    mad_threshold: f64,
    mad_scale: f64,
    min_sample: usize,
}

impl Default for OutlierDetector {
    fn default() -> Self {
        Self::new(&OutlierConfig::default())
    }
}

impl OutlierDetector {
    pub fn new(config: &OutlierConfig) -> Self {
        Self {
            mad_threshold: config.mad_threshold,
            mad_scale: config.mad_scale,
            min_sample: config.min_sample,
        }
    }

    pub fn detect(&self, sample: MetricSample) -> OutlierReport {
        let metric = sample.metric;
        let count = sample.len();

        if count < self.min_sample {
            debug!(
                "{}: {} value(s) < {}; outlier detection skipped",
                metric, count, self.min_sample
            );
            return OutlierReport {
                metric,
                kept: sample.values,
                outliers: vec![],
                basis: OutlierBasis::InsufficientSample {
                    count,
                    minimum: self.min_sample,
                },
            };
        }

        let values = sample.raw_values();
        let Some(center) = median(&values) else {
            let basis = OutlierBasis::InsufficientSample {
                count,
                minimum: self.min_sample,
            };
            return keep_all(sample, basis);
        };
        let deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
        let mad = median(&deviations).unwrap_or(0.0);

        if mad <= ZERO_MAD_EPSILON * center.abs().max(1.0) {
            debug!("{}: zero MAD around median {}; nothing flagged", metric, center);
            return keep_all(sample, OutlierBasis::ZeroDeviation { median: center });
        }

        let cutoff = self.mad_threshold * self.mad_scale * mad;
        let (kept, outliers): (Vec<SourcedValue>, Vec<SourcedValue>) = sample
            .values
            .iter()
            .cloned()
            .partition(|v| (v.value - center).abs() <= cutoff);

        if kept.is_empty() {
            warn!(
                "{}: outlier filter would drop all {} values; keeping all",
                metric, count
            );
            return keep_all(
                sample,
                OutlierBasis::FilterWouldEmpty {
                    median: center,
                    mad,
                    cutoff,
                },
            );
        }

        if !outliers.is_empty() {
            info!(
                "{}: {} outlier(s) excluded (median {}, MAD {}, max deviation {})",
                metric,
                outliers.len(),
                center,
                mad,
                cutoff
            );
        }

        OutlierReport {
            metric,
            kept,
            outliers,
            basis: OutlierBasis::MedianAbsoluteDeviation {
                median: center,
                mad,
                cutoff,
            },
        }
    }
}

fn keep_all(sample: MetricSample, basis: OutlierBasis) -> OutlierReport {
    OutlierReport {
        metric: sample.metric,
        kept: sample.values,
        outliers: vec![],
        basis,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Metric;

    fn sample(values: &[f64]) -> MetricSample {
        MetricSample::new(
            Metric::PricePerSqft,
            values
                .iter()
                .enumerate()
                .map(|(i, v)| SourcedValue::new(format!("source{}", i), *v))
                .collect(),
        )
    }

    #[test]
    fn test_flags_single_wild_value() {
        let report = OutlierDetector::default().detect(sample(&[100.0, 102.0, 98.0, 101.0, 5_000.0]));

        assert_eq!(report.outliers.len(), 1);
        assert_eq!(report.outliers[0].value, 5_000.0);
        assert_eq!(report.kept.len(), 4);
        assert!(matches!(
            report.basis,
            OutlierBasis::MedianAbsoluteDeviation { median, mad, .. } if median == 101.0 && mad == 1.0
        ));
    }

    #[test]
    fn test_identical_values_never_flagged() {
        let report = OutlierDetector::default().detect(sample(&[100.0, 100.0, 100.0]));
        assert!(report.outliers.is_empty());
        assert_eq!(report.kept.len(), 3);
        assert_eq!(report.basis, OutlierBasis::ZeroDeviation { median: 100.0 });
    }

    #[test]
    fn test_zero_mad_with_one_distinct_value_keeps_all() {
        let report = OutlierDetector::default().detect(sample(&[100.0, 100.0, 100.0, 900.0]));
        assert!(report.outliers.is_empty());
        assert!(matches!(report.basis, OutlierBasis::ZeroDeviation { .. }));
    }

    #[test]
    fn test_small_sample_skipped() {
        let report = OutlierDetector::default().detect(sample(&[100.0, 5_000.0]));
        assert!(report.outliers.is_empty());
        assert_eq!(report.kept.len(), 2);
        assert_eq!(
            report.basis,
            OutlierBasis::InsufficientSample { count: 2, minimum: 3 }
        );
    }

    #[test]
    fn test_consistent_spread_kept() {
        let report = OutlierDetector::default().detect(sample(&[600_000.0, 620_000.0, 610_000.0]));
        assert!(report.outliers.is_empty());
    }

    #[test]
    fn test_cheap_listing_flagged_among_three() {
        let report = OutlierDetector::default().detect(sample(&[600_000.0, 620_000.0, 50_000.0]));
        assert_eq!(report.outliers.len(), 1);
        assert_eq!(report.outliers[0].value, 50_000.0);
        let kept: Vec<&str> = report.kept.iter().map(|v| v.source.as_str()).collect();
        assert_eq!(kept, vec!["source0", "source1"]);
    }

    #[test]
    fn test_never_empties_sample() {
        // An even-length sample has no value at the median itself; a cutoff
        // that underflows to zero flags every value.
        let detector = OutlierDetector::new(&OutlierConfig {
            mad_threshold: f64::MIN_POSITIVE,
            mad_scale: f64::MIN_POSITIVE,
            min_sample: 3,
        });
        let report = detector.detect(sample(&[1.0, 2.0, 4.0, 8.0]));
        assert_eq!(report.kept.len(), 4);
        assert!(report.outliers.is_empty());
        assert!(matches!(report.basis, OutlierBasis::FilterWouldEmpty { .. }));
    }
}
