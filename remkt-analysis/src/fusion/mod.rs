// Cross-Source Fusion - Outlier Filtering and Consensus
//
// Outlier Detector → Aggregator, applied independently per metric.

pub mod aggregator;
pub mod outlier_detector;

pub use aggregator::Aggregator;
pub use outlier_detector::OutlierDetector;

use std::cmp::Ordering;

/// Median of `values`, averaging the two middle values for even lengths
///
/// NaN is ordered as equal so it never panics; callers validate first.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}
