// Aggregator - Median Consensus per Metric
//
// Consensus value is the median of the kept values (two middle values
// averaged for even counts). An empty kept set yields no metric at all:
// absence is reported, never a zero.

use crate::fusion::median;
use crate::types::{AggregatedMetric, Confidence, MarketTier, OutlierBasis, OutlierReport};
use tracing::debug;

#[derive(Debug, Default)]
pub struct Aggregator;

impl Aggregator {
    pub fn new() -> Self {
        Self
    }

    /// Aggregate the kept subset of one metric's sample
    pub fn aggregate(&self, report: &OutlierReport, tier: MarketTier) -> Option<AggregatedMetric> {
        let values: Vec<f64> = report.kept.iter().map(|v| v.value).collect();
        let value = median(&values)?;
        let contributing_sources: Vec<String> =
            report.kept.iter().map(|v| v.source.clone()).collect();
        let count = contributing_sources.len();

        let (confidence, confidence_note) = assess(report, count);

        debug!(
            "{} = {} from {} source(s) [{}]",
            report.metric,
            value,
            count,
            contributing_sources.join(", ")
        );

        Some(AggregatedMetric {
            value,
            unit: report.metric.unit(),
            contributing_source_count: count,
            contributing_sources,
            tier_used: tier,
            confidence,
            confidence_note,
        })
    }
}

fn assess(report: &OutlierReport, count: usize) -> (Confidence, String) {
    match &report.basis {
        OutlierBasis::InsufficientSample { minimum, .. } => (
            Confidence::Low,
            format!(
                "insufficient sample: {} source(s), {} needed for outlier screening",
                count, minimum
            ),
        ),
        OutlierBasis::FilterWouldEmpty { .. } => (
            Confidence::Low,
            format!("{} sources disagree widely; outlier filter not applied", count),
        ),
        OutlierBasis::ZeroDeviation { .. } => {
            (Confidence::High, format!("{} sources agree", count))
        }
        OutlierBasis::MedianAbsoluteDeviation { .. } => {
            let note = match report.outliers.len() {
                0 => format!("{} sources, no outliers", count),
                n => format!("{} sources, {} outlier(s) excluded", count, n),
            };
            (Confidence::High, note)
        }
    }
}
