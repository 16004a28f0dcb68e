// Market Analysis Pipeline
//
// Coordinates the per-run stages over every source's observation:
// 1. Normalize raw fields into typed values (per source)
// 2. Classify the market tier from median-price signals
// 3. Validate every present value against tier-scaled bounds
// 4. Build one sample per metric and screen it for outliers
// 5. Aggregate the kept values into the metrics record
// 6. Cross-check price metrics for internal consistency
//
// No stage aborts the run. Anything dropped along the way is recorded as
// an AnalysisIssue next to the best-effort result.

use crate::config::AnalysisConfig;
use crate::fusion::{Aggregator, OutlierDetector};
use crate::normalizer::normalize_observation;
use crate::types::{
    AnalysisIssue, MarketAnalysis, MarketMetrics, MarketType, Metric, MetricSample,
    NormalizedObservation, OutlierBasis, RawObservation, SourceInfo, SourcedValue,
    ValidationResult,
};
use crate::validators::{median_price_signals, ConsistencyValidator, FieldValidator, TierClassifier};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Runs the analysis stages with one fixed configuration
pub struct MarketAnalyzer {
    config: AnalysisConfig,
}

impl Default for MarketAnalyzer {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

impl MarketAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze one run's observations
    ///
    /// Sources are processed in identifier order regardless of input order,
    /// so the same observations always produce the same result.
    pub fn analyze(&self, observations: &[RawObservation]) -> MarketAnalysis {
        let mut ordered: Vec<&RawObservation> = observations.iter().collect();
        ordered.sort_by(|a, b| a.source.cmp(&b.source));

        tracing::info!(sources = ordered.len(), "Starting market analysis");

        let mut issues = Vec::new();

        // Phase 1: Normalize
        let mut normalized: Vec<NormalizedObservation> = Vec::with_capacity(ordered.len());
        let mut sources = BTreeMap::new();
        for raw in &ordered {
            let (observation, misses) = normalize_observation(raw);
            issues.extend(misses);
            normalized.push(observation);

            let source_date = match raw.source_date.as_deref() {
                Some(text) => match parse_source_date(text) {
                    Some(date) => Some(date),
                    None => {
                        tracing::warn!("{}: unparseable source date {:?}", raw.source, text);
                        issues.push(AnalysisIssue::NormalizationMiss {
                            source_id: raw.source.clone(),
                            field: "source_date".to_string(),
                            detail: format!("not an RFC 3339 timestamp: {:?}", text),
                        });
                        None
                    }
                },
                None => None,
            };
            let market_type = raw.market_type.as_deref().and_then(|label| {
                let parsed = MarketType::from_label(label);
                if parsed.is_none() {
                    issues.push(AnalysisIssue::NormalizationMiss {
                        source_id: raw.source.clone(),
                        field: "market_type".to_string(),
                        detail: format!("unknown market type {:?}", label),
                    });
                }
                parsed
            });
            sources.insert(
                raw.source.clone(),
                SourceInfo {
                    url: raw.url.clone(),
                    source_date,
                    market_type,
                },
            );
        }

        // Phase 2: Tier
        let tier = TierClassifier::new(&self.config.tier).classify(&median_price_signals(&normalized));
        if tier.low_confidence {
            issues.push(AnalysisIssue::TierClassificationLowConfidence);
        }

        // Phase 3: Validate
        let validator = FieldValidator::new(&self.config, tier.tier);
        let validations: Vec<ValidationResult> = normalized
            .iter()
            .flat_map(|observation| validator.validate_observation(observation))
            .collect();
        for result in &validations {
            if let Some(reason) = result.reject_reason() {
                issues.push(AnalysisIssue::ValidationRejection {
                    source_id: result.source.clone(),
                    metric: result.metric,
                    value: result.value,
                    reason,
                });
            }
        }

        // Phases 4-5: Outliers and aggregation, one metric at a time
        let detector = OutlierDetector::new(&self.config.outliers);
        let aggregator = Aggregator::new();
        let mut metrics = MarketMetrics::default();
        let mut source_urls = BTreeMap::new();
        let mut outliers = Vec::new();

        for metric in Metric::ALL {
            let sample = accepted_sample(metric, &validations);
            if sample.is_empty() {
                tracing::debug!("{}: no valid values; omitted", metric);
                issues.push(AnalysisIssue::EmptyMetric { metric });
                continue;
            }

            let report = detector.detect(sample);
            match &report.basis {
                OutlierBasis::InsufficientSample { count, minimum } => {
                    issues.push(AnalysisIssue::InsufficientSample {
                        metric,
                        count: *count,
                        minimum: *minimum,
                    });
                }
                OutlierBasis::FilterWouldEmpty { .. } => {
                    issues.push(AnalysisIssue::OutlierFilterSkipped {
                        metric,
                        count: report.kept.len(),
                    });
                }
                OutlierBasis::MedianAbsoluteDeviation { median, cutoff, .. } => {
                    for excluded in &report.outliers {
                        issues.push(AnalysisIssue::OutlierExcluded {
                            source_id: excluded.source.clone(),
                            metric,
                            value: excluded.value,
                            median: *median,
                            cutoff: *cutoff,
                        });
                    }
                }
                OutlierBasis::ZeroDeviation { .. } => {}
            }

            if let Some(aggregated) = aggregator.aggregate(&report, tier.tier) {
                source_urls.insert(metric, aggregated.contributing_sources.clone());
                metrics.insert(metric, aggregated);
            }
            outliers.push(report);
        }

        // Phase 6: Consistency
        if let Some(warning) = ConsistencyValidator::new(&self.config.consistency).check(&metrics) {
            issues.push(warning);
        }

        tracing::info!(
            metrics = metrics.len(),
            issues = issues.len(),
            "Market analysis complete: tier={}",
            tier.tier
        );

        MarketAnalysis {
            metrics,
            source_urls,
            sources,
            tier,
            bounds: validator.bounds().clone(),
            validations,
            outliers,
            issues,
        }
    }
}

/// Analyze `observations` with `config`
pub fn analyze_market(observations: &[RawObservation], config: &AnalysisConfig) -> MarketAnalysis {
    MarketAnalyzer::new(config.clone()).analyze(observations)
}

/// Accepted values for `metric`, in source order
fn accepted_sample(metric: Metric, validations: &[ValidationResult]) -> MetricSample {
    let values = validations
        .iter()
        .filter(|r| r.metric == metric && r.is_accepted())
        .map(|r| SourcedValue::new(r.source.clone(), r.value))
        .collect();
    MetricSample::new(metric, values)
}

fn parse_source_date(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .ok()
        .map(|date| date.with_timezone(&Utc))
}
