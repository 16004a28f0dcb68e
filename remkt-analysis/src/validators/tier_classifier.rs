// Market Tier Classifier
//
// Decides once per run whether the location is a high-cost market, from the
// median of all median-price observations. Strictly above the cutoff is
// high-cost; exactly at the cutoff stays standard. With no price signal the
// run defaults to standard and is flagged low-confidence.

use crate::config::TierConfig;
use crate::fusion::median;
use crate::types::{MarketTier, Metric, NormalizedObservation, TierAssessment};
use tracing::{info, warn};

pub struct TierClassifier {
    /// Dollar threshold; a reference median above it is high-cost
    cutoff: f64,
}

impl Default for TierClassifier {
    fn default() -> Self {
        Self::new(&TierConfig::default())
    }
}

impl TierClassifier {
    pub fn new(config: &TierConfig) -> Self {
        Self {
            cutoff: config.high_cost_cutoff,
        }
    }

    /// Classify from a set of median-price observations (dollars)
    pub fn classify(&self, median_prices: &[f64]) -> TierAssessment {
        let usable: Vec<f64> = median_prices
            .iter()
            .copied()
            .filter(|p| p.is_finite() && *p > 0.0)
            .collect();

        let Some(reference) = median(&usable) else {
            warn!("No median price signal; defaulting to standard tier");
            return TierAssessment {
                tier: MarketTier::Standard,
                reference_median: None,
                cutoff: self.cutoff,
                sample_size: 0,
                low_confidence: true,
            };
        };

        let tier = if reference > self.cutoff {
            MarketTier::HighCost
        } else {
            MarketTier::Standard
        };

        info!(
            "Market tier: {} (reference median ${:.0} from {} source(s), cutoff ${:.0})",
            tier,
            reference,
            usable.len(),
            self.cutoff
        );

        TierAssessment {
            tier,
            reference_median: Some(reference),
            cutoff: self.cutoff,
            sample_size: usable.len(),
            low_confidence: false,
        }
    }
}

/// Median-price values usable as a tier signal
///
/// Values whose text advertised a non-dollar unit are skipped.
pub fn median_price_signals(observations: &[NormalizedObservation]) -> Vec<f64> {
    observations
        .iter()
        .filter_map(|obs| obs.get(Metric::MedianPrice))
        .filter(|v| v.unit_hint.map_or(true, |u| Metric::MedianPrice.accepts_unit(u)))
        .map(|v| v.value)
        .collect()
}
