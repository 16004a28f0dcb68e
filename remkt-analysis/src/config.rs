//! Analysis configuration
//!
//! Every threshold the pipeline uses lives here and is passed in explicitly,
//! so a run is fully determined by its input and this struct.
//!
//! Example `analysis.toml`:
//! ```toml
//! [tier]
//! high_cost_cutoff = 1_250_000.0
//!
//! [outliers]
//! mad_threshold = 3.5
//!
//! [bounds.days_on_market]
//! min = 0.0
//! max = 365.0
//! ```

use crate::types::{Bounds, MarketTier, Metric};
use remkt_common::config::{load_toml_config, resolve_config_location, LoggingConfig};
use remkt_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "REMKT_CONFIG";

/// File name looked up under the per-user config directory
pub const CONFIG_FILE_NAME: &str = "analysis.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub tier: TierConfig,
    pub outliers: OutlierConfig,
    pub bounds: BoundsConfig,
    pub consistency: ConsistencyConfig,
    pub logging: LoggingConfig,
}

/// High-cost market classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierConfig {
    /// Median price strictly above this is a high-cost market (dollars)
    pub high_cost_cutoff: f64,
    /// Factor applied to the ceiling of price-denominated bounds in high-cost markets
    pub high_cost_multiplier: f64,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            high_cost_cutoff: 1_000_000.0,
            high_cost_multiplier: 5.0,
        }
    }
}

/// Median-absolute-deviation outlier filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierConfig {
    /// Flag values deviating more than this many scaled MADs from the median
    pub mad_threshold: f64,
    /// Consistency constant making MAD comparable to a standard deviation
    pub mad_scale: f64,
    /// Fewer values than this skips detection
    pub min_sample: usize,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            mad_threshold: 3.0,
            mad_scale: 1.4826,
            min_sample: 3,
        }
    }
}

/// Base plausible range per metric (standard tier)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundsConfig {
    pub median_price: Bounds,
    pub price_per_sqft: Bounds,
    pub days_on_market: Bounds,
    pub inventory_count: Bounds,
    pub price_change: Bounds,
    pub median_sqft: Bounds,
}

impl Default for BoundsConfig {
    fn default() -> Self {
        Self {
            median_price: Bounds::new(10_000.0, 2_000_000.0),
            price_per_sqft: Bounds::new(50.0, 2_000.0),
            days_on_market: Bounds::new(0.0, 3_650.0),
            inventory_count: Bounds::new(0.0, 50_000.0),
            price_change: Bounds::new(-50.0, 50.0),
            median_sqft: Bounds::new(200.0, 20_000.0),
        }
    }
}

impl BoundsConfig {
    pub fn base(&self, metric: Metric) -> Bounds {
        match metric {
            Metric::MedianPrice => self.median_price,
            Metric::PricePerSqft => self.price_per_sqft,
            Metric::DaysOnMarket => self.days_on_market,
            Metric::InventoryCount => self.inventory_count,
            Metric::PriceChange => self.price_change,
            Metric::MedianSqft => self.median_sqft,
        }
    }
}

/// Cross-metric consistency check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsistencyConfig {
    /// Allowed relative gap between median_price and price_per_sqft x median_sqft
    pub tolerance: f64,
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        Self { tolerance: 0.25 }
    }
}

impl AnalysisConfig {
    /// Resolve and load the config (CLI → `REMKT_CONFIG` → user dir → defaults)
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let location = resolve_config_location(cli_path, CONFIG_ENV_VAR, CONFIG_FILE_NAME);
        let config: AnalysisConfig = load_toml_config(&location)?;
        config.validate()?;
        Ok(config)
    }

    /// Effective bounds for `metric` under `tier`
    ///
    /// High-cost markets raise the ceiling of price-denominated metrics by the
    /// tier multiplier; the floor never moves.
    pub fn bounds_for(&self, metric: Metric, tier: MarketTier) -> Bounds {
        let base = self.bounds.base(metric);
        if tier == MarketTier::HighCost && metric.is_price_denominated() {
            Bounds::new(base.min, base.max * self.tier.high_cost_multiplier)
        } else {
            base
        }
    }

    pub fn validate(&self) -> Result<()> {
        for metric in Metric::ALL {
            let b = self.bounds.base(metric);
            if !(b.min.is_finite() && b.max.is_finite()) || b.min > b.max {
                return Err(Error::Config(format!(
                    "bounds.{}: min {} must be <= max {}",
                    metric, b.min, b.max
                )));
            }
        }
        if !self.tier.high_cost_cutoff.is_finite() || self.tier.high_cost_cutoff <= 0.0 {
            return Err(Error::Config(format!(
                "tier.high_cost_cutoff must be positive, got {}",
                self.tier.high_cost_cutoff
            )));
        }
        if !(self.tier.high_cost_multiplier >= 1.0) {
            return Err(Error::Config(format!(
                "tier.high_cost_multiplier must be >= 1.0, got {}",
                self.tier.high_cost_multiplier
            )));
        }
        if !(self.outliers.mad_threshold > 0.0) || !(self.outliers.mad_scale > 0.0) {
            return Err(Error::Config(
                "outliers.mad_threshold and outliers.mad_scale must be positive".to_string(),
            ));
        }
        if self.outliers.min_sample < 3 {
            return Err(Error::Config(format!(
                "outliers.min_sample must be at least 3, got {}",
                self.outliers.min_sample
            )));
        }
        if !(self.consistency.tolerance >= 0.0) {
            return Err(Error::Config(format!(
                "consistency.tolerance must be non-negative, got {}",
                self.consistency.tolerance
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn test_high_cost_widens_price_ceiling_only() {
        let config = AnalysisConfig::default();

        let standard = config.bounds_for(Metric::PricePerSqft, MarketTier::Standard);
        let high = config.bounds_for(Metric::PricePerSqft, MarketTier::HighCost);
        assert_eq!(standard, Bounds::new(50.0, 2_000.0));
        assert_eq!(high, Bounds::new(50.0, 10_000.0));

        // Non-price metrics are tier-independent
        assert_eq!(
            config.bounds_for(Metric::DaysOnMarket, MarketTier::HighCost),
            config.bounds_for(Metric::DaysOnMarket, MarketTier::Standard)
        );
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let mut config = AnalysisConfig::default();
        config.bounds.median_sqft = Bounds::new(500.0, 100.0);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_small_min_sample_rejected() {
        let mut config = AnalysisConfig::default();
        config.outliers.min_sample = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_multiplier_below_one_rejected() {
        let mut config = AnalysisConfig::default();
        config.tier.high_cost_multiplier = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let toml_text = r#"
            [tier]
            high_cost_cutoff = 1500000.0

            [bounds.days_on_market]
            min = 0.0
            max = 365.0
        "#;
        let config: AnalysisConfig = toml::from_str(toml_text).unwrap();
        assert_eq!(config.tier.high_cost_cutoff, 1_500_000.0);
        assert_eq!(config.tier.high_cost_multiplier, 5.0);
        assert_eq!(config.bounds.days_on_market, Bounds::new(0.0, 365.0));
        assert_eq!(config.bounds.price_per_sqft, Bounds::new(50.0, 2_000.0));
    }
}
