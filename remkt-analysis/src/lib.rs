//! remkt-analysis: multi-source real-estate market analysis
//!
//! Turns noisy per-source observations into one validated metrics record.
//!
//! Stages: Normalizer → Tier Classifier → Field Validator → Outlier Detector
//! → Aggregator, followed by a non-fatal cross-metric consistency check.
//! Every stage is a pure function of its inputs and the [`AnalysisConfig`];
//! failures annotate the result instead of aborting the run.

pub mod config;
pub mod extractors;
pub mod fusion;
pub mod input;
pub mod logging;
pub mod normalizer;
pub mod pipeline;
pub mod types;
pub mod validators;

pub use crate::config::AnalysisConfig;
pub use crate::input::parse_market_input;
pub use crate::pipeline::{analyze_market, MarketAnalyzer};
pub use crate::types::{MarketAnalysis, MarketMetrics, MarketTier, Metric, RawObservation};
