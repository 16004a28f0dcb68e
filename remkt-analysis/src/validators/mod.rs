// Validators - Tier Classification, Field Plausibility, Cross-Metric Consistency

pub mod consistency_validator;
pub mod field_validator;
pub mod tier_classifier;

pub use consistency_validator::ConsistencyValidator;
pub use field_validator::FieldValidator;
pub use tier_classifier::{median_price_signals, TierClassifier};
