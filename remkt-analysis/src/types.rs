// Shared Types and Data Contracts
//
// Each type here is the explicit hand-off between two stages of the
// analysis pipeline:
//   RawObservation → NormalizedObservation → ValidationResult
//   → MetricSample → OutlierReport → AggregatedMetric / MarketMetrics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Untyped value as captured by extraction (string, number or null)
pub type RawValue = serde_json::Value;

// ============================================================================
// Metrics and Units
// ============================================================================

/// Market metric tracked by the analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    MedianPrice,
    PricePerSqft,
    DaysOnMarket,
    InventoryCount,
    /// Year-over-year median price change, percent
    PriceChange,
    /// Typical home size, square feet
    MedianSqft,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::MedianPrice,
        Metric::PricePerSqft,
        Metric::DaysOnMarket,
        Metric::InventoryCount,
        Metric::PriceChange,
        Metric::MedianSqft,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::MedianPrice => "median_price",
            Metric::PricePerSqft => "price_per_sqft",
            Metric::DaysOnMarket => "days_on_market",
            Metric::InventoryCount => "inventory_count",
            Metric::PriceChange => "price_change",
            Metric::MedianSqft => "median_sqft",
        }
    }

    /// Map a raw field name (including common aliases) onto a metric
    pub fn from_field_name(name: &str) -> Option<Self> {
        let key = name.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match key.as_str() {
            "median_price" | "median_sale_price" | "median_list_price" | "median_home_value"
            | "home_value" | "typical_home_value" => Some(Metric::MedianPrice),
            "price_per_sqft" | "price_per_square_foot" | "median_price_per_sqft" | "ppsf" => {
                Some(Metric::PricePerSqft)
            }
            "days_on_market" | "median_days_on_market" | "dom" => Some(Metric::DaysOnMarket),
            "inventory_count" | "inventory" | "active_listings" | "homes_for_sale" => {
                Some(Metric::InventoryCount)
            }
            "price_change" | "yoy_price_change" | "price_change_pct" | "one_year_change" => {
                Some(Metric::PriceChange)
            }
            "median_sqft" | "typical_sqft" | "median_square_feet" => Some(Metric::MedianSqft),
            _ => None,
        }
    }

    /// Canonical unit values of this metric are expressed in
    pub fn unit(self) -> Unit {
        match self {
            Metric::MedianPrice => Unit::Dollars,
            Metric::PricePerSqft => Unit::DollarsPerSqft,
            Metric::DaysOnMarket => Unit::Days,
            Metric::InventoryCount => Unit::Count,
            Metric::PriceChange => Unit::Percent,
            Metric::MedianSqft => Unit::SquareFeet,
        }
    }

    /// Price-denominated ranges widen in high-cost markets
    pub fn is_price_denominated(self) -> bool {
        matches!(self, Metric::MedianPrice | Metric::PricePerSqft)
    }

    pub fn allows_negative(self) -> bool {
        matches!(self, Metric::PriceChange)
    }

    /// Whether a unit detected in the raw text fits this metric
    pub fn accepts_unit(self, hint: Unit) -> bool {
        // "$450" is the usual way sites print price per square foot
        hint == self.unit() || (self == Metric::PricePerSqft && hint == Unit::Dollars)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit of a normalized value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Dollars,
    DollarsPerSqft,
    Days,
    Count,
    Percent,
    SquareFeet,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Unit::Dollars => "dollars",
            Unit::DollarsPerSqft => "dollars_per_sqft",
            Unit::Days => "days",
            Unit::Count => "count",
            Unit::Percent => "percent",
            Unit::SquareFeet => "square_feet",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Stage 1: Raw and Normalized Observations
// ============================================================================

/// Everything one source reported, before any parsing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    pub source: String,
    pub fields: BTreeMap<String, RawValue>,
    pub url: Option<String>,
    /// Capture time as reported by the crawler (RFC 3339 expected)
    pub source_date: Option<String>,
    /// Market condition label as printed by the source ("Seller's Market")
    pub market_type: Option<String>,
}

impl RawObservation {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            fields: BTreeMap::new(),
            url: None,
            source_date: None,
            market_type: None,
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: RawValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }
}

/// A parsed number plus the unit its raw text advertised, if any
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedValue {
    pub value: f64,
    pub unit_hint: Option<Unit>,
}

impl NormalizedValue {
    pub fn plain(value: f64) -> Self {
        Self {
            value,
            unit_hint: None,
        }
    }
}

/// Per-source typed values
///
/// A metric maps to `None` when the source reported the field but it could
/// not be parsed; metrics the source never mentioned are absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedObservation {
    pub source: String,
    pub values: BTreeMap<Metric, Option<NormalizedValue>>,
}

impl NormalizedObservation {
    pub fn get(&self, metric: Metric) -> Option<&NormalizedValue> {
        self.values.get(&metric).and_then(|v| v.as_ref())
    }
}

// ============================================================================
// Stage 2: Market Tier
// ============================================================================

/// Market cost classification for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketTier {
    #[default]
    Standard,
    HighCost,
}

impl fmt::Display for MarketTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketTier::Standard => write!(f, "standard"),
            MarketTier::HighCost => write!(f, "high_cost"),
        }
    }
}

/// Tier decision with the evidence behind it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierAssessment {
    pub tier: MarketTier,
    /// Median of the median-price observations used (None when there were none)
    pub reference_median: Option<f64>,
    pub cutoff: f64,
    pub sample_size: usize,
    pub low_confidence: bool,
}

// ============================================================================
// Stage 3: Validation
// ============================================================================

/// Inclusive plausible range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Why a value was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    OutOfRange,
    WrongSign,
    NonNumeric,
    StaleUnit,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectReason::OutOfRange => "out_of_range",
            RejectReason::WrongSign => "wrong_sign",
            RejectReason::NonNumeric => "non_numeric",
            RejectReason::StaleUnit => "stale_unit",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationOutcome {
    Accepted,
    Rejected { reason: RejectReason },
}

/// Verdict for one (source, metric) value; never mutates the observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub source: String,
    pub metric: Metric,
    pub value: f64,
    pub outcome: ValidationOutcome,
}

impl ValidationResult {
    pub fn is_accepted(&self) -> bool {
        self.outcome == ValidationOutcome::Accepted
    }

    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self.outcome {
            ValidationOutcome::Accepted => None,
            ValidationOutcome::Rejected { reason } => Some(reason),
        }
    }
}

// ============================================================================
// Stage 4: Samples and Outliers
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcedValue {
    pub source: String,
    pub value: f64,
}

impl SourcedValue {
    pub fn new(source: impl Into<String>, value: f64) -> Self {
        Self {
            source: source.into(),
            value,
        }
    }
}

/// All accepted values for one metric across sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub metric: Metric,
    pub values: Vec<SourcedValue>,
}

impl MetricSample {
    pub fn new(metric: Metric, values: Vec<SourcedValue>) -> Self {
        Self { metric, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn raw_values(&self) -> Vec<f64> {
        self.values.iter().map(|v| v.value).collect()
    }
}

/// Basis for an outlier decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "basis", rename_all = "snake_case")]
pub enum OutlierBasis {
    /// Too few values to judge; everything kept
    InsufficientSample { count: usize, minimum: usize },
    /// Values (nearly) identical; nothing flagged
    ZeroDeviation { median: f64 },
    /// Deviation from `median` above `cutoff` was flagged
    MedianAbsoluteDeviation { median: f64, mad: f64, cutoff: f64 },
    /// Filtering would have emptied the sample; everything kept
    FilterWouldEmpty { median: f64, mad: f64, cutoff: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierReport {
    pub metric: Metric,
    pub kept: Vec<SourcedValue>,
    pub outliers: Vec<SourcedValue>,
    pub basis: OutlierBasis,
}

// ============================================================================
// Stage 5: Aggregated Output
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Low,
}

/// Consensus value for one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedMetric {
    pub value: f64,
    pub unit: Unit,
    pub contributing_source_count: usize,
    pub contributing_sources: Vec<String>,
    pub tier_used: MarketTier,
    pub confidence: Confidence,
    pub confidence_note: String,
}

/// Final metrics record; metrics with no usable data are absent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketMetrics(BTreeMap<Metric, AggregatedMetric>);

impl MarketMetrics {
    pub fn get(&self, metric: Metric) -> Option<&AggregatedMetric> {
        self.0.get(&metric)
    }

    pub fn value(&self, metric: Metric) -> Option<f64> {
        self.0.get(&metric).map(|m| m.value)
    }

    pub fn contains(&self, metric: Metric) -> bool {
        self.0.contains_key(&metric)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Metric, &AggregatedMetric)> {
        self.0.iter()
    }

    pub(crate) fn insert(&mut self, metric: Metric, aggregated: AggregatedMetric) {
        self.0.insert(metric, aggregated);
    }
}

/// Supply/demand condition a source reports for the market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketType {
    Sellers,
    Buyers,
    Neutral,
}

impl MarketType {
    /// Parse a printed label such as "Seller's Market" or "balanced"
    pub fn from_label(label: &str) -> Option<Self> {
        let cleaned: String = label
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, '\'' | '\u{2019}'))
            .collect();
        let word = cleaned.trim();
        let word = word.strip_suffix("market").unwrap_or(word).trim();
        match word {
            "sellers" | "seller" => Some(MarketType::Sellers),
            "buyers" | "buyer" => Some(MarketType::Buyers),
            "neutral" | "balanced" => Some(MarketType::Neutral),
            _ => None,
        }
    }
}

impl fmt::Display for MarketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MarketType::Sellers => "sellers",
            MarketType::Buyers => "buyers",
            MarketType::Neutral => "neutral",
        };
        f.write_str(s)
    }
}

/// Provenance of one source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub url: Option<String>,
    pub source_date: Option<DateTime<Utc>>,
    pub market_type: Option<MarketType>,
}

// ============================================================================
// Annotations
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    NormalizationMiss,
    ValidationRejection,
    OutlierExcluded,
    OutlierFilterSkipped,
    InsufficientSample,
    EmptyMetric,
    TierClassificationLowConfidence,
    ConsistencyWarning,
}

/// Non-fatal finding recorded during a run
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisIssue {
    #[error("normalization miss for {source_id}.{field}: {detail}")]
    NormalizationMiss {
        #[serde(rename = "source")]
        source_id: String,
        field: String,
        detail: String,
    },

    #[error("{source_id}.{metric} = {value} rejected: {reason}")]
    ValidationRejection {
        #[serde(rename = "source")]
        source_id: String,
        metric: Metric,
        value: f64,
        reason: RejectReason,
    },

    #[error("{source_id}.{metric} = {value} excluded as outlier (median {median}, max deviation {cutoff})")]
    OutlierExcluded {
        #[serde(rename = "source")]
        source_id: String,
        metric: Metric,
        value: f64,
        median: f64,
        cutoff: f64,
    },

    #[error("outlier filter for {metric} would drop all {count} values; kept all")]
    OutlierFilterSkipped { metric: Metric, count: usize },

    #[error("{metric} has {count} value(s), below the {minimum} needed for outlier detection")]
    InsufficientSample {
        metric: Metric,
        count: usize,
        minimum: usize,
    },

    #[error("{metric} has no valid values from any source; omitted")]
    EmptyMetric { metric: Metric },

    #[error("no median price signal available; defaulted to standard tier")]
    TierClassificationLowConfidence,

    #[error("median_price {reported_median_price} diverges {divergence:.3} from price_per_sqft x median_sqft = {implied_median_price} (tolerance {tolerance})")]
    ConsistencyWarning {
        implied_median_price: f64,
        reported_median_price: f64,
        divergence: f64,
        tolerance: f64,
    },
}

impl AnalysisIssue {
    pub fn kind(&self) -> IssueKind {
        match self {
            AnalysisIssue::NormalizationMiss { .. } => IssueKind::NormalizationMiss,
            AnalysisIssue::ValidationRejection { .. } => IssueKind::ValidationRejection,
            AnalysisIssue::OutlierExcluded { .. } => IssueKind::OutlierExcluded,
            AnalysisIssue::OutlierFilterSkipped { .. } => IssueKind::OutlierFilterSkipped,
            AnalysisIssue::InsufficientSample { .. } => IssueKind::InsufficientSample,
            AnalysisIssue::EmptyMetric { .. } => IssueKind::EmptyMetric,
            AnalysisIssue::TierClassificationLowConfidence => {
                IssueKind::TierClassificationLowConfidence
            }
            AnalysisIssue::ConsistencyWarning { .. } => IssueKind::ConsistencyWarning,
        }
    }
}

// ============================================================================
// Run Result
// ============================================================================

/// Everything one analysis run produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketAnalysis {
    pub metrics: MarketMetrics,
    /// Attribution: metric → source identifiers whose values were aggregated
    pub source_urls: BTreeMap<Metric, Vec<String>>,
    pub sources: BTreeMap<String, SourceInfo>,
    pub tier: TierAssessment,
    /// Effective bounds after tier scaling
    pub bounds: BTreeMap<Metric, Bounds>,
    pub validations: Vec<ValidationResult>,
    pub outliers: Vec<OutlierReport>,
    pub issues: Vec<AnalysisIssue>,
}

impl MarketAnalysis {
    pub fn issues_of(&self, kind: IssueKind) -> impl Iterator<Item = &AnalysisIssue> {
        self.issues.iter().filter(move |i| i.kind() == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_name_aliases() {
        assert_eq!(Metric::from_field_name("median_price"), Some(Metric::MedianPrice));
        assert_eq!(Metric::from_field_name("Median Sale Price"), Some(Metric::MedianPrice));
        assert_eq!(Metric::from_field_name("dom"), Some(Metric::DaysOnMarket));
        assert_eq!(Metric::from_field_name("active-listings"), Some(Metric::InventoryCount));
        assert_eq!(Metric::from_field_name("school_rating"), None);
    }

    #[test]
    fn test_every_metric_round_trips_its_name() {
        for metric in Metric::ALL {
            assert_eq!(Metric::from_field_name(metric.as_str()), Some(metric));
        }
    }

    #[test]
    fn test_price_per_sqft_accepts_dollar_hint() {
        assert!(Metric::PricePerSqft.accepts_unit(Unit::Dollars));
        assert!(Metric::PricePerSqft.accepts_unit(Unit::DollarsPerSqft));
        assert!(!Metric::MedianPrice.accepts_unit(Unit::Percent));
        assert!(!Metric::DaysOnMarket.accepts_unit(Unit::Dollars));
    }

    #[test]
    fn test_market_type_labels() {
        assert_eq!(MarketType::from_label("Seller's Market"), Some(MarketType::Sellers));
        assert_eq!(MarketType::from_label("seller\u{2019}s market"), Some(MarketType::Sellers));
        assert_eq!(MarketType::from_label("Buyers Market"), Some(MarketType::Buyers));
        assert_eq!(MarketType::from_label("Neutral Market"), Some(MarketType::Neutral));
        assert_eq!(MarketType::from_label("balanced"), Some(MarketType::Neutral));
        assert_eq!(MarketType::from_label("hot"), None);
    }

    #[test]
    fn test_issue_serializes_with_kind_tag() {
        let issue = AnalysisIssue::EmptyMetric {
            metric: Metric::InventoryCount,
        };
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["kind"], "empty_metric");
        assert_eq!(json["metric"], "inventory_count");
        assert_eq!(issue.kind(), IssueKind::EmptyMetric);
    }

    #[test]
    fn test_market_metrics_serialize_as_map() {
        let mut metrics = MarketMetrics::default();
        metrics.insert(
            Metric::DaysOnMarket,
            AggregatedMetric {
                value: 30.0,
                unit: Unit::Days,
                contributing_source_count: 1,
                contributing_sources: vec!["redfin".to_string()],
                tier_used: MarketTier::Standard,
                confidence: Confidence::Low,
                confidence_note: "single source".to_string(),
            },
        );
        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["days_on_market"]["value"], 30.0);
        assert_eq!(json["days_on_market"]["tier_used"], "standard");
    }
}
