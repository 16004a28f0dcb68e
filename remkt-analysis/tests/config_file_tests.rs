//! Analysis config loaded from files

use remkt_analysis::types::Bounds;
use remkt_analysis::{AnalysisConfig, Metric};
use remkt_common::Error;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_explicit_file_overrides_defaults() {
    let file = write_config(
        r#"
        [tier]
        high_cost_cutoff = 1500000.0

        [outliers]
        mad_threshold = 3.5

        [bounds.days_on_market]
        min = 0.0
        max = 365.0

        [logging]
        level = "debug"
        "#,
    );

    let config = AnalysisConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.tier.high_cost_cutoff, 1_500_000.0);
    assert_eq!(config.outliers.mad_threshold, 3.5);
    assert_eq!(config.outliers.min_sample, 3);
    assert_eq!(config.bounds.base(Metric::DaysOnMarket), Bounds::new(0.0, 365.0));
    assert_eq!(config.bounds.base(Metric::MedianPrice), Bounds::new(10_000.0, 2_000_000.0));
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_sample_config_in_repo_loads() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("demos")
        .join("analysis.toml");
    let config = AnalysisConfig::load(Some(path.as_path())).unwrap();
    assert_eq!(config, AnalysisConfig::default());
}

#[test]
fn test_invalid_values_rejected_on_load() {
    let file = write_config(
        r#"
        [bounds.price_per_sqft]
        min = 2000.0
        max = 50.0
        "#,
    );
    assert!(matches!(
        AnalysisConfig::load(Some(file.path())),
        Err(Error::Config(_))
    ));
}

#[test]
fn test_missing_explicit_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    assert!(AnalysisConfig::load(Some(missing.as_path())).is_err());
}
