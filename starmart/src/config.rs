//! Run configuration.
//!
//! Thresholds that operators tune live here; structural facts (tables,
//! columns, types) live in the schema registry and are not configurable.

use crate::error::{EtlError, Result};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Tunable thresholds for the validation battery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// How many offending keys each failing check samples for the report.
    pub sample_limit: usize,
    /// Discounts above this fraction are flagged as advisory.
    pub max_discount_pct: f64,
    /// Advisory bounds on gross margin percentage.
    pub margin_pct_floor: f64,
    pub margin_pct_ceiling: f64,
    /// Z-score threshold for the discount outlier check.
    pub discount_outlier_sigmas: f64,
    /// Maximum age of the newest fact row before the dataset counts as
    /// stale.
    pub staleness_days: u32,
    /// Advisory minimum fact table size.
    pub min_fact_rows: u64,
    /// Reference date for freshness; defaults to today when unset.
    pub as_of: Option<NaiveDate>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            sample_limit: 5,
            max_discount_pct: 0.40,
            margin_pct_floor: 0.0,
            margin_pct_ceiling: 95.0,
            discount_outlier_sigmas: 3.0,
            staleness_days: 30,
            min_fact_rows: 1000,
            as_of: None,
        }
    }
}

impl ValidationConfig {
    /// Loads the config from a JSON file. Absent fields take defaults.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .map_err(|e| EtlError::Configuration(format!("invalid config {}: {e}", path.display())))
    }

    pub fn as_of_date(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| Utc::now().date_naive())
    }
}

/// Where a pipeline run reads raw extracts and publishes processed output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub raw_dir: PathBuf,
    pub processed_dir: PathBuf,
    #[serde(default)]
    pub validation: ValidationConfig,
}

impl PipelineConfig {
    pub fn new(raw_dir: impl Into<PathBuf>, processed_dir: impl Into<PathBuf>) -> Self {
        Self {
            raw_dir: raw_dir.into(),
            processed_dir: processed_dir.into(),
            validation: ValidationConfig::default(),
        }
    }

    pub fn with_validation(mut self, validation: ValidationConfig) -> Self {
        self.validation = validation;
        self
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .map_err(|e| EtlError::Configuration(format!("invalid config {}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ValidationConfig::default();
        assert_eq!(config.sample_limit, 5);
        assert_eq!(config.max_discount_pct, 0.40);
        assert_eq!(config.staleness_days, 30);
        assert_eq!(config.min_fact_rows, 1000);
        assert!(config.as_of.is_none());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config: ValidationConfig =
            serde_json::from_str(r#"{"max_discount_pct": 0.25, "as_of": "2024-03-01"}"#).unwrap();
        assert_eq!(config.max_discount_pct, 0.25);
        assert_eq!(config.sample_limit, 5);
        assert_eq!(
            config.as_of_date(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }

    #[test]
    fn test_pipeline_config_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"raw_dir": "/data/raw", "processed_dir": "/data/processed"}"#,
        )
        .unwrap();
        let config = PipelineConfig::from_path(&path).unwrap();
        assert_eq!(config.raw_dir, PathBuf::from("/data/raw"));
        assert_eq!(config.validation.min_fact_rows, 1000);
    }

    #[test]
    fn test_invalid_json_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();
        let err = ValidationConfig::from_path(&path).unwrap_err();
        assert!(matches!(err, EtlError::Configuration(_)));
    }
}
