// Engine configuration: defaults, file/env loading, validation

use crate::analytics::TimeInterval;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tunables shared by the filter and analytics engines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub max_field_depth: usize,
    pub max_unique_values: usize,
    pub correlation_threshold: f64,
    pub time_series_interval: TimeInterval,
    pub enable_correlation: bool,
    pub enable_time_series: bool,
    /// Deepest filter group nesting accepted at the request boundary
    pub max_group_depth: usize,
    /// Resolve every filtered path once per record before the main scan
    pub prefetch_fields: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_field_depth: 10,
            max_unique_values: 1000,
            correlation_threshold: 0.5,
            time_series_interval: TimeInterval::Hour,
            enable_correlation: true,
            enable_time_series: true,
            max_group_depth: 32,
            prefetch_fields: true,
        }
    }
}

impl EngineConfig {
    /// Load configuration from file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path, e)))?;
        Self::from_str(&content)
    }

    /// Load configuration from string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        // Try JSON first
        if let Ok(config) = serde_json::from_str::<EngineConfig>(content) {
            return Ok(config);
        }

        // Try TOML
        if let Ok(config) = toml::from_str::<EngineConfig>(content) {
            return Ok(config);
        }

        // Try YAML
        if let Ok(config) = serde_yaml::from_str::<EngineConfig>(content) {
            return Ok(config);
        }

        Err(ConfigError::Parse("not valid JSON, TOML or YAML".to_string()))
    }

    /// Defaults overridden by `SLUICE_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Apply overrides from an environment lookup; unparsable values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SLUICE_MAX_FIELD_DEPTH").and_then(|v| v.parse().ok()) {
            self.max_field_depth = v;
        }
        if let Some(v) = lookup("SLUICE_MAX_UNIQUE_VALUES").and_then(|v| v.parse().ok()) {
            self.max_unique_values = v;
        }
        if let Some(v) = lookup("SLUICE_CORRELATION_THRESHOLD").and_then(|v| v.parse().ok()) {
            self.correlation_threshold = v;
        }
        if let Some(v) = lookup("SLUICE_TIME_SERIES_INTERVAL").and_then(|v| TimeInterval::parse(&v)) {
            self.time_series_interval = v;
        }
        if let Some(v) = lookup("SLUICE_ENABLE_CORRELATION").and_then(|v| parse_flag(&v)) {
            self.enable_correlation = v;
        }
        if let Some(v) = lookup("SLUICE_ENABLE_TIME_SERIES").and_then(|v| parse_flag(&v)) {
            self.enable_time_series = v;
        }
        if let Some(v) = lookup("SLUICE_MAX_GROUP_DEPTH").and_then(|v| v.parse().ok()) {
            self.max_group_depth = v;
        }
        if let Some(v) = lookup("SLUICE_PREFETCH_FIELDS").and_then(|v| parse_flag(&v)) {
            self.prefetch_fields = v;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_field_depth == 0 {
            return Err(ConfigError::Validation(
                "maxFieldDepth must be > 0".to_string(),
            ));
        }

        if self.max_unique_values == 0 {
            return Err(ConfigError::Validation(
                "maxUniqueValues must be > 0".to_string(),
            ));
        }

        // EDGE CASE: NaN fails both comparisons, so check the range positively
        if !(0.0..=1.0).contains(&self.correlation_threshold) {
            return Err(ConfigError::Validation(format!(
                "correlationThreshold must be within [0, 1], got {}",
                self.correlation_threshold
            )));
        }

        if self.max_group_depth == 0 {
            return Err(ConfigError::Validation(
                "maxGroupDepth must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),
}
