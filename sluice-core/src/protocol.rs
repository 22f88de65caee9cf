// Request/response shapes exchanged with the calling collaborators

use crate::analytics::{CorrelationEntry, FieldStatistics, TimeSeriesPoint};
use crate::filter::FilterGroup;
use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRequest {
    pub records: Vec<Record>,
    pub filter: FilterGroup,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterMetrics {
    pub total_records: usize,
    pub kept_records: usize,
    pub duration_ms: f64,
    /// Leaf-condition evaluations requested, cached or not
    pub condition_evaluations: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterResponse {
    pub kept: Vec<Record>,
    pub metrics: FilterMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub records: Vec<Record>,
    pub connection_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_statistics: Option<BTreeMap<String, FieldStatistics>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub statistics: BTreeMap<String, FieldStatistics>,
    pub time_series: Vec<TimeSeriesPoint>,
    pub correlations: Vec<CorrelationEntry>,
    pub message_type_counts: BTreeMap<String, u64>,
}
