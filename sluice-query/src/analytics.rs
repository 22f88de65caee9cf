// Analysis pass: profile, aggregate, correlate, count message types

use crate::correlation::CorrelationEngine;
use crate::profiler::FieldProfiler;
use crate::statistics::StatisticsEngine;
use sluice_core::{AnalysisRequest, AnalysisResponse, EngineConfig, FieldStatistics, Result};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info};

/// Runs the analytics pipeline for one connection's record batch.
///
/// Stateless between calls: prior statistics arrive in the request and the
/// merged result goes back in the response.
pub struct AnalyticsEngine {
    config: EngineConfig,
    profiler: FieldProfiler,
    statistics: StatisticsEngine,
}

impl Default for AnalyticsEngine {
    fn default() -> Self {
        let config = EngineConfig::default();
        Self {
            profiler: FieldProfiler::from_config(&config),
            statistics: StatisticsEngine::new(&config),
            config,
        }
    }
}

impl AnalyticsEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            profiler: FieldProfiler::from_config(&config),
            statistics: StatisticsEngine::new(&config),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse> {
        let start = Instant::now();
        let records = &request.records;

        let infos = self.profiler.profile(records);
        debug!(
            connection = %request.connection_id,
            records = records.len(),
            fields = infos.len(),
            "Profiled records"
        );

        let statistics: BTreeMap<String, FieldStatistics> = match &request.existing_statistics {
            Some(existing) => self.statistics.merge_all(existing, &infos, records),
            None => self
                .statistics
                .analyze(&infos, records)
                .into_iter()
                .map(|stats| (stats.path.clone(), stats))
                .collect(),
        };

        let time_series = if self.config.enable_time_series {
            self.statistics.time_series(records)
        } else {
            Vec::new()
        };

        let correlations = if self.config.enable_correlation {
            CorrelationEngine::correlate(statistics.values(), self.config.correlation_threshold)
        } else {
            Vec::new()
        };

        let mut message_type_counts = BTreeMap::new();
        for record in records {
            *message_type_counts.entry(record.message_type()).or_insert(0u64) += 1;
        }

        info!(
            connection = %request.connection_id,
            records = records.len(),
            fields = statistics.len(),
            correlations = correlations.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Analysis completed"
        );

        Ok(AnalysisResponse {
            statistics,
            time_series,
            correlations,
            message_type_counts,
        })
    }
}
