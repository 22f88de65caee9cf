pub mod resolver;
pub mod condition;
pub mod cache;
pub mod tree;
pub mod engine;
pub mod optimizer;
pub mod profiler;
pub mod statistics;
pub mod correlation;
pub mod analytics;

pub use resolver::FieldResolver;
pub use condition::ConditionEvaluator;
pub use cache::{condition_fingerprint, CacheStats, ResultCache};
pub use tree::{EvalContext, FilterTreeEvaluator};
pub use engine::{FilterEngine, FilterOutcome};
pub use optimizer::{FilterOptimizer, OptimizationReport, Suggestion, SuggestionKind};
pub use profiler::FieldProfiler;
pub use statistics::StatisticsEngine;
pub use correlation::CorrelationEngine;
pub use analytics::AnalyticsEngine;
