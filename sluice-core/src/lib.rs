pub mod error;
pub mod value;
pub mod path;
pub mod record;
pub mod filter;
pub mod analytics;
pub mod protocol;
pub mod config;

pub use error::{Error, Result};
pub use value::FieldValue;
pub use path::{FieldPath, PathSegment};
pub use record::Record;
pub use filter::{Condition, FilterGroup, GroupOperator, Operator};
pub use analytics::{
    CorrelationEntry, FieldInfo, FieldStatistics, FieldType, TimeInterval, TimeSeriesPoint,
    ValueCount,
};
pub use protocol::{
    AnalysisRequest, AnalysisResponse, FilterMetrics, FilterRequest, FilterResponse,
};
pub use config::{ConfigError, EngineConfig};
