// Structural profiling of record payloads

use crate::resolver::FieldResolver;
use serde_json::Value;
use sluice_core::record::approximate_size;
use sluice_core::{EngineConfig, FieldInfo, FieldPath, FieldType, Record};

/// Walks record bodies and application properties, emitting one
/// [`FieldInfo`] per container and per leaf.
///
/// Emitted paths resolve back to the same value through [`FieldResolver`]:
/// properties are prefixed `properties.`, and top-level body keys that would
/// otherwise be shadowed (metadata names, `body`, `properties`) are
/// prefixed `body.`. Keys no path can address (empty, or containing `.`,
/// `[`, `]` or control characters) are skipped together with their subtrees.
pub struct FieldProfiler {
    max_depth: usize,
}

impl Default for FieldProfiler {
    fn default() -> Self {
        Self::new(EngineConfig::default().max_field_depth)
    }
}

impl FieldProfiler {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.max_field_depth)
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn profile<'a>(&self, records: &'a [Record]) -> Vec<FieldInfo<'a>> {
        let mut out = Vec::new();
        for record in records {
            self.profile_record(record, &mut out);
        }
        out
    }

    pub fn profile_record<'a>(&self, record: &'a Record, out: &mut Vec<FieldInfo<'a>>) {
        let record_size = record.size_estimate();
        let mut walker = Walker {
            record,
            record_size,
            max_depth: self.max_depth,
            out,
        };

        match &record.body {
            Value::Object(map) => {
                for (key, value) in map.iter().filter(|(k, _)| FieldPath::is_addressable_key(k)) {
                    walker.visit(value, Self::body_key_path(key), 1);
                }
            }
            Value::Array(items) => {
                for (i, value) in items.iter().enumerate() {
                    walker.visit(value, FieldPath::child_index("", i), 1);
                }
            }
            // EDGE CASE: scalar payloads profile as the body itself
            Value::Null => {}
            scalar => walker.visit(scalar, FieldResolver::BODY_PREFIX.to_string(), 1),
        }

        for (key, value) in record
            .properties
            .iter()
            .filter(|(k, _)| FieldPath::is_addressable_key(k))
        {
            let path = FieldPath::child_key(FieldResolver::PROPERTIES_PREFIX, key);
            walker.visit(value, path, 1);
        }
    }

    fn body_key_path(key: &str) -> String {
        let shadowed = Record::RESERVED_FIELDS.contains(&key)
            || key == FieldResolver::BODY_PREFIX
            || key == FieldResolver::PROPERTIES_PREFIX;
        if shadowed {
            FieldPath::child_key(FieldResolver::BODY_PREFIX, key)
        } else {
            key.to_string()
        }
    }
}

struct Walker<'a, 'o> {
    record: &'a Record,
    record_size: u64,
    max_depth: usize,
    out: &'o mut Vec<FieldInfo<'a>>,
}

impl<'a, 'o> Walker<'a, 'o> {
    fn visit(&mut self, value: &'a Value, path: String, depth: usize) {
        // Depth overflow stops descending without error
        if depth > self.max_depth || path.len() > FieldPath::MAX_PATH_LENGTH {
            return;
        }

        match value {
            Value::Object(map) => {
                for (key, child) in map.iter().filter(|(k, _)| FieldPath::is_addressable_key(k)) {
                    self.visit(child, FieldPath::child_key(&path, key), depth + 1);
                }
            }
            Value::Array(items) => {
                for (i, child) in items.iter().enumerate() {
                    self.visit(child, FieldPath::child_index(&path, i), depth + 1);
                }
            }
            _ => {}
        }

        let record = self.record;
        self.out.push(FieldInfo {
            path,
            field_type: FieldType::of(value),
            value,
            approximate_size: approximate_size(value),
            record_id: &record.id,
            timestamp: record.timestamp,
            record_size: self.record_size,
        });
    }
}
