// Field path resolution against a record's payload, properties and metadata

use serde_json::{Map, Value};
use sluice_core::{FieldPath, FieldValue, PathSegment, Record};
use std::borrow::Cow;

/// Resolves field paths against records. Never fails: a missing key,
/// out-of-range index or traversal through a scalar is `None` (unresolved).
pub struct FieldResolver;

impl FieldResolver {
    pub const PROPERTIES_PREFIX: &'static str = "properties";
    pub const BODY_PREFIX: &'static str = "body";

    pub fn resolve(record: &Record, path: &str) -> Option<FieldValue> {
        // EDGE CASE: malformed paths resolve to nothing instead of erroring
        let parsed = FieldPath::parse(path).ok()?;
        Self::resolve_path(record, &parsed)
    }

    pub fn resolve_path(record: &Record, path: &FieldPath) -> Option<FieldValue> {
        Self::locate(record, path).map(|value| FieldValue::from(value.as_ref()))
    }

    /// Raw JSON at `path`, borrowed from the record where possible.
    ///
    /// Order: reserved metadata names, `properties.` prefix, `body.` prefix,
    /// then the body with a fallback to the application properties.
    pub fn locate<'a>(record: &'a Record, path: &FieldPath) -> Option<Cow<'a, Value>> {
        if let Some(name) = path.single_key() {
            if let Some(value) = record.reserved_field(name) {
                return Some(Cow::Owned(value));
            }
            if name == Self::BODY_PREFIX {
                return Some(Cow::Borrowed(&record.body));
            }
            if name == Self::PROPERTIES_PREFIX {
                return Some(Cow::Owned(Value::Object(record.properties.clone())));
            }
        }

        if let Some(rest) = path.strip_prefix(Self::PROPERTIES_PREFIX) {
            return Self::walk_map(&record.properties, rest.segments()).map(Cow::Borrowed);
        }

        if let Some(rest) = path.strip_prefix(Self::BODY_PREFIX) {
            return Self::walk(&record.body, rest.segments()).map(Cow::Borrowed);
        }

        Self::walk(&record.body, path.segments())
            .or_else(|| Self::walk_map(&record.properties, path.segments()))
            .map(Cow::Borrowed)
    }

    /// Follow `segments` down from `root`.
    pub fn walk<'a>(root: &'a Value, segments: &[PathSegment]) -> Option<&'a Value> {
        let mut current = root;
        for segment in segments {
            current = Self::step(current, segment)?;
        }
        Some(current)
    }

    fn walk_map<'a>(map: &'a Map<String, Value>, segments: &[PathSegment]) -> Option<&'a Value> {
        let (first, rest) = segments.split_first()?;
        let start = match first {
            PathSegment::Key(key) => map.get(key.as_str())?,
            PathSegment::Index(index) => map.get(index.to_string().as_str())?,
        };
        Self::walk(start, rest)
    }

    fn step<'a>(current: &'a Value, segment: &PathSegment) -> Option<&'a Value> {
        match current {
            Value::Object(map) => match segment {
                PathSegment::Key(key) => map.get(key.as_str()),
                PathSegment::Index(index) => map.get(index.to_string().as_str()),
            },
            Value::Array(items) => items.get(segment.as_index()?),
            _ => None,
        }
    }
}
