// Dotted/indexed field paths: `user.orders[0].amount`, `items.2.sku`

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathSegment {
    /// Map key. An all-digit key also indexes arrays during resolution.
    Key(String),
    /// Bracketed array index.
    Index(usize),
}

impl PathSegment {
    /// Index this segment addresses when the current value is an array.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            PathSegment::Index(i) => Some(*i),
            PathSegment::Key(k) if !k.is_empty() && k.bytes().all(|b| b.is_ascii_digit()) => {
                k.parse().ok()
            }
            PathSegment::Key(_) => None,
        }
    }

    /// Key this segment addresses when the current value is a map.
    pub fn as_key(&self) -> String {
        match self {
            PathSegment::Key(k) => k.clone(),
            PathSegment::Index(i) => i.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    raw: String,
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// Maximum path length accepted at the request boundary
    pub const MAX_PATH_LENGTH: usize = 1_024;

    pub fn parse(path: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidPath {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        if path.is_empty() {
            return Err(invalid("path is empty"));
        }
        if path.len() > Self::MAX_PATH_LENGTH {
            return Err(invalid("path too long"));
        }
        if path.chars().any(|c| c.is_control()) {
            return Err(invalid("path contains control characters"));
        }

        let mut segments = Vec::new();
        for part in path.split('.') {
            if part.is_empty() {
                return Err(invalid("empty segment"));
            }

            let (key, mut rest) = match part.find('[') {
                Some(pos) => (&part[..pos], &part[pos..]),
                None => (part, ""),
            };
            if key.contains(']') {
                return Err(invalid("unbalanced ']'"));
            }
            if !key.is_empty() {
                segments.push(PathSegment::Key(key.to_string()));
            }

            while !rest.is_empty() {
                if !rest.starts_with('[') {
                    return Err(invalid("unexpected characters after index"));
                }
                let close = rest.find(']').ok_or_else(|| invalid("unclosed '['"))?;
                let digits = &rest[1..close];
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid("array index must be a non-negative integer"));
                }
                let index = digits
                    .parse::<usize>()
                    .map_err(|_| invalid("array index out of range"))?;
                segments.push(PathSegment::Index(index));
                rest = &rest[close + 1..];
            }
        }

        Ok(Self {
            raw: path.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Path without its first segment, if the first segment is the given key.
    pub fn strip_prefix(&self, prefix: &str) -> Option<FieldPath> {
        match self.segments.first() {
            Some(PathSegment::Key(k)) if k == prefix && self.segments.len() > 1 => {
                let raw = self.raw[prefix.len()..].trim_start_matches('.').to_string();
                Some(FieldPath {
                    raw,
                    segments: self.segments[1..].to_vec(),
                })
            }
            _ => None,
        }
    }

    /// Single-key path (no dots, no indices), if that is what this is.
    pub fn single_key(&self) -> Option<&str> {
        match self.segments.as_slice() {
            [PathSegment::Key(k)] => Some(k),
            _ => None,
        }
    }

    /// Child path for a map key, in profiler notation.
    pub fn child_key(parent: &str, key: &str) -> String {
        if parent.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", parent, key)
        }
    }

    /// Whether `key` can appear as a single path segment.
    pub fn is_addressable_key(key: &str) -> bool {
        !key.is_empty()
            && !key.contains(&['.', '[', ']'][..])
            && !key.chars().any(|c| c.is_control())
    }

    /// Child path for an array element, in profiler notation.
    pub fn child_index(parent: &str, index: usize) -> String {
        format!("{}[{}]", parent, index)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
