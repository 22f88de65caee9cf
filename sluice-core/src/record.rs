use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One fetched queue message as handed to the engine.
///
/// Owned by the caller; the engines only ever borrow it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    /// Enqueue time, epoch millis
    #[serde(default)]
    pub timestamp: i64,
    /// Byte-size estimate supplied by the broker, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Application properties
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub body: Value,
}

impl Record {
    /// Top-level names that resolve to record metadata instead of payload fields
    pub const RESERVED_FIELDS: [&'static str; 5] =
        ["messageId", "timestamp", "size", "subject", "contentType"];

    pub fn new(id: impl Into<String>, body: Value) -> Self {
        Self {
            id: id.into(),
            timestamp: 0,
            size: None,
            subject: None,
            content_type: None,
            properties: Map::new(),
            body,
        }
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Broker-supplied size, else the serialized body length.
    pub fn size_estimate(&self) -> u64 {
        match self.size {
            Some(size) => size,
            None => approximate_size(&self.body),
        }
    }

    /// Value of a reserved metadata field.
    pub fn reserved_field(&self, name: &str) -> Option<Value> {
        match name {
            "messageId" => Some(Value::String(self.id.clone())),
            "timestamp" => Some(Value::from(self.timestamp)),
            "size" => Some(Value::from(self.size_estimate())),
            "subject" => Some(self.subject.clone().map(Value::String).unwrap_or(Value::Null)),
            "contentType" => Some(
                self.content_type
                    .clone()
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            ),
            _ => None,
        }
    }

    /// Message type used for analytics grouping.
    ///
    /// `subject`, then `properties.messageType`, `properties.type`, `body.type`.
    pub fn message_type(&self) -> String {
        if let Some(subject) = self.subject.as_deref().filter(|s| !s.is_empty()) {
            return subject.to_string();
        }
        let candidates = [
            self.properties.get("messageType"),
            self.properties.get("type"),
            self.body.get("type"),
        ];
        candidates
            .into_iter()
            .flatten()
            .find_map(|v| v.as_str().filter(|s| !s.is_empty()))
            .unwrap_or("unknown")
            .to_string()
    }
}

/// Serialized-size approximation without serializing.
pub fn approximate_size(value: &Value) -> u64 {
    match value {
        Value::Null => 4,
        Value::Bool(b) => {
            if *b {
                4
            } else {
                5
            }
        }
        Value::Number(n) => n.to_string().len() as u64,
        Value::String(s) => s.len() as u64 + 2,
        Value::Array(items) => {
            let commas = items.len().saturating_sub(1) as u64;
            2 + commas + items.iter().map(approximate_size).sum::<u64>()
        }
        Value::Object(map) => {
            let commas = map.len().saturating_sub(1) as u64;
            2 + commas
                + map
                    .iter()
                    .map(|(k, v)| k.len() as u64 + 3 + approximate_size(v))
                    .sum::<u64>()
        }
    }
}
