//! The JSON success envelope.
//!
//! Every JSON endpoint answers with `{"data": ..., "meta": {"serverTime": ...}}`.
//! Handlers may add further `meta` entries (pagination, for example).

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Success envelope wrapping a payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// The payload.
    pub data: Value,
    /// Response metadata; always contains `serverTime`.
    pub meta: Map<String, Value>,
}

impl Envelope {
    /// Wraps `data`, stamping `serverTime` with the current time.
    #[must_use]
    pub fn new(data: Value) -> Self {
        Self::at(data, Utc::now())
    }

    /// Wraps `data` with an explicit server time.
    #[must_use]
    pub fn at(data: Value, now: DateTime<Utc>) -> Self {
        let mut meta = Map::new();
        meta.insert(
            "serverTime".to_string(),
            Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        Self { data, meta }
    }

    /// Merges extra metadata; `serverTime` cannot be overridden.
    #[must_use]
    pub fn with_meta(mut self, extra: Map<String, Value>) -> Self {
        for (key, value) in extra {
            if key != "serverTime" {
                self.meta.insert(key, value);
            }
        }
        self
    }
}
