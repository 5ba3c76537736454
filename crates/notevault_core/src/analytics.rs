//! Bounded in-process analytics event log.
//!
//! # Responsibility
//! - Append timestamped mutation events with JSON properties.
//! - Evict the oldest events once capacity is reached.
//!
//! # Invariants
//! - `record` never fails and never panics; invalid events are dropped.
//! - `len() <= capacity()` at all times.

use crate::clock::now_ms;
use log::debug;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::VecDeque;

/// One recorded event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    pub name: String,
    pub properties: Map<String, Value>,
    /// Epoch milliseconds.
    pub recorded_at: i64,
}

/// FIFO ring of analytics events.
#[derive(Debug, Clone)]
pub struct AnalyticsRecorder {
    events: VecDeque<AnalyticsEvent>,
    capacity: usize,
}

impl AnalyticsRecorder {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
        }
    }

    /// Appends an event. Non-object `properties` are wrapped as `{"value": ...}`.
    pub fn record(&mut self, name: &str, properties: Value) {
        let name = name.trim();
        if name.is_empty() {
            debug!("event=analytics_record module=analytics status=dropped reason=blank_name");
            return;
        }
        if self.capacity == 0 {
            debug!("event=analytics_record module=analytics status=dropped reason=zero_capacity name={name}");
            return;
        }

        let properties = match properties {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };

        while self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(AnalyticsEvent {
            name: name.to_string(),
            properties,
            recorded_at: now_ms(),
        });
    }

    /// Events oldest first.
    pub fn events(&self) -> impl Iterator<Item = &AnalyticsEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn count_by_name(&self, name: &str) -> usize {
        self.events.iter().filter(|event| event.name == name).count()
    }
}

impl Default for AnalyticsRecorder {
    fn default() -> Self {
        Self::with_capacity(crate::config::DEFAULT_ANALYTICS_CAPACITY)
    }
}
