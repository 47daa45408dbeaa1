//! In-memory logging: bounded ring buffer plus the tracing layer that
//! feeds it
//!
//! The buffer is the only log store this service keeps; `/api/logs` reads
//! it back. Oldest entries are evicted once capacity is reached. Appends
//! are mutex-guarded, so concurrent passes and request handlers can log
//! without interleaving corruption.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

pub const LOG_BUFFER_CAPACITY: usize = 500;

/// One captured log line
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub target: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<JsonValue>,
}

/// Shared bounded log store
#[derive(Clone)]
pub struct LogBuffer {
    inner: Arc<Mutex<VecDeque<LogEntry>>>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn push(&self, entry: LogEntry) {
        let mut buffer = self.inner.lock();
        if buffer.len() == self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(entry);
    }

    /// Snapshot of the current contents, oldest first
    pub fn entries(&self) -> Vec<LogEntry> {
        self.inner.lock().iter().cloned().collect()
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(LOG_BUFFER_CAPACITY)
    }
}

/// Tracing layer that appends events to the ring buffer
pub struct RingBufferLayer {
    min_level: Level,
    buffer: LogBuffer,
}

impl RingBufferLayer {
    pub fn new(min_level: Level, buffer: LogBuffer) -> Self {
        Self { min_level, buffer }
    }
}

struct FieldVisitor {
    fields: HashMap<String, JsonValue>,
    message: Option<String>,
}

impl FieldVisitor {
    fn new() -> Self {
        Self {
            fields: HashMap::new(),
            message: None,
        }
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let value_str = format!("{:?}", value);
        if field.name() == "message" {
            self.message = Some(value_str);
        } else {
            self.fields
                .insert(field.name().to_string(), JsonValue::String(value_str));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.insert(
                field.name().to_string(),
                JsonValue::String(value.to_string()),
            );
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields
            .insert(field.name().to_string(), JsonValue::Number(value.into()));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields
            .insert(field.name().to_string(), JsonValue::Number(value.into()));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields
            .insert(field.name().to_string(), JsonValue::Bool(value));
    }
}

impl<S> Layer<S> for RingBufferLayer
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = *event.metadata().level();
        if level > self.min_level {
            return;
        }

        let mut visitor = FieldVisitor::new();
        event.record(&mut visitor);

        let fields = if visitor.fields.is_empty() {
            None
        } else {
            serde_json::to_value(&visitor.fields).ok()
        };

        self.buffer.push(LogEntry {
            time: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            level: level.as_str().to_uppercase(),
            target: event.metadata().target().to_string(),
            message: visitor.message.unwrap_or_default(),
            fields,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(message: &str) -> LogEntry {
        LogEntry {
            time: "2024-01-01 00:00:00".to_string(),
            level: "INFO".to_string(),
            target: "test".to_string(),
            message: message.to_string(),
            fields: None,
        }
    }

    #[test]
    fn test_buffer_evicts_oldest_past_capacity() {
        let buffer = LogBuffer::new(3);
        for i in 0..5 {
            buffer.push(entry(&format!("line {i}")));
        }

        let entries = buffer.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].message, "line 2");
        assert_eq!(entries[2].message, "line 4");
    }

    #[test]
    fn test_buffer_is_shared_across_clones() {
        let buffer = LogBuffer::new(10);
        let clone = buffer.clone();
        clone.push(entry("from clone"));

        assert_eq!(buffer.entries().len(), 1);
    }
}
