//! Custom tracing subscriber layers
//!
//! [`LogBufferLayer`] keeps the most recent events in memory so a host can
//! show them in a diagnostics view, and tests can assert on what was
//! logged without scraping stderr.

use chrono::{DateTime, Local};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{field::Visit, Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// A log entry stored in the buffer
#[derive(Clone, Debug)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: Level,
    /// Target module path
    pub target: String,
    pub message: String,
    /// Structured fields, in recording order
    pub fields: Vec<(String, String)>,
}

impl LogEntry {
    /// Look up a structured field by name
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: Vec<(String, String)>,
}

impl FieldVisitor {
    fn push(&mut self, field: &tracing::field::Field, value: String) {
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.fields.push((field.name().to_string(), value));
        }
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        self.push(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.push(field, value.to_string());
    }

    fn record_error(
        &mut self,
        field: &tracing::field::Field,
        value: &(dyn std::error::Error + 'static),
    ) {
        self.push(field, value.to_string());
    }
}

type SharedEntries = Arc<Mutex<VecDeque<LogEntry>>>;

/// Ring buffer layer holding the last `capacity` events
pub struct LogBufferLayer {
    buffer: SharedEntries,
    capacity: usize,
}

impl LogBufferLayer {
    pub fn new(capacity: usize) -> (Self, LogBuffer) {
        let buffer = Arc::new(Mutex::new(VecDeque::with_capacity(capacity)));
        let handle = LogBuffer {
            buffer: Arc::clone(&buffer),
        };
        (Self { buffer, capacity }, handle)
    }
}

impl<S> Layer<S> for LogBufferLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let entry = LogEntry {
            timestamp: Local::now(),
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message: visitor.message.unwrap_or_default(),
            fields: visitor.fields,
        };

        if let Ok(mut buffer) = self.buffer.lock() {
            if buffer.len() >= self.capacity {
                buffer.pop_front();
            }
            buffer.push_back(entry);
        }
    }
}

/// Read handle for a [`LogBufferLayer`]
#[derive(Clone)]
pub struct LogBuffer {
    buffer: SharedEntries,
}

impl fmt::Debug for LogBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogBuffer").field("entries", &self.len()).finish()
    }
}

impl LogBuffer {
    /// Snapshot of every buffered entry, oldest first
    pub fn entries(&self) -> Vec<LogEntry> {
        self.buffer
            .lock()
            .map(|guard| guard.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Entries at `level` or more severe
    pub fn at_least(&self, level: Level) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.level <= level)
            .collect()
    }

    /// Entries whose message contains `needle`
    pub fn matching(&self, needle: &str) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.message.contains(needle))
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.buffer.lock() {
            guard.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_buffer_records_message_and_fields() {
        let (layer, buffer) = LogBufferLayer::new(8);
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(task = "scan", steps = 3u64, "Background task failed");
        });

        let entries = buffer.at_least(Level::WARN);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "Background task failed");
        assert_eq!(entries[0].field("task"), Some("scan"));
        assert_eq!(entries[0].field("steps"), Some("3"));
    }

    #[test]
    fn test_buffer_drops_oldest_beyond_capacity() {
        let (layer, buffer) = LogBufferLayer::new(3);
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            for i in 0..5 {
                tracing::info!("message {i}");
            }
        });

        let messages: Vec<_> = buffer.entries().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["message 2", "message 3", "message 4"]);

        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_matching_and_level_filter() {
        let (layer, buffer) = LogBufferLayer::new(8);
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("Queue registered");
            tracing::error!("Queue vanished");
        });

        assert_eq!(buffer.matching("Queue").len(), 2);
        assert_eq!(buffer.at_least(Level::ERROR).len(), 1);
    }
}
