use std::sync::{Arc, Mutex};

use tracing::Level;

use super::severity::{LogEntry, Severity};

/// Destination for finished log entries.
///
/// Implementations must not panic on arbitrary field values.
pub trait LogSink: Send + Sync {
    fn emit(&self, entry: &LogEntry);
}

/// Forwards entries to the `tracing` subscriber, one event per entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

macro_rules! emit_event {
    ($level:expr, $entry:expr) => {
        tracing::event!(
            $level,
            request_id = %$entry.request_id,
            client_ip = %$entry.client_ip,
            method = %$entry.method,
            path = %$entry.path,
            params = $entry.params.as_deref(),
            status = $entry.status,
            status_text = %$entry.status_text,
            tier = %$entry.tier,
            request_body = $entry.request_body.as_deref(),
            response_body = $entry.response_body.as_deref(),
            unexpected_status = $entry.unexpected_status,
            "{}",
            $entry.message
        )
    };
}

impl LogSink for TracingSink {
    fn emit(&self, entry: &LogEntry) {
        match entry.severity {
            Severity::Trace => emit_event!(Level::TRACE, entry),
            Severity::Info => emit_event!(Level::INFO, entry),
            Severity::Warn => emit_event!(Level::WARN, entry),
            Severity::Error => emit_event!(Level::ERROR, entry),
        }
    }
}

/// Keeps every entry in memory. Handy in tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl LogSink for MemorySink {
    fn emit(&self, entry: &LogEntry) {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.push(entry.clone());
    }
}
