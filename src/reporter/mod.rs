//! Diagnostic reporters.
//!
//! # Responsibilities
//! - Accept classified events as fire-and-forget
//! - Never fail the caller: a reporter that cannot deliver drops the event
//!
//! # Design Decisions
//! - Absence of a sink is modelled by `NoopReporter`, not by an `Option`
//! - Any `Fn(&str, &ApiEvent)` closure is a reporter

use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::classifier::ApiEvent;

/// Default event category.
pub const DEFAULT_CATEGORY: &str = "apiMonitor";

/// Sink for classified events.
pub trait Reporter: Send + Sync {
    fn emit(&self, category: &str, event: &ApiEvent);
}

impl<F> Reporter for F
where
    F: Fn(&str, &ApiEvent) + Send + Sync,
{
    fn emit(&self, category: &str, event: &ApiEvent) {
        self(category, event)
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl Reporter for NoopReporter {
    fn emit(&self, _category: &str, _event: &ApiEvent) {}
}

/// Logs events as structured `tracing` records.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn emit(&self, category: &str, event: &ApiEvent) {
        let payload = serde_json::to_string(event).unwrap_or_default();
        tracing::info!(
            target: "api_monitor::events",
            category = %category,
            kind = event.kind.as_str(),
            code = event.code,
            method = %event.request.method,
            url = %event.request.url,
            request_time_ms = ?event.request_time_ms,
            payload = %payload,
            "{}",
            event.label
        );
    }
}

/// Writes one JSON object per event to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLinesReporter;

impl JsonLinesReporter {
    /// Write one event as a single JSON line.
    pub fn write_line(
        out: &mut impl Write,
        category: &str,
        event: &ApiEvent,
    ) -> std::io::Result<()> {
        let line = serde_json::json!({ "category": category, "event": event });
        writeln!(out, "{line}")
    }
}

impl Reporter for JsonLinesReporter {
    fn emit(&self, category: &str, event: &ApiEvent) {
        let mut out = std::io::stdout().lock();
        if let Err(e) = Self::write_line(&mut out, category, event) {
            tracing::warn!(error = %e, "Failed to write event");
        }
    }
}

/// Keeps every event in memory; useful for inspection and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryReporter {
    events: Arc<Mutex<Vec<(String, ApiEvent)>>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far.
    pub fn events(&self) -> Vec<(String, ApiEvent)> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn take(&self) -> Vec<(String, ApiEvent)> {
        self.events
            .lock()
            .map(|mut events| std::mem::take(&mut *events))
            .unwrap_or_default()
    }
}

impl Reporter for MemoryReporter {
    fn emit(&self, category: &str, event: &ApiEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push((category.to_string(), event.clone()));
        }
    }
}
