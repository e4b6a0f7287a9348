//! Resource timing port.
//!
//! # Data Flow
//! ```text
//! transport records an entry under the tagged URL
//!     → TimingSource::entries_by_name(url)
//!     → lookup() collapses the optional port into a TimingLookup
//!     → classifier derives the timing breakdown
//! ```
//!
//! # Design Decisions
//! - Presence of the port is itself the feature switch: registries built
//!   without one never tag URLs and classify slow requests by wall clock
//! - Lookups take the first entry recorded under a name, as tags make names
//!   unique per request

use std::sync::Arc;

use dashmap::DashMap;

/// One resource timing entry, timestamps in milliseconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceTimingEntry {
    pub name: String,
    pub encoded_body_size: u64,
    pub decoded_body_size: u64,
    pub next_hop_protocol: String,
    pub redirect_start: f64,
    pub redirect_end: f64,
    pub domain_lookup_start: f64,
    pub domain_lookup_end: f64,
    pub connect_start: f64,
    pub connect_end: f64,
    pub request_start: f64,
    pub response_start: f64,
    pub response_end: f64,
    pub duration: f64,
}

impl ResourceTimingEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Query surface returning timing entries by resource name.
pub trait TimingSource: Send + Sync {
    fn entries_by_name(&self, name: &str) -> Vec<ResourceTimingEntry>;
}

/// Result of asking the (optional) timing port about one resource.
#[derive(Debug, Clone, PartialEq)]
pub enum TimingLookup {
    Entry(ResourceTimingEntry),
    NoEntry,
    Unavailable,
}

/// Query `source` for `name`, folding port absence into the result.
pub fn lookup(source: Option<&dyn TimingSource>, name: &str) -> TimingLookup {
    match source {
        None => TimingLookup::Unavailable,
        Some(source) => source
            .entries_by_name(name)
            .into_iter()
            .next()
            .map(TimingLookup::Entry)
            .unwrap_or(TimingLookup::NoEntry),
    }
}

/// Thread-safe in-process timeline.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTimeline {
    entries: Arc<DashMap<String, Vec<ResourceTimingEntry>>>,
}

impl InMemoryTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: ResourceTimingEntry) {
        self.entries.entry(entry.name.clone()).or_default().push(entry);
    }

    /// Total number of entries across all names.
    pub fn len(&self) -> usize {
        self.entries.iter().map(|r| r.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry recorded under `name`, returning how many there were.
    pub fn remove(&self, name: &str) -> usize {
        self.entries.remove(name).map(|(_, v)| v.len()).unwrap_or(0)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl TimingSource for InMemoryTimeline {
    fn entries_by_name(&self, name: &str) -> Vec<ResourceTimingEntry> {
        self.entries
            .get(name)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }
}
