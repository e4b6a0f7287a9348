//! Request registry.
//!
//! # Data Flow
//! ```text
//! create()                 → fresh RequestRecord under a unique key
//!     → set_request_info() (+ disambiguation tag when timing is enabled)
//!     → build_url()        → tagged URL for the transport
//!     → set_start_time() / set_end_time()
//!     → set_response_info()
//!         → classifier::classify_and_report()
//!         → record removed, default slow threshold reset
//! ```
//!
//! # Design Decisions
//! - The registry is a service object; each instance owns its own map and
//!   default threshold, so independent instances never interfere
//! - Operations on unknown keys are no-ops, never errors
//! - A record is removed from the map before it is classified, so a
//!   reporter that calls back into the registry cannot observe or deadlock
//!   on it
//! - A default-threshold override applies to records created after it and
//!   lasts until the next record is discarded

pub mod keys;
pub mod record;
pub mod tagging;

pub use keys::{Clock, Minter, RequestKey, RequestTag, SystemClock};
pub use record::{
    Headers, RequestInfo, RequestRecord, ResponseInfo, ResponseStatus, StatusValidator,
};
pub use tagging::DEFAULT_TAG_PARAM;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::classifier::{self, EventKind};
use crate::config::TrackerConfig;
use crate::observability::metrics;
use crate::reporter::{NoopReporter, Reporter, DEFAULT_CATEGORY};
use crate::timeline::TimingSource;

/// Built-in default slow threshold in milliseconds.
pub const DEFAULT_SLOW_THRESHOLD_MS: u64 = 400;

/// Tracks in-flight requests from creation to classification.
pub struct RequestRegistry {
    records: DashMap<RequestKey, RequestRecord>,
    /// Current default threshold picked up by new records.
    default_threshold: AtomicU64,
    /// Value the default threshold returns to after every discard.
    baseline_threshold: u64,
    keys: Minter,
    tags: Minter,
    clock: Arc<dyn Clock>,
    timings: Option<Arc<dyn TimingSource>>,
    reporter: Arc<dyn Reporter>,
    tag_param: String,
    category: String,
}

impl RequestRegistry {
    /// Registry with no timing port and a no-op reporter.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Allocate a record and return its key.
    pub fn create(&self) -> RequestKey {
        let slow_threshold_ms = self.default_threshold.load(Ordering::Relaxed);
        loop {
            let key = RequestKey(self.keys.next(self.clock.as_ref()));
            let inserted = match self.records.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(RequestRecord::new(key, slow_threshold_ms));
                    true
                }
                Entry::Occupied(_) => false,
            };
            if inserted {
                metrics::record_created();
                metrics::set_in_flight(self.records.len());
                tracing::trace!(key = %key, slow_threshold_ms, "Request record created");
                return key;
            }
        }
    }

    /// Store request metadata; tags the record when timing is enabled.
    pub fn set_request_info(&self, key: RequestKey, info: RequestInfo) {
        let Some(mut record) = self.records.get_mut(&key) else {
            tracing::debug!(key = %key, "set_request_info on unknown record");
            return;
        };
        record.request = info;
        if self.timings.is_some() {
            record.tag = Some(RequestTag(self.tags.next(self.clock.as_ref())));
        }
    }

    /// Return `url` with the record's tag appended, or `url` unchanged when
    /// the record is unknown or untagged.
    pub fn build_url(&self, key: RequestKey, url: &str) -> String {
        let Some(mut record) = self.records.get_mut(&key) else {
            return url.to_string();
        };
        let Some(tag) = record.tag else {
            return url.to_string();
        };
        let tagged = tagging::append_tag(url, &self.tag_param, tag);
        record.dispatched_url = Some(tagged.clone());
        tagged
    }

    pub fn set_start_time(&self, key: RequestKey, time: f64) {
        self.update(key, "set_start_time", |record| record.start_time = Some(time));
    }

    pub fn set_end_time(&self, key: RequestKey, time: f64) {
        self.update(key, "set_end_time", |record| record.end_time = Some(time));
    }

    /// Override the slow threshold of a single record.
    pub fn set_record_slow_threshold(&self, key: RequestKey, ms: u64) {
        self.update(key, "set_record_slow_threshold", |record| {
            record.slow_threshold_ms = ms
        });
    }

    /// Attach the response, classify, then discard the record.
    ///
    /// Returns the kind of event emitted, if any. The default threshold is
    /// reset even when `key` is unknown.
    pub fn set_response_info(&self, key: RequestKey, info: ResponseInfo) -> Option<EventKind> {
        let outcome = match self.records.remove(&key) {
            Some((_, mut record)) => {
                record.response = Some(info);
                let kind = classifier::classify_and_report(
                    &record,
                    self.timings.as_deref(),
                    self.reporter.as_ref(),
                    &self.category,
                );
                tracing::debug!(
                    key = %key,
                    url = %record.request.url,
                    outcome = kind.map(|k| k.as_str()).unwrap_or("none"),
                    "Request classified"
                );
                if let Some(kind) = kind {
                    metrics::record_event(kind);
                }
                metrics::record_discarded();
                kind
            }
            None => {
                tracing::debug!(key = %key, "set_response_info on unknown record");
                None
            }
        };
        self.discarded();
        outcome
    }

    /// Drop a record without classifying it.
    pub fn clear(&self, key: RequestKey) {
        if self.records.remove(&key).is_some() {
            tracing::trace!(key = %key, "Request record cleared");
            metrics::record_discarded();
        }
        self.discarded();
    }

    /// Reset the default threshold; runs whether or not a record was removed.
    fn discarded(&self) {
        self.default_threshold.store(self.baseline_threshold, Ordering::Relaxed);
        metrics::set_in_flight(self.records.len());
    }

    /// Current default slow threshold.
    pub fn slow_threshold(&self) -> u64 {
        self.default_threshold.load(Ordering::Relaxed)
    }

    /// Set the default slow threshold for records created from now on.
    /// Zero is ignored.
    pub fn set_slow_threshold(&self, ms: u64) {
        if ms == 0 {
            return;
        }
        self.default_threshold.store(ms, Ordering::Relaxed);
    }

    pub fn contains(&self, key: RequestKey) -> bool {
        self.records.contains_key(&key)
    }

    /// Copy of a live record.
    pub fn record(&self, key: RequestKey) -> Option<RequestRecord> {
        self.records.get(&key).map(|r| r.value().clone())
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether a timing port is installed.
    pub fn timing_enabled(&self) -> bool {
        self.timings.is_some()
    }

    pub fn tag_param(&self) -> &str {
        &self.tag_param
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    fn update(&self, key: RequestKey, op: &'static str, f: impl FnOnce(&mut RequestRecord)) {
        match self.records.get_mut(&key) {
            Some(mut record) => f(record.value_mut()),
            None => tracing::debug!(key = %key, op, "Operation on unknown record"),
        }
    }
}

impl Default for RequestRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RequestRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestRegistry")
            .field("live_records", &self.records.len())
            .field("default_threshold", &self.slow_threshold())
            .field("timing_enabled", &self.timing_enabled())
            .field("tag_param", &self.tag_param)
            .field("category", &self.category)
            .finish()
    }
}

/// Builder for [`RequestRegistry`].
pub struct RegistryBuilder {
    default_threshold: u64,
    clock: Arc<dyn Clock>,
    timings: Option<Arc<dyn TimingSource>>,
    timing_enabled: bool,
    reporter: Arc<dyn Reporter>,
    tag_param: String,
    category: String,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self {
            default_threshold: DEFAULT_SLOW_THRESHOLD_MS,
            clock: Arc::new(SystemClock),
            timings: None,
            timing_enabled: true,
            reporter: Arc::new(NoopReporter),
            tag_param: DEFAULT_TAG_PARAM.to_string(),
            category: DEFAULT_CATEGORY.to_string(),
        }
    }
}

impl RegistryBuilder {
    /// Apply tracker settings from configuration.
    ///
    /// `timing_enabled = false` drops any installed timing port at build
    /// time; `true` does not install one.
    pub fn config(mut self, config: &TrackerConfig) -> Self {
        self.default_threshold = config.default_slow_threshold_ms;
        self.tag_param = config.tag_param.clone();
        self.category = config.event_category.clone();
        self.timing_enabled = config.timing_enabled;
        self
    }

    pub fn default_threshold(mut self, ms: u64) -> Self {
        self.default_threshold = ms;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn timing_source(mut self, source: Arc<dyn TimingSource>) -> Self {
        self.timings = Some(source);
        self
    }

    pub fn reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn tag_param(mut self, param: impl Into<String>) -> Self {
        self.tag_param = param.into();
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn build(self) -> RequestRegistry {
        RequestRegistry {
            records: DashMap::new(),
            default_threshold: AtomicU64::new(self.default_threshold),
            baseline_threshold: self.default_threshold,
            keys: Minter::new(),
            tags: Minter::new(),
            clock: self.clock,
            timings: self.timings.filter(|_| self.timing_enabled),
            reporter: self.reporter,
            tag_param: self.tag_param,
            category: self.category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::MemoryReporter;
    use crate::timeline::{InMemoryTimeline, ResourceTimingEntry};
    use std::collections::HashSet;
    use std::sync::atomic::AtomicU64;

    /// Clock stuck on one millisecond, the worst case for key collisions.
    struct FrozenClock(AtomicU64);

    impl Clock for FrozenClock {
        fn now_millis(&self) -> u64 {
            self.0.load(Ordering::Relaxed)
        }
    }

    fn frozen() -> Arc<dyn Clock> {
        Arc::new(FrozenClock(AtomicU64::new(1_000)))
    }

    fn with_reporter(timing: bool) -> (RequestRegistry, MemoryReporter, InMemoryTimeline) {
        let reporter = MemoryReporter::new();
        let timeline = InMemoryTimeline::new();
        let mut builder = RequestRegistry::builder()
            .clock(frozen())
            .reporter(Arc::new(reporter.clone()));
        if timing {
            builder = builder.timing_source(Arc::new(timeline.clone()));
        }
        (builder.build(), reporter, timeline)
    }

    #[test]
    fn test_keys_unique_among_live_records() {
        let registry = RequestRegistry::builder().clock(frozen()).build();
        let keys: Vec<_> = (0..100).map(|_| registry.create()).collect();
        let unique: HashSet<_> = keys.iter().copied().collect();
        assert_eq!(unique.len(), 100);
        assert_eq!(registry.len(), 100);
    }

    #[test]
    fn test_new_record_defaults() {
        let registry = RequestRegistry::new();
        let key = registry.create();
        let record = registry.record(key).unwrap();
        assert_eq!(record.key, key);
        assert_eq!(record.slow_threshold_ms, DEFAULT_SLOW_THRESHOLD_MS);
        assert!(record.tag.is_none());
        assert!(record.start_time.is_none());
        assert!(record.response.is_none());
    }

    #[test]
    fn test_tag_assigned_only_with_timing() {
        let (plain, _, _) = with_reporter(false);
        let key = plain.create();
        plain.set_request_info(key, RequestInfo::new("GET", "/a"));
        assert!(plain.record(key).unwrap().tag.is_none());
        assert_eq!(plain.build_url(key, "/a"), "/a");

        let (timed, _, _) = with_reporter(true);
        let key = timed.create();
        timed.set_request_info(key, RequestInfo::new("GET", "/a"));
        let tag = timed.record(key).unwrap().tag.unwrap();
        assert_eq!(timed.build_url(key, "/a"), format!("/a?_eareqid={tag}"));
        assert_eq!(timed.build_url(key, "/a?b=1"), format!("/a?b=1&_eareqid={tag}"));
    }

    #[test]
    fn test_identical_urls_get_distinct_tags() {
        let (registry, _, _) = with_reporter(true);
        let a = registry.create();
        let b = registry.create();
        registry.set_request_info(a, RequestInfo::new("GET", "/users/1"));
        registry.set_request_info(b, RequestInfo::new("PUT", "/users/1"));
        assert_ne!(registry.build_url(a, "/users/1"), registry.build_url(b, "/users/1"));
    }

    #[test]
    fn test_build_url_unknown_key_is_identity() {
        let registry = RequestRegistry::new();
        let key = RequestKey(42);
        assert_eq!(registry.build_url(key, "/x?y=1"), "/x?y=1");
        assert_eq!(registry.build_url(key, "/x?y=1"), "/x?y=1");
    }

    #[test]
    fn test_mutators_ignore_unknown_keys() {
        let registry = RequestRegistry::new();
        let ghost = RequestKey(7);
        registry.set_request_info(ghost, RequestInfo::new("GET", "/"));
        registry.set_start_time(ghost, 1.0);
        registry.set_end_time(ghost, 2.0);
        registry.set_record_slow_threshold(ghost, 10);
        assert!(registry.is_empty());
        assert_eq!(registry.set_response_info(ghost, ResponseInfo::timeout()), None);
    }

    #[test]
    fn test_mutators_update_record() {
        let registry = RequestRegistry::new();
        let key = registry.create();
        registry.set_start_time(key, 10.0);
        registry.set_end_time(key, 20.0);
        registry.set_record_slow_threshold(key, 1000);
        let record = registry.record(key).unwrap();
        assert_eq!(record.start_time, Some(10.0));
        assert_eq!(record.end_time, Some(20.0));
        assert_eq!(record.slow_threshold_ms, 1000);
    }

    #[test]
    fn test_response_deletes_record_and_resets_threshold() {
        let (registry, reporter, _) = with_reporter(false);
        registry.set_slow_threshold(50);
        let key = registry.create();
        assert_eq!(registry.record(key).unwrap().slow_threshold_ms, 50);

        registry.set_start_time(key, 0.0);
        registry.set_end_time(key, 10.0);
        let kind = registry.set_response_info(key, ResponseInfo::http(200));

        assert_eq!(kind, None);
        assert!(reporter.is_empty());
        assert!(!registry.contains(key));
        assert_eq!(registry.slow_threshold(), DEFAULT_SLOW_THRESHOLD_MS);
    }

    #[test]
    fn test_threshold_reset_even_after_event() {
        let (registry, reporter, _) = with_reporter(false);
        registry.set_slow_threshold(1);
        let key = registry.create();
        registry.set_response_info(key, ResponseInfo::network_error());
        assert_eq!(reporter.len(), 1);
        assert!(!registry.contains(key));
        assert_eq!(registry.slow_threshold(), 400);
    }

    #[test]
    fn test_threshold_override_visible_to_concurrent_records() {
        let registry = RequestRegistry::new();
        registry.set_slow_threshold(900);
        let first = registry.create();
        let second = registry.create();
        registry.clear(first);
        let third = registry.create();

        assert_eq!(registry.record(second).unwrap().slow_threshold_ms, 900);
        assert_eq!(registry.record(third).unwrap().slow_threshold_ms, 400);
    }

    #[test]
    fn test_zero_global_threshold_ignored() {
        let registry = RequestRegistry::new();
        registry.set_slow_threshold(800);
        registry.set_slow_threshold(0);
        assert_eq!(registry.slow_threshold(), 800);
    }

    #[test]
    fn test_clear_removes_without_reporting() {
        let (registry, reporter, _) = with_reporter(false);
        let key = registry.create();
        registry.set_start_time(key, 0.0);
        registry.set_end_time(key, 10_000.0);
        registry.clear(key);
        assert!(!registry.contains(key));
        assert!(reporter.is_empty());
    }

    #[test]
    fn test_slow_via_timeline_round_trip() {
        let (registry, reporter, timeline) = with_reporter(true);
        let key = registry.create();
        registry.set_request_info(key, RequestInfo::new("POST", "/orders"));
        let url = registry.build_url(key, "/orders");

        let mut entry = ResourceTimingEntry::new(url.clone());
        entry.duration = 750.0;
        timeline.record(entry);

        registry.set_start_time(key, 0.0);
        registry.set_end_time(key, 1.0);
        let kind = registry.set_response_info(key, ResponseInfo::http(201).with_response_url(url));

        assert_eq!(kind, Some(EventKind::Slow));
        let events = reporter.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, DEFAULT_CATEGORY);
        assert_eq!(events[0].1.request_time_ms, Some(750.0));
        assert!(events[0].1.performance.is_some());
    }

    #[test]
    fn test_builder_applies_config() {
        let config = TrackerConfig {
            default_slow_threshold_ms: 250,
            tag_param: "rid".into(),
            event_category: "apiWatch".into(),
            timing_enabled: false,
        };
        let registry = RequestRegistry::builder()
            .timing_source(Arc::new(InMemoryTimeline::new()))
            .config(&config)
            .build();

        assert_eq!(registry.slow_threshold(), 250);
        assert_eq!(registry.tag_param(), "rid");
        assert_eq!(registry.category(), "apiWatch");
        assert!(!registry.timing_enabled());

        registry.set_slow_threshold(999);
        registry.clear(RequestKey(1));
        assert_eq!(registry.slow_threshold(), 250);
    }

    #[test]
    fn test_discarded_counter_ignores_unknown_keys() {
        let (registry, _, _) = with_reporter(false);
        let counters = metrics::capture_counters(|| {
            registry.set_slow_threshold(50);
            registry.set_response_info(RequestKey(7), ResponseInfo::http(200));
            registry.clear(RequestKey(8));

            let key = registry.create();
            registry.set_response_info(key, ResponseInfo::http(200));
            let key = registry.create();
            registry.clear(key);
        });

        assert_eq!(metrics::counter(&counters, "api_monitor_records_discarded_total"), 2);
        assert_eq!(metrics::counter(&counters, "api_monitor_records_created_total"), 2);
        assert_eq!(registry.slow_threshold(), DEFAULT_SLOW_THRESHOLD_MS);
    }
}
