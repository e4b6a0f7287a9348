//! Request tracking counters.
//!
//! # Metrics
//! - `api_monitor_records_created_total` (counter): records allocated
//! - `api_monitor_records_discarded_total` (counter): records classified or cleared
//! - `api_monitor_events_total` (counter): emitted events by kind
//! - `api_monitor_in_flight` (gauge): live records in the registry
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; without an installed recorder
//!   every call is a no-op
//! - No exporter is bundled; embedding applications choose their own

use crate::classifier::EventKind;

pub fn record_created() {
    metrics::counter!("api_monitor_records_created_total").increment(1);
}

pub fn record_discarded() {
    metrics::counter!("api_monitor_records_discarded_total").increment(1);
}

pub fn record_event(kind: EventKind) {
    metrics::counter!("api_monitor_events_total", "kind" => kind.as_str()).increment(1);
}

pub fn set_in_flight(count: usize) {
    metrics::gauge!("api_monitor_in_flight").set(count as f64);
}

/// Run `f` against a debugging recorder and return every counter it touched
/// as `(name, labels, value)`.
#[cfg(test)]
pub(crate) fn capture_counters(f: impl FnOnce()) -> Vec<(String, Vec<(String, String)>, u64)> {
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};

    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    ::metrics::with_local_recorder(&recorder, f);

    snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .filter_map(|(key, _, _, value)| match value {
            DebugValue::Counter(count) => {
                let key = key.key();
                let labels = key
                    .labels()
                    .map(|l| (l.key().to_string(), l.value().to_string()))
                    .collect();
                Some((key.name().to_string(), labels, count))
            }
            _ => None,
        })
        .collect()
}

#[cfg(test)]
pub(crate) fn counter(
    counters: &[(String, Vec<(String, String)>, u64)],
    name: &str,
) -> u64 {
    counters
        .iter()
        .filter(|(n, _, _)| n == name)
        .map(|(_, _, v)| *v)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_event_labels_kind() {
        let counters = capture_counters(|| {
            record_event(EventKind::Slow);
            record_event(EventKind::Slow);
            record_event(EventKind::Timeout);
        });

        let by_kind = |kind: &str| {
            counters
                .iter()
                .find(|(name, labels, _)| {
                    name == "api_monitor_events_total"
                        && labels.iter().any(|(k, v)| k == "kind" && v == kind)
                })
                .map(|(_, _, v)| *v)
        };
        assert_eq!(by_kind("slow"), Some(2));
        assert_eq!(by_kind("timeout"), Some(1));
        assert_eq!(by_kind("error"), None);
    }

    #[test]
    fn test_created_and_discarded_counters() {
        let counters = capture_counters(|| {
            record_created();
            record_created();
            record_discarded();
        });
        assert_eq!(counter(&counters, "api_monitor_records_created_total"), 2);
        assert_eq!(counter(&counters, "api_monitor_records_discarded_total"), 1);
    }
}
