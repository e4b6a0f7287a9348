//! Request classification.
//!
//! # Data Flow
//! ```text
//! completed RequestRecord
//!     → status outcome (network error / timeout / HTTP status)
//!     → status validator
//!     → elapsed time vs. slow threshold (timing entry or wall clock)
//!     → at most one ApiEvent
//!     → Reporter::emit
//! ```
//!
//! # Design Decisions
//! - Classification only reads the record; the registry owns deletion
//! - A timing port that has no entry for the request suppresses the slow
//!   check instead of falling back to the wall clock
//! - Slow means strictly above the threshold; a NaN time is never slow

pub mod event;
pub mod timing;

pub use event::{ApiEvent, EventKind, RequestSummary, ResponseSummary};
pub use timing::{round, PerformanceData, TimingBreakdown};

use crate::registry::{RequestRecord, ResponseStatus};
use crate::reporter::Reporter;
use crate::timeline::{self, TimingLookup, TimingSource};

/// Decide which event, if any, a completed record produces.
pub fn classify(record: &RequestRecord, timings: Option<&dyn TimingSource>) -> Option<ApiEvent> {
    let response = record.response.as_ref()?;
    let request = &record.request;

    match response.status {
        ResponseStatus::NetworkError => {
            Some(ApiEvent::new(EventKind::Error, response.status.code(), request))
        }
        ResponseStatus::Timeout => {
            Some(ApiEvent::new(EventKind::Timeout, response.status.code(), request))
        }
        ResponseStatus::Http(status) if !response.is_valid_status(status) => Some(
            ApiEvent::new(EventKind::ServerError, status, request)
                .with_response(status, &response.headers),
        ),
        ResponseStatus::Http(status) => {
            let threshold = record.slow_threshold_ms;
            let name = response
                .response_url
                .as_deref()
                .or(record.dispatched_url.as_deref())
                .unwrap_or_default();

            match timeline::lookup(timings, name) {
                TimingLookup::Entry(entry) => {
                    let performance = PerformanceData::from(&entry);
                    let duration = performance.timing.duration;
                    (duration > threshold as f64).then(|| {
                        let mut event = ApiEvent::new(EventKind::Slow, status, request)
                            .with_response(status, &response.headers)
                            .with_timing(duration, threshold);
                        event.performance = Some(performance);
                        event
                    })
                }
                TimingLookup::NoEntry => {
                    tracing::debug!(key = %record.key, name = %name, "No timing entry for request");
                    None
                }
                TimingLookup::Unavailable => {
                    let elapsed = record.elapsed_ms()?;
                    (elapsed > threshold as f64).then(|| {
                        ApiEvent::new(EventKind::Slow, status, request)
                            .with_response(status, &response.headers)
                            .with_timing(elapsed, threshold)
                    })
                }
            }
        }
    }
}

/// Classify `record` and hand the resulting event, if any, to `reporter`.
pub fn classify_and_report(
    record: &RequestRecord,
    timings: Option<&dyn TimingSource>,
    reporter: &dyn Reporter,
    category: &str,
) -> Option<EventKind> {
    let event = classify(record, timings)?;
    reporter.emit(category, &event);
    Some(event.kind)
}
