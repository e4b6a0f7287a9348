//! Timing breakdown derived from a resource timing entry.

use serde::Serialize;

use crate::timeline::ResourceTimingEntry;

/// Decimal places kept for every timing figure.
pub const TIMING_PRECISION: i32 = 3;

/// Rounds `value` to `digits` decimal places.
///
/// Exact halves round towards positive infinity, and a negative value that
/// rounds to zero keeps its sign: `round(-0.0005, 3)` is `-0.0`.
pub fn round(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    let scaled = value * factor;
    let floor = scaled.floor();
    let rounded = if scaled - floor >= 0.5 { floor + 1.0 } else { floor };
    if rounded == 0.0 && value.is_sign_negative() {
        return -0.0;
    }
    rounded / factor
}

/// Durations in milliseconds, each rounded to [`TIMING_PRECISION`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimingBreakdown {
    pub redirect: f64,
    pub dns: f64,
    pub conn: f64,
    pub ttfb: f64,
    pub download: f64,
    pub duration: f64,
}

/// Transfer and timing details attached to slow events.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceData {
    pub encoded_body_size: u64,
    pub decoded_body_size: u64,
    pub next_hop_protocol: String,
    pub timing: TimingBreakdown,
}

impl From<&ResourceTimingEntry> for TimingBreakdown {
    fn from(entry: &ResourceTimingEntry) -> Self {
        let r = |v: f64| round(v, TIMING_PRECISION);
        Self {
            redirect: r(entry.redirect_end - entry.redirect_start),
            dns: r(entry.domain_lookup_end - entry.domain_lookup_start),
            conn: r(entry.connect_end - entry.connect_start),
            ttfb: r(entry.response_start - entry.request_start),
            download: r(entry.response_end - entry.response_start),
            duration: r(entry.duration),
        }
    }
}

impl From<&ResourceTimingEntry> for PerformanceData {
    fn from(entry: &ResourceTimingEntry) -> Self {
        Self {
            encoded_body_size: entry.encoded_body_size,
            decoded_body_size: entry.decoded_body_size,
            next_hop_protocol: entry.next_hop_protocol.clone(),
            timing: TimingBreakdown::from(entry),
        }
    }
}
