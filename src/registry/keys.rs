//! Correlation keys, disambiguation tags and the clock that mints them.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of millisecond timestamps used to mint keys and tags.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// Wall clock in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Identifies one in-flight request in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey(pub u64);

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Value carried in the dispatched URL so a timing entry can be matched
/// back to exactly one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestTag(pub u64);

impl fmt::Display for RequestTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mints strictly increasing values from a millisecond clock.
///
/// Two calls within the same millisecond would read the same clock value;
/// the minter bumps the second one past the last value handed out, so a
/// value is never issued twice for the lifetime of the minter.
#[derive(Debug, Default)]
pub struct Minter {
    last: AtomicU64,
}

impl Minter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self, clock: &dyn Clock) -> u64 {
        let now = clock.now_millis();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(prev + 1);
            match self.last.compare_exchange_weak(
                prev,
                candidate,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(x) => prev = x,
            }
        }
    }
}
