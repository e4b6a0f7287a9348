//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! registry / classifier / prober produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//! ```

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
