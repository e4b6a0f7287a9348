//! Request monitoring library.
//!
//! Tracks outgoing requests from creation to completion and classifies each
//! completed request as an error, a timeout, a server error or a slow
//! response, handing at most one event per request to a reporter.

pub mod classifier;
pub mod config;
pub mod observability;
pub mod probe;
pub mod registry;
pub mod reporter;
pub mod timeline;

pub use classifier::{ApiEvent, EventKind};
pub use config::MonitorConfig;
pub use probe::{ProbeOutcome, ProbeTarget, Prober};
pub use registry::{RequestInfo, RequestKey, RequestRegistry, ResponseInfo, ResponseStatus};
pub use reporter::Reporter;
pub use timeline::{InMemoryTimeline, TimingSource};
