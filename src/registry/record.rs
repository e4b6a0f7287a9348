//! In-flight request records and the metadata attached to them.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::keys::{RequestKey, RequestTag};

/// Header name -> value, ordered so emitted payloads are stable.
pub type Headers = BTreeMap<String, String>;

/// Outcome of a request as reported by the transport.
///
/// Exactly one of the three applies: the request never produced a response
/// (network failure), it was abandoned on a deadline, or the server answered
/// with an HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    NetworkError,
    Timeout,
    Http(u16),
}

impl ResponseStatus {
    /// Numeric code carried in emitted events.
    pub fn code(&self) -> u16 {
        match self {
            ResponseStatus::Timeout => 1,
            ResponseStatus::NetworkError => 2,
            ResponseStatus::Http(status) => *status,
        }
    }
}

/// Predicate deciding whether an HTTP status counts as a valid response.
#[derive(Clone)]
pub struct StatusValidator(Arc<dyn Fn(u16) -> bool + Send + Sync>);

impl StatusValidator {
    pub fn new(f: impl Fn(u16) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Accepts statuses in `[low, high]`.
    pub fn range(low: u16, high: u16) -> Self {
        Self::new(move |status| (low..=high).contains(&status))
    }

    pub fn is_valid(&self, status: u16) -> bool {
        (self.0)(status)
    }
}

impl fmt::Debug for StatusValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StatusValidator(..)")
    }
}

/// Request metadata, set once before dispatch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RequestInfo {
    pub url: String,
    pub method: String,
    pub headers: Headers,
}

impl RequestInfo {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into().to_uppercase(),
            headers: Headers::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Response metadata, set once at completion.
#[derive(Debug, Clone)]
pub struct ResponseInfo {
    pub status: ResponseStatus,
    pub headers: Headers,
    /// `None` means every status is accepted.
    pub validator: Option<StatusValidator>,
    /// Final URL as seen by the transport, including the disambiguation tag.
    pub response_url: Option<String>,
}

impl ResponseInfo {
    pub fn network_error() -> Self {
        Self::with_status(ResponseStatus::NetworkError)
    }

    pub fn timeout() -> Self {
        Self::with_status(ResponseStatus::Timeout)
    }

    pub fn http(status: u16) -> Self {
        Self::with_status(ResponseStatus::Http(status))
    }

    fn with_status(status: ResponseStatus) -> Self {
        Self {
            status,
            headers: Headers::new(),
            validator: None,
            response_url: None,
        }
    }

    pub fn with_validator(mut self, validator: StatusValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn with_response_url(mut self, url: impl Into<String>) -> Self {
        self.response_url = Some(url.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Runs the validator; a missing validator accepts everything.
    pub fn is_valid_status(&self, status: u16) -> bool {
        self.validator
            .as_ref()
            .map(|v| v.is_valid(status))
            .unwrap_or(true)
    }
}

/// State tracked for one logical request.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub key: RequestKey,
    pub tag: Option<RequestTag>,
    /// URL handed back by `build_url`, tag included.
    pub dispatched_url: Option<String>,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
    pub slow_threshold_ms: u64,
    pub request: RequestInfo,
    pub response: Option<ResponseInfo>,
}

impl RequestRecord {
    pub(crate) fn new(key: RequestKey, slow_threshold_ms: u64) -> Self {
        Self {
            key,
            tag: None,
            dispatched_url: None,
            start_time: None,
            end_time: None,
            slow_threshold_ms,
            request: RequestInfo::default(),
            response: None,
        }
    }

    /// Wall-clock elapsed time, if both ends were recorded.
    pub fn elapsed_ms(&self) -> Option<f64> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}
