//! Diagnostic event payloads.

use serde::Serialize;

use super::timing::PerformanceData;
use crate::registry::{Headers, RequestInfo};

/// Category of an emitted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    Error,
    Timeout,
    ServerError,
    Slow,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Error => "error",
            EventKind::Timeout => "timeout",
            EventKind::ServerError => "server-error",
            EventKind::Slow => "slow",
        }
    }

    /// Human-readable label carried in the payload.
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::Error => "request error",
            EventKind::Timeout => "request timeout",
            EventKind::ServerError => "server returned abnormal status",
            EventKind::Slow => "slow request",
        }
    }
}

/// Request side of an event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestSummary {
    pub method: String,
    pub headers: Headers,
    pub url: String,
}

impl From<&RequestInfo> for RequestSummary {
    fn from(info: &RequestInfo) -> Self {
        Self {
            method: info.method.clone(),
            headers: info.headers.clone(),
            url: info.url.clone(),
        }
    }
}

/// Response side of an event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseSummary {
    pub headers: Headers,
}

/// One classified request, ready for the reporter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEvent {
    pub label: &'static str,
    pub kind: EventKind,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_time_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_ms: Option<u64>,
    pub request: RequestSummary,
    pub response: Option<ResponseSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceData>,
}

impl ApiEvent {
    pub(crate) fn new(kind: EventKind, code: u16, request: &RequestInfo) -> Self {
        Self {
            label: kind.label(),
            kind,
            code,
            status_code: None,
            request_time_ms: None,
            threshold_ms: None,
            request: RequestSummary::from(request),
            response: None,
            performance: None,
        }
    }

    pub(crate) fn with_response(mut self, status: u16, headers: &Headers) -> Self {
        self.status_code = Some(status);
        self.response = Some(ResponseSummary {
            headers: headers.clone(),
        });
        self
    }

    pub(crate) fn with_timing(mut self, request_time_ms: f64, threshold_ms: u64) -> Self {
        self.request_time_ms = Some(request_time_ms);
        self.threshold_ms = Some(threshold_ms);
        self
    }
}
