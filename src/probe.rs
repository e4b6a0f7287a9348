//! HTTP prober driving the request lifecycle.
//!
//! # Responsibilities
//! - Issue requests with reqwest on behalf of the caller
//! - Thread each request through the registry: create, tag, time, classify
//! - Record a resource timing entry per request in an in-process timeline
//!
//! # Design Decisions
//! - Timestamps are milliseconds since the prober was built (monotonic)
//! - reqwest exposes no DNS or connect timings; those phases are recorded
//!   as zero-length, so the breakdown carries TTFB and download only
//! - The timing entry is keyed by the URL reqwest reports for the response,
//!   and the same URL is handed to the registry as the response URL
//! - The entry is dropped once the request is classified

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Version};
use thiserror::Error;

use crate::classifier::EventKind;
use crate::config::{MonitorConfig, StatusRange, StatusRangeError};
use crate::registry::{
    Headers, RequestInfo, RequestKey, RequestRegistry, ResponseInfo, ResponseStatus,
    StatusValidator,
};
use crate::reporter::Reporter;
use crate::timeline::{InMemoryTimeline, ResourceTimingEntry};

/// Errors that stop a probe before a request is sent.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid method: {0:?}")]
    InvalidMethod(String),

    #[error("invalid header {0:?}")]
    InvalidHeader(String),

    #[error("invalid accepted status range: {0}")]
    StatusRange(#[from] StatusRangeError),
}

/// One request to probe.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeTarget {
    pub method: String,
    pub url: String,
    pub headers: Headers,
    /// Per-request override of the registry's default slow threshold.
    pub slow_threshold_ms: Option<u64>,
}

impl ProbeTarget {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into().to_uppercase(),
            url: url.into(),
            headers: Headers::new(),
            slow_threshold_ms: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn slow_threshold_ms(mut self, ms: u64) -> Self {
        self.slow_threshold_ms = Some(ms);
        self
    }
}

/// What happened to one probed request.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub key: RequestKey,
    pub method: String,
    /// URL actually dispatched, tag included.
    pub url: String,
    pub status: ResponseStatus,
    pub elapsed_ms: f64,
    pub event: Option<EventKind>,
}

/// Parse a `Name: value` header argument.
pub fn parse_header(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| format!("expected NAME:VALUE, got {s:?}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in {s:?}"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

fn protocol_name(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "http/0.9",
        Version::HTTP_10 => "http/1.0",
        Version::HTTP_11 => "http/1.1",
        Version::HTTP_2 => "h2",
        Version::HTTP_3 => "h3",
        _ => "",
    }
}

fn to_headers(map: &HeaderMap) -> Headers {
    map.iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

fn failure_status(err: &reqwest::Error) -> ResponseStatus {
    if err.is_timeout() {
        ResponseStatus::Timeout
    } else {
        ResponseStatus::NetworkError
    }
}

/// Sends requests and reports them through a [`RequestRegistry`].
pub struct Prober {
    client: reqwest::Client,
    registry: Arc<RequestRegistry>,
    timeline: Option<InMemoryTimeline>,
    validator: StatusValidator,
    anchor: Instant,
}

impl Prober {
    /// Build a prober. With `use_timeline`, every request gets a timing
    /// entry and slow requests carry a timing breakdown.
    pub fn new(
        config: &MonitorConfig,
        reporter: Arc<dyn Reporter>,
        use_timeline: bool,
    ) -> Result<Self, ProbeError> {
        let range: StatusRange = config.probe.accept_status.parse()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.probe.timeout_ms))
            .build()?;

        let timeline = (use_timeline && config.tracker.timing_enabled)
            .then(InMemoryTimeline::new);
        let mut builder = RequestRegistry::builder()
            .config(&config.tracker)
            .reporter(reporter);
        if let Some(timeline) = &timeline {
            builder = builder.timing_source(Arc::new(timeline.clone()));
        }

        Ok(Self {
            client,
            registry: Arc::new(builder.build()),
            timeline,
            validator: range.validator(),
            anchor: Instant::now(),
        })
    }

    pub fn registry(&self) -> &Arc<RequestRegistry> {
        &self.registry
    }

    pub fn timeline(&self) -> Option<&InMemoryTimeline> {
        self.timeline.as_ref()
    }

    fn now_ms(&self) -> f64 {
        self.anchor.elapsed().as_secs_f64() * 1000.0
    }

    /// Probe a single target.
    pub async fn probe(&self, target: &ProbeTarget) -> Result<ProbeOutcome, ProbeError> {
        let method = Method::from_bytes(target.method.as_bytes())
            .map_err(|_| ProbeError::InvalidMethod(target.method.clone()))?;
        let mut headers = HeaderMap::new();
        for (name, value) in &target.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ProbeError::InvalidHeader(name.clone()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| ProbeError::InvalidHeader(name.to_string()))?;
            headers.insert(name, value);
        }

        let key = self.registry.create();
        if let Some(ms) = target.slow_threshold_ms {
            self.registry.set_record_slow_threshold(key, ms);
        }
        let mut info = RequestInfo::new(target.method.as_str(), target.url.as_str());
        info.headers = target.headers.clone();
        self.registry.set_request_info(key, info);
        let url = self.registry.build_url(key, &target.url);

        tracing::debug!(key = %key, method = %method, url = %url, "Probing");

        let start = self.now_ms();
        self.registry.set_start_time(key, start);
        let response = self
            .client
            .request(method, &url)
            .headers(headers)
            .send()
            .await;

        let info = match response {
            Ok(response) => {
                let response_start = self.now_ms();
                let status = response.status().as_u16();
                let response_url = response.url().to_string();
                let protocol = protocol_name(response.version());
                let response_headers = to_headers(response.headers());

                match response.bytes().await {
                    Ok(body) => {
                        let response_end = self.now_ms();
                        if let Some(timeline) = &self.timeline {
                            timeline.record(ResourceTimingEntry {
                                name: response_url.clone(),
                                encoded_body_size: body.len() as u64,
                                decoded_body_size: body.len() as u64,
                                next_hop_protocol: protocol.to_string(),
                                redirect_start: start,
                                redirect_end: start,
                                domain_lookup_start: start,
                                domain_lookup_end: start,
                                connect_start: start,
                                connect_end: start,
                                request_start: start,
                                response_start,
                                response_end,
                                duration: response_end - start,
                            });
                        }
                        let mut info = ResponseInfo::http(status)
                            .with_validator(self.validator.clone())
                            .with_response_url(response_url);
                        info.headers = response_headers;
                        info
                    }
                    Err(e) => {
                        tracing::warn!(key = %key, url = %url, error = %e, "Failed to read response body");
                        ResponseInfo {
                            status: failure_status(&e),
                            headers: response_headers,
                            validator: Some(self.validator.clone()),
                            response_url: Some(response_url),
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(key = %key, url = %url, error = %e, "Request failed");
                let mut info = ResponseInfo::network_error();
                info.status = failure_status(&e);
                info
            }
        };

        let end = self.now_ms();
        self.registry.set_end_time(key, end);
        let status = info.status;
        let entry_name = info.response_url.clone();
        let event = self.registry.set_response_info(key, info);
        if let (Some(timeline), Some(name)) = (&self.timeline, entry_name) {
            timeline.remove(&name);
        }

        Ok(ProbeOutcome {
            key,
            method: target.method.clone(),
            url,
            status,
            elapsed_ms: end - start,
            event,
        })
    }

    /// Probe every target concurrently; results keep the input order.
    pub async fn probe_all(&self, targets: &[ProbeTarget]) -> Vec<Result<ProbeOutcome, ProbeError>> {
        join_all(targets.iter().map(|target| self.probe(target))).await
    }
}
