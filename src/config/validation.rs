//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds and timeouts > 0)
//! - Check that the tag parameter survives a URL round-trip
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MonitorConfig → Result<(), Vec<ValidationError>>

use thiserror::Error;

use crate::config::schema::MonitorConfig;
use crate::config::status_range::{StatusRange, StatusRangeError};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["pretty", "json"];

/// A single semantic problem in a configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("tracker.default_slow_threshold_ms must be greater than 0")]
    ZeroSlowThreshold,

    #[error("tracker.tag_param {0:?} must be non-empty and contain only [A-Za-z0-9_-]")]
    InvalidTagParam(String),

    #[error("tracker.event_category must not be empty")]
    EmptyCategory,

    #[error("probe.timeout_ms must be greater than 0")]
    ZeroTimeout,

    #[error("probe.accept_status: {0}")]
    AcceptStatus(#[from] StatusRangeError),

    #[error("observability.log_level {0:?} is not one of trace, debug, info, warn, error")]
    UnknownLogLevel(String),

    #[error("observability.log_format {0:?} is not one of pretty, json")]
    UnknownLogFormat(String),
}

fn is_valid_param(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &MonitorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let tracker = &config.tracker;
    if tracker.default_slow_threshold_ms == 0 {
        errors.push(ValidationError::ZeroSlowThreshold);
    }
    if !is_valid_param(&tracker.tag_param) {
        errors.push(ValidationError::InvalidTagParam(tracker.tag_param.clone()));
    }
    if tracker.event_category.trim().is_empty() {
        errors.push(ValidationError::EmptyCategory);
    }

    if config.probe.timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if let Err(e) = config.probe.accept_status.parse::<StatusRange>() {
        errors.push(e.into());
    }

    let level = config.observability.log_level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(config.observability.log_level.clone()));
    }
    if !LOG_FORMATS.contains(&config.observability.log_format.as_str()) {
        errors.push(ValidationError::UnknownLogFormat(config.observability.log_format.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
