//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::registry::{DEFAULT_SLOW_THRESHOLD_MS, DEFAULT_TAG_PARAM};
use crate::reporter::DEFAULT_CATEGORY;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    /// Request registry and classifier settings.
    pub tracker: TrackerConfig,

    /// Settings for the built-in HTTP prober.
    pub probe: ProbeConfig,

    /// Logging settings.
    pub observability: ObservabilityConfig,
}

/// Request tracking configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    /// Default slow-request threshold in milliseconds. Also the value the
    /// default returns to after every completed request.
    pub default_slow_threshold_ms: u64,

    /// Query parameter carrying the disambiguation tag.
    pub tag_param: String,

    /// Category passed to the reporter with every event.
    pub event_category: String,

    /// Use resource timing entries when a timing source is available.
    pub timing_enabled: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            default_slow_threshold_ms: DEFAULT_SLOW_THRESHOLD_MS,
            tag_param: DEFAULT_TAG_PARAM.to_string(),
            event_category: DEFAULT_CATEGORY.to_string(),
            timing_enabled: true,
        }
    }
}

/// Prober configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ProbeConfig {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,

    /// Accepted status range, e.g. "200-399" or "204".
    pub accept_status: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            accept_status: "200-399".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format (pretty, json).
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.tracker.default_slow_threshold_ms, 400);
        assert_eq!(config.tracker.tag_param, "_eareqid");
        assert_eq!(config.tracker.event_category, "apiMonitor");
        assert!(config.tracker.timing_enabled);
        assert_eq!(config.probe.timeout_ms, 10_000);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: MonitorConfig = toml::from_str(
            r#"
            [tracker]
            default_slow_threshold_ms = 250

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.tracker.default_slow_threshold_ms, 250);
        assert_eq!(config.tracker.tag_param, "_eareqid");
        assert_eq!(config.observability.log_format, "json");
        assert_eq!(config.observability.log_level, "info");
        assert_eq!(config.probe, ProbeConfig::default());
    }
}
