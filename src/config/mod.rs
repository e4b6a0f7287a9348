//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → MonitorConfig (validated, immutable)
//!     → RegistryBuilder::config / Prober::new
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Command-line flags override file values after loading

pub mod loader;
pub mod schema;
pub mod status_range;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{MonitorConfig, ObservabilityConfig, ProbeConfig, TrackerConfig};
pub use status_range::{StatusRange, StatusRangeError};
pub use validation::{validate_config, ValidationError};
