//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults or config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (OTEL_* environment overrides)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults so the service runs with no config file
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ApiConfig, ExporterProtocol, ListenerConfig, LogFormat, LoggingConfig, ServiceConfig,
    ServiceIdentity, TelemetryConfig, TimeoutConfig,
};
