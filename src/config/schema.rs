//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Identity reported on every exported resource.
    pub service: ServiceIdentity,

    /// Exporter and SDK pipeline settings.
    pub telemetry: TelemetryConfig,

    /// Local log output settings.
    pub logging: LoggingConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// API surface settings.
    pub api: ApiConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3333").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3333".to_string(),
        }
    }
}

/// Service identity, mapped onto OpenTelemetry resource attributes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceIdentity {
    /// `service.name`
    pub name: String,

    /// `service.version`
    pub version: String,

    /// `deployment.environment.name`
    pub environment: String,
}

impl Default for ServiceIdentity {
    fn default() -> Self {
        Self {
            name: "hello-otel".to_string(),
            version: "1.0.0".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Where telemetry is exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExporterProtocol {
    /// Pretty-printed records on stdout.
    #[default]
    Stdout,
    /// OTLP over gRPC.
    Grpc,
}

impl ExporterProtocol {
    /// Interpret the value of `OTEL_EXPORTER_OTLP_PROTOCOL`.
    ///
    /// Only `grpc` selects a network exporter; anything else falls back to stdout.
    pub fn from_env_value(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("grpc") {
            Self::Grpc
        } else {
            Self::Stdout
        }
    }
}

/// Telemetry pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Exporter transport for traces, metrics and logs.
    pub protocol: ExporterProtocol,

    /// OTLP collector endpoint. When unset the exporter's own default
    /// (or `OTEL_EXPORTER_OTLP_ENDPOINT`) applies.
    pub otlp_endpoint: Option<String>,

    /// OTLP export timeout in seconds.
    pub export_timeout_secs: u64,

    /// Root sampling ratio, clamped to [0, 1] at build time.
    pub sample_ratio: f64,

    /// Interval between metric exports in seconds.
    pub metric_interval_secs: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            protocol: ExporterProtocol::Stdout,
            otlp_endpoint: None,
            export_timeout_secs: 10,
            sample_ratio: 1.0,
            metric_interval_secs: 60,
        }
    }
}

/// Console log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    /// Console output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Value of the `api.version` span attribute.
    pub version: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            version: "v1".to_string(),
        }
    }
}
