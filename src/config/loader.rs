//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{ExporterProtocol, ServiceConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Selects the exporter transport.
pub const OTEL_EXPORTER_OTLP_PROTOCOL: &str = "OTEL_EXPORTER_OTLP_PROTOCOL";

/// Overrides `service.name`.
pub const OTEL_SERVICE_NAME: &str = "OTEL_SERVICE_NAME";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply environment
/// overrides, and validate the result.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_config(&fs::read_to_string(path)?)?,
        None => ServiceConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Parse a TOML document; missing sections take their defaults.
pub fn parse_config(content: &str) -> Result<ServiceConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Apply the OpenTelemetry environment variables this service honours.
///
/// `lookup` abstracts the process environment.
pub fn apply_env_overrides<F>(config: &mut ServiceConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(protocol) = lookup(OTEL_EXPORTER_OTLP_PROTOCOL) {
        config.telemetry.protocol = ExporterProtocol::from_env_value(&protocol);
    }

    if let Some(name) = lookup(OTEL_SERVICE_NAME).filter(|name| !name.trim().is_empty()) {
        config.service.name = name;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogFormat;
    use std::collections::HashMap;

    #[test]
    fn test_parse_partial_config_keeps_defaults() {
        let config = parse_config(
            r#"
            [listener]
            bind_address = "127.0.0.1:8080"

            [telemetry]
            protocol = "grpc"
            sample_ratio = 0.25

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:8080");
        assert_eq!(config.telemetry.protocol, ExporterProtocol::Grpc);
        assert_eq!(config.telemetry.sample_ratio, 0.25);
        assert_eq!(config.telemetry.metric_interval_secs, 60);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.service.name, "hello-otel");
        assert_eq!(config.api.version, "v1");
    }

    #[test]
    fn test_parse_rejects_unknown_protocol() {
        let result = parse_config("[telemetry]\nprotocol = \"carrier-pigeon\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_env_protocol_override() {
        let env: HashMap<&str, &str> = [(OTEL_EXPORTER_OTLP_PROTOCOL, "grpc")].into();
        let mut config = ServiceConfig::default();

        apply_env_overrides(&mut config, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.telemetry.protocol, ExporterProtocol::Grpc);
    }

    #[test]
    fn test_env_non_grpc_protocol_falls_back_to_stdout() {
        let env: HashMap<&str, &str> = [(OTEL_EXPORTER_OTLP_PROTOCOL, "http/protobuf")].into();
        let mut config = ServiceConfig::default();
        config.telemetry.protocol = ExporterProtocol::Grpc;

        apply_env_overrides(&mut config, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.telemetry.protocol, ExporterProtocol::Stdout);
    }

    #[test]
    fn test_env_service_name_override_ignores_blank() {
        let mut config = ServiceConfig::default();

        apply_env_overrides(&mut config, |key| {
            (key == OTEL_SERVICE_NAME).then(|| "   ".to_string())
        });
        assert_eq!(config.service.name, "hello-otel");

        apply_env_overrides(&mut config, |key| {
            (key == OTEL_SERVICE_NAME).then(|| "checkout".to_string())
        });
        assert_eq!(config.service.name, "checkout");
    }
}
