//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and formats.
//! All violations are returned, not just the first.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServiceConfig;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    InvalidBindAddress(String),

    #[error("service.name must not be empty")]
    EmptyServiceName,

    #[error("api.version must not be empty")]
    EmptyApiVersion,

    #[error("telemetry.sample_ratio {0} is outside [0, 1]")]
    SampleRatioOutOfRange(f64),

    #[error("telemetry.metric_interval_secs must be greater than zero")]
    ZeroMetricInterval,

    #[error("telemetry.export_timeout_secs must be greater than zero")]
    ZeroExportTimeout,

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error("telemetry.otlp_endpoint {0:?} is not a valid URL")]
    InvalidOtlpEndpoint(String),
}

pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.service.name.trim().is_empty() {
        errors.push(ValidationError::EmptyServiceName);
    }

    if config.api.version.trim().is_empty() {
        errors.push(ValidationError::EmptyApiVersion);
    }

    let ratio = config.telemetry.sample_ratio;
    if !(0.0..=1.0).contains(&ratio) {
        errors.push(ValidationError::SampleRatioOutOfRange(ratio));
    }

    if config.telemetry.metric_interval_secs == 0 {
        errors.push(ValidationError::ZeroMetricInterval);
    }

    if config.telemetry.export_timeout_secs == 0 {
        errors.push(ValidationError::ZeroExportTimeout);
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    if let Some(endpoint) = &config.telemetry.otlp_endpoint {
        if url::Url::parse(endpoint).is_err() {
            errors.push(ValidationError::InvalidOtlpEndpoint(endpoint.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&ServiceConfig::default()), Ok(()));
    }

    #[test]
    fn test_reports_every_violation() {
        let mut config = ServiceConfig::default();
        config.listener.bind_address = ":3333".into();
        config.service.name = String::new();
        config.telemetry.sample_ratio = 1.5;
        config.telemetry.metric_interval_secs = 0;
        config.telemetry.otlp_endpoint = Some("not a url".into());

        let errors = validate_config(&config).unwrap_err();

        assert_eq!(
            errors,
            vec![
                ValidationError::InvalidBindAddress(":3333".into()),
                ValidationError::EmptyServiceName,
                ValidationError::SampleRatioOutOfRange(1.5),
                ValidationError::ZeroMetricInterval,
                ValidationError::InvalidOtlpEndpoint("not a url".into()),
            ]
        );
    }

    #[test]
    fn test_accepts_collector_endpoint() {
        let mut config = ServiceConfig::default();
        config.telemetry.otlp_endpoint = Some("http://localhost:4317".into());
        assert!(validate_config(&config).is_ok());
    }
}
