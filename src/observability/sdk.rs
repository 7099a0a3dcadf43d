//! OpenTelemetry SDK bootstrap.
//!
//! # Responsibilities
//! - Install the global propagator, tracer provider and meter provider
//! - Build the logger provider handed to the tracing bridge
//! - Shut every provider down, reporting all failures together
//!
//! # Design Decisions
//! - Providers are shut down in registration order
//! - Shutdown drains the provider list, so a second call is a no-op

use std::fmt;

use opentelemetry::global;
use opentelemetry_sdk::error::OTelSdkError;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use thiserror::Error;

use crate::config::ServiceConfig;

use super::exporters::{
    build_logger_provider, build_meter_provider, build_tracer_provider, propagator,
    service_resource,
};
use super::ObservabilityError;

/// Which signal a provider serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Tracer,
    Meter,
    Logger,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tracer => write!(f, "tracer provider"),
            Self::Meter => write!(f, "meter provider"),
            Self::Logger => write!(f, "logger provider"),
        }
    }
}

/// A provider owned by [`Telemetry`].
#[derive(Debug)]
pub enum Provider {
    Tracer(SdkTracerProvider),
    Meter(SdkMeterProvider),
    Logger(SdkLoggerProvider),
}

impl Provider {
    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Tracer(_) => ProviderKind::Tracer,
            Self::Meter(_) => ProviderKind::Meter,
            Self::Logger(_) => ProviderKind::Logger,
        }
    }

    /// Flush buffered telemetry and stop the exporter.
    pub fn shutdown(&self) -> Result<(), OTelSdkError> {
        match self {
            Self::Tracer(provider) => provider.shutdown(),
            Self::Meter(provider) => provider.shutdown(),
            Self::Logger(provider) => provider.shutdown(),
        }
    }
}

/// One provider that failed to shut down.
#[derive(Debug)]
pub struct ProviderShutdownFailure {
    pub kind: ProviderKind,
    pub source: OTelSdkError,
}

impl fmt::Display for ProviderShutdownFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.source)
    }
}

/// Every failure observed while shutting providers down.
#[derive(Debug, Error)]
#[error("telemetry shutdown failed: {}", join(.failures))]
pub struct ShutdownError {
    pub failures: Vec<ProviderShutdownFailure>,
}

/// Telemetry could not be installed.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct SetupError {
    #[source]
    pub source: ObservabilityError,
    /// Set when cleaning up providers built before the failure also failed.
    pub cleanup: Option<ShutdownError>,
}

fn join(failures: &[ProviderShutdownFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Installed telemetry pipeline.
#[derive(Debug, Default)]
pub struct Telemetry {
    providers: Vec<Provider>,
}

impl Telemetry {
    /// Install the propagator and the trace, log and metric pipelines for
    /// the configured exporter protocol.
    pub fn init(config: &ServiceConfig) -> Result<Self, SetupError> {
        global::set_text_map_propagator(propagator());

        let resource = service_resource(&config.service);
        let mut telemetry = Self::default();

        let result = (|| {
            let tracer_provider = build_tracer_provider(&config.telemetry, resource.clone())?;
            global::set_tracer_provider(tracer_provider.clone());
            telemetry.providers.push(Provider::Tracer(tracer_provider));

            let logger_provider = build_logger_provider(&config.telemetry, resource.clone())?;
            telemetry.providers.push(Provider::Logger(logger_provider));

            let meter_provider = build_meter_provider(&config.telemetry, resource)?;
            global::set_meter_provider(meter_provider.clone());
            telemetry.providers.push(Provider::Meter(meter_provider));

            Ok::<_, ObservabilityError>(())
        })();

        match result {
            Ok(()) => Ok(telemetry),
            Err(source) => Err(SetupError {
                source,
                cleanup: telemetry.shutdown().err(),
            }),
        }
    }

    /// Assemble from already-built providers.
    pub fn from_providers(providers: Vec<Provider>) -> Self {
        Self { providers }
    }

    /// Logger provider feeding the tracing bridge, if installed.
    pub fn logger_provider(&self) -> Option<&SdkLoggerProvider> {
        self.providers.iter().find_map(|provider| match provider {
            Provider::Logger(provider) => Some(provider),
            _ => None,
        })
    }

    /// Shut every provider down. All providers are attempted even when one
    /// fails; failures are returned together.
    pub fn shutdown(&mut self) -> Result<(), ShutdownError> {
        let failures: Vec<_> = self
            .providers
            .drain(..)
            .filter_map(|provider| {
                provider
                    .shutdown()
                    .err()
                    .map(|source| ProviderShutdownFailure {
                        kind: provider.kind(),
                        source,
                    })
            })
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ShutdownError { failures })
        }
    }
}
