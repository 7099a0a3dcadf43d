//! Provider construction for each exporter transport.

use std::time::Duration;

use opentelemetry::propagation::TextMapCompositePropagator;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::logs::{BatchLogProcessor, SdkLoggerProvider};
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::propagation::{BaggagePropagator, TraceContextPropagator};
use opentelemetry_sdk::trace::{RandomIdGenerator, Sampler, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use opentelemetry_semantic_conventions::resource::SERVICE_VERSION;

use crate::config::{ExporterProtocol, ServiceIdentity, TelemetryConfig};

use super::log_processor::ContextualLogProcessor;
use super::ObservabilityError;

const DEPLOYMENT_ENVIRONMENT_NAME: &str = "deployment.environment.name";

/// W3C trace context plus baggage.
pub(super) fn propagator() -> TextMapCompositePropagator {
    TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ])
}

/// SDK default resource merged with the service identity.
pub(super) fn service_resource(service: &ServiceIdentity) -> Resource {
    Resource::builder()
        .with_service_name(service.name.clone())
        .with_attributes([
            KeyValue::new(SERVICE_VERSION, service.version.clone()),
            KeyValue::new(DEPLOYMENT_ENVIRONMENT_NAME, service.environment.clone()),
        ])
        .build()
}

pub(super) fn build_tracer_provider(
    config: &TelemetryConfig,
    resource: Resource,
) -> Result<SdkTracerProvider, ObservabilityError> {
    let builder = SdkTracerProvider::builder()
        .with_sampler(Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
            clamp_sample_ratio(config.sample_ratio),
        ))))
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource);

    let builder = match config.protocol {
        ExporterProtocol::Stdout => {
            builder.with_batch_exporter(opentelemetry_stdout::SpanExporter::default())
        }
        ExporterProtocol::Grpc => {
            let mut exporter = opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .with_timeout(export_timeout(config));
            if let Some(endpoint) = &config.otlp_endpoint {
                exporter = exporter.with_endpoint(endpoint.clone());
            }
            builder.with_batch_exporter(exporter.build()?)
        }
    };

    Ok(builder.build())
}

pub(super) fn build_logger_provider(
    config: &TelemetryConfig,
    resource: Resource,
) -> Result<SdkLoggerProvider, ObservabilityError> {
    let builder = SdkLoggerProvider::builder().with_resource(resource);

    let builder = match config.protocol {
        ExporterProtocol::Stdout => {
            let processor =
                BatchLogProcessor::builder(opentelemetry_stdout::LogExporter::default()).build();
            builder.with_log_processor(ContextualLogProcessor::with_request_attributes(processor))
        }
        ExporterProtocol::Grpc => {
            let mut exporter = opentelemetry_otlp::LogExporter::builder()
                .with_tonic()
                .with_timeout(export_timeout(config));
            if let Some(endpoint) = &config.otlp_endpoint {
                exporter = exporter.with_endpoint(endpoint.clone());
            }
            let processor = BatchLogProcessor::builder(exporter.build()?).build();
            builder.with_log_processor(ContextualLogProcessor::with_request_attributes(processor))
        }
    };

    Ok(builder.build())
}

pub(super) fn build_meter_provider(
    config: &TelemetryConfig,
    resource: Resource,
) -> Result<SdkMeterProvider, ObservabilityError> {
    let interval = Duration::from_secs(config.metric_interval_secs);
    let builder = SdkMeterProvider::builder().with_resource(resource);

    let builder = match config.protocol {
        ExporterProtocol::Stdout => builder.with_reader(
            PeriodicReader::builder(opentelemetry_stdout::MetricExporter::default())
                .with_interval(interval)
                .build(),
        ),
        ExporterProtocol::Grpc => {
            let mut exporter = opentelemetry_otlp::MetricExporter::builder()
                .with_tonic()
                .with_timeout(export_timeout(config));
            if let Some(endpoint) = &config.otlp_endpoint {
                exporter = exporter.with_endpoint(endpoint.clone());
            }
            builder.with_reader(
                PeriodicReader::builder(exporter.build()?)
                    .with_interval(interval)
                    .build(),
            )
        }
    };

    Ok(builder.build())
}

fn export_timeout(config: &TelemetryConfig) -> Duration {
    Duration::from_secs(config.export_timeout_secs)
}

fn clamp_sample_ratio(sample_ratio: f64) -> f64 {
    sample_ratio.clamp(0.0, 1.0)
}
