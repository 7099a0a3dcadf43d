//! Structured logging.
//!
//! # Responsibilities
//! - Install the global tracing subscriber (console output plus OTel log bridge)
//! - Describe the per-request logging span used by the HTTP stack
//!
//! # Design Decisions
//! - Compact format for development, JSON for machine parsing
//! - `RUST_LOG` overrides the configured level
//! - Exporter transport crates never reach the OTel bridge, so exporting logs
//!   cannot produce more logs

use axum::http::Request;
use opentelemetry::trace::TraceContextExt as _;
use opentelemetry::Context;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use tower_http::trace::MakeSpan;
use tracing::Span;
use tracing_subscriber::{
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

use crate::config::{LogFormat, LoggingConfig};
use crate::http::request::RequestIdExt as _;

use super::tracer::current_request_id;
use super::ObservabilityError;

const QUIET_TRANSPORTS: &str = "h2=warn,hyper=warn,tower=warn,tonic=warn,opentelemetry=warn";
const BRIDGE_EXCLUDED: &str = "h2=off,hyper=off,tower=off,tonic=off,reqwest=off,opentelemetry=off";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_subscriber(
    config: &LoggingConfig,
    logger_provider: &SdkLoggerProvider,
) -> Result<(), ObservabilityError> {
    match config.format {
        LogFormat::Compact => init_with_layer(
            config,
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
            logger_provider,
        ),
        LogFormat::Json => init_with_layer(
            config,
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_target(true),
            logger_provider,
        ),
    }
}

fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},{QUIET_TRANSPORTS}", config.level)))
}

fn build_bridge_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::new(format!("{},{BRIDGE_EXCLUDED}", config.level))
}

fn init_with_layer<L>(
    config: &LoggingConfig,
    fmt_layer: L,
    logger_provider: &SdkLoggerProvider,
) -> Result<(), ObservabilityError>
where
    L: Layer<Registry> + Send + Sync + 'static,
{
    let bridge = OpenTelemetryTracingBridge::new(logger_provider)
        .with_filter(build_bridge_filter(config));

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(build_env_filter(config))
        .with(bridge)
        .try_init()?;

    Ok(())
}

/// [`MakeSpan`] for the request logging layer: every event inside carries
/// the request ID and the ids of the active OTel span.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestSpan;

impl<B> MakeSpan<B> for RequestSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let request_id = current_request_id()
            .or_else(|| request.request_id())
            .map(|id| id.to_string())
            .unwrap_or_default();

        let cx = Context::current();
        let span = cx.span();
        let span_context = span.span_context();
        let (trace_id, span_id) = if span_context.is_valid() {
            (
                span_context.trace_id().to_string(),
                span_context.span_id().to_string(),
            )
        } else {
            (String::new(), String::new())
        };

        tracing::info_span!(
            "request",
            method = %request.method(),
            path = %request.uri().path(),
            request_id = %request_id,
            trace_id = %trace_id,
            span_id = %span_id,
        )
    }
}
