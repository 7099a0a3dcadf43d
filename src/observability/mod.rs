//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP stack produces:
//!     → tracer.rs (server span per request, request ID in context)
//!     → metrics.rs (call, latency, size, status and error instruments)
//!     → logging.rs (tracing events, bridged to OTel log records)
//!
//! log_processor.rs stamps request_id / trace_id / span_id on log records.
//! sdk.rs owns the providers; exporters.rs picks stdout or OTLP/gRPC.
//! ```
//!
//! # Design Decisions
//! - One exporter protocol for all three signals
//! - Request ID flows through the OTel context, not task-locals
//! - Providers are flushed and shut down before the process exits

use thiserror::Error;

mod exporters;
pub mod log_processor;
pub mod logging;
pub mod metrics;
pub mod sdk;
pub mod tracer;

pub use log_processor::{request_attributes, ContextualLogProcessor};
pub use logging::{init_subscriber, RequestSpan};
pub use metrics::{ApiMetrics, MetricsLayer};
pub use sdk::{Provider, ProviderKind, SetupError, ShutdownError, Telemetry};

/// Instrumentation scope for spans opened by this service.
pub const INSTRUMENTATION_SCOPE: &str = env!("CARGO_PKG_NAME");

/// Errors raised while installing observability.
#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("failed to build OTLP exporter: {0}")]
    OtlpExporter(#[from] opentelemetry_otlp::ExporterBuildError),

    #[error("failed to install tracing subscriber: {0}")]
    TracingSubscriber(#[from] tracing_subscriber::util::TryInitError),
}
