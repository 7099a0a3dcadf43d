//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with all handlers
//! - Wire up middleware (request ID, timeout, tracing, metrics, logging)
//! - Bind server to listener and stop on the shutdown signal
//!
//! # Layer order (outermost first)
//! ```text
//! set request id → propagate request id
//!     → trace_requests (server span) → annotate_request_span
//!     → MetricsLayer → catch panic → timeout
//!     → TraceLayer (request logs) → handler
//! ```
//!
//! Panics (500) and timeouts (408) are turned into responses inside the
//! metrics and span layers, so both are recorded like any other response.

use std::time::Duration;

use axum::http::StatusCode;
use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer},
    LatencyUnit,
};
use tracing::Level;

use crate::config::ServiceConfig;
use crate::http::hello::hello;
use crate::http::request::RequestIdGenerator;
use crate::observability::logging::RequestSpan;
use crate::observability::metrics::{ApiMetrics, MetricsLayer};
use crate::observability::tracer::{annotate_request_span, trace_requests, ApiVersion};

/// HTTP server for the service.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and instruments.
    pub fn new(config: ServiceConfig, metrics: ApiMetrics) -> Self {
        let router = build_router(&config, metrics);
        Self { router, config }
    }

    /// Run the server, accepting connections on the given listener until
    /// the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(config: &ServiceConfig, metrics: ApiMetrics) -> Router {
    instrument(Router::new().route("/hello", get(hello)), config, metrics)
}

/// Wrap `routes` in the request ID, tracing, metrics, panic and timeout
/// layers. Unmatched requests fall through the same stack.
pub fn instrument(routes: Router, config: &ServiceConfig, metrics: ApiMetrics) -> Router {
    let request_logging = TraceLayer::new_for_http()
        .make_span_with(RequestSpan)
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        );

    routes
        .layer(request_logging)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.timeouts.request_secs),
        ))
        .layer(CatchPanicLayer::new())
        .layer(MetricsLayer::new(metrics))
        .layer(middleware::from_fn_with_state(
            ApiVersion::new(config.api.version.clone()),
            annotate_request_span,
        ))
        .layer(middleware::from_fn(trace_requests))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(RequestIdGenerator))
}
