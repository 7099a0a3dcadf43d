//! Distributed tracing middleware.
//!
//! # Responsibilities
//! - Extract W3C trace context from incoming requests
//! - Open one server span per request and make it current for the inner stack
//! - Carry the request ID in the OpenTelemetry [`Context`]
//!
//! # Design Decisions
//! - Spans are created through the OpenTelemetry API, not tracing-opentelemetry,
//!   so handler spans and log records share one context
//! - Only 5xx responses mark the span as failed

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use opentelemetry::context::FutureExt as _;
use opentelemetry::trace::{
    get_active_span, SpanKind, Status, TraceContextExt as _, Tracer as _,
};
use opentelemetry::{global, Context, KeyValue};
use opentelemetry_http::HeaderExtractor;
use opentelemetry_semantic_conventions::attribute::{
    HTTP_REQUEST_METHOD, HTTP_RESPONSE_STATUS_CODE, HTTP_ROUTE, URL_PATH,
};

use crate::http::request::{RequestId, RequestIdExt as _};

use super::INSTRUMENTATION_SCOPE;

/// Span attribute naming the request ID.
pub const REQUEST_ID_ATTRIBUTE: &str = "request.id";

/// Span attribute naming the API version.
pub const API_VERSION_ATTRIBUTE: &str = "api.version";

/// API version stamped on every server span.
#[derive(Debug, Clone)]
pub struct ApiVersion(String);

impl ApiVersion {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }
}

/// Parent context from the request headers, or an empty context when the
/// headers carry no valid remote span.
pub fn extract_parent_context(headers: &HeaderMap) -> Context {
    global::get_text_map_propagator(|propagator| {
        // Fresh base so a missing traceparent does not inherit in-process state.
        propagator.extract_with_context(&Context::new(), &HeaderExtractor(headers))
    })
}

/// Request ID of the request being served on this task, if any.
pub fn current_request_id() -> Option<RequestId> {
    Context::map_current(|cx| cx.get::<RequestId>().cloned())
}

/// Wrap the rest of the stack in a server span.
pub async fn trace_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let route = request.route();
    let parent = extract_parent_context(request.headers());

    let mut attributes = vec![
        KeyValue::new(HTTP_REQUEST_METHOD, method.to_string()),
        KeyValue::new(URL_PATH, request.uri().path().to_owned()),
    ];
    // Unmatched requests are named by method alone.
    let name = match route {
        Some(route) => {
            let name = format!("{method} {route}");
            attributes.push(KeyValue::new(HTTP_ROUTE, route));
            name
        }
        None => method.to_string(),
    };

    let tracer = global::tracer(INSTRUMENTATION_SCOPE);
    let span = tracer
        .span_builder(name)
        .with_kind(SpanKind::Server)
        .with_attributes(attributes)
        .start_with_context(&tracer, &parent);

    let mut cx = parent.with_span(span);
    if let Some(request_id) = request.request_id() {
        cx = cx.with_value(request_id);
    }

    let response = next.run(request).with_context(cx.clone()).await;

    let status = response.status();
    let span = cx.span();
    span.set_attribute(KeyValue::new(
        HTTP_RESPONSE_STATUS_CODE,
        i64::from(status.as_u16()),
    ));
    if status.is_server_error() {
        span.set_status(Status::error(status.to_string()));
    }
    span.end();

    response
}

/// Annotate the current server span with the API version and request ID.
pub async fn annotate_request_span(
    State(version): State<ApiVersion>,
    request: Request,
    next: Next,
) -> Response {
    let request_id = current_request_id();

    get_active_span(|span| {
        span.set_attribute(KeyValue::new(API_VERSION_ATTRIBUTE, version.0.clone()));
        if let Some(request_id) = request_id {
            span.set_attribute(KeyValue::new(
                REQUEST_ID_ATTRIBUTE,
                request_id.as_str().to_owned(),
            ));
        }
    });

    next.run(request).await
}
