//! Server span and trace context propagation through the full router.

use std::sync::OnceLock;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::Router;
use opentelemetry::global;
use opentelemetry::metrics::MeterProvider as _;
use opentelemetry::trace::{SpanId, SpanKind, Status, TraceId};
use opentelemetry::{Key, Value};
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider, SpanData};
use tower::ServiceExt;

use hello_otel::config::ServiceConfig;
use hello_otel::http::{build_router, instrument};
use hello_otel::observability::ApiMetrics;

const TRACE_ID: &str = "4bf92f3577b34da6a3ce929d0e0e4736";
const PARENT_SPAN_ID: &str = "00f067aa0ba902b7";

fn span_exporter() -> &'static InMemorySpanExporter {
    static EXPORTER: OnceLock<InMemorySpanExporter> = OnceLock::new();
    EXPORTER.get_or_init(|| {
        let exporter = InMemorySpanExporter::default();
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .build();
        global::set_tracer_provider(provider);
        global::set_text_map_propagator(TraceContextPropagator::new());
        exporter
    })
}

fn attribute(span: &SpanData, key: &'static str) -> Option<Value> {
    span.attributes
        .iter()
        .find(|kv| kv.key == Key::from_static_str(key))
        .map(|kv| kv.value.clone())
}

async fn send(request: Request<Body>) -> StatusCode {
    let meter_provider = SdkMeterProvider::builder().build();
    let router = build_router(
        &ServiceConfig::default(),
        ApiMetrics::new(&meter_provider.meter("api")),
    );
    router.oneshot(request).await.unwrap().status()
}

#[tokio::test]
async fn test_server_span_continues_remote_trace() {
    let exporter = span_exporter();

    let status = send(
        Request::get("/hello")
            .header("traceparent", format!("00-{TRACE_ID}-{PARENT_SPAN_ID}-01"))
            .header("x-request-id", "trace-test-1")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let trace_id = TraceId::from_hex(TRACE_ID).unwrap();
    let spans: Vec<_> = exporter
        .get_finished_spans()
        .unwrap()
        .into_iter()
        .filter(|span| span.span_context.trace_id() == trace_id)
        .collect();

    let server = spans
        .iter()
        .find(|span| span.name == "GET /hello")
        .expect("server span");
    assert_eq!(server.span_kind, SpanKind::Server);
    assert_eq!(server.parent_span_id, SpanId::from_hex(PARENT_SPAN_ID).unwrap());
    assert_eq!(attribute(server, "api.version"), Some(Value::from("v1")));
    assert_eq!(
        attribute(server, "request.id"),
        Some(Value::from("trace-test-1"))
    );
    assert_eq!(
        attribute(server, "http.response.status_code"),
        Some(Value::I64(200))
    );

    let handler = spans
        .iter()
        .find(|span| span.name == "getHello")
        .expect("handler span");
    assert_eq!(handler.parent_span_id, server.span_context.span_id());
}

#[tokio::test]
async fn test_request_without_traceparent_starts_new_trace() {
    let exporter = span_exporter();

    let status = send(
        Request::get("/hello")
            .header("x-request-id", "fresh-trace")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let spans = exporter.get_finished_spans().unwrap();
    let server = spans
        .iter()
        .find(|span| attribute(span, "request.id") == Some(Value::from("fresh-trace")))
        .expect("server span");

    assert_eq!(server.parent_span_id, SpanId::INVALID);
    assert!(server.span_context.is_valid());
    assert_ne!(server.span_context.trace_id(), TraceId::from_hex(TRACE_ID).unwrap());
}

fn server_span_for(request_id: &str) -> SpanData {
    span_exporter()
        .get_finished_spans()
        .unwrap()
        .into_iter()
        .find(|span| attribute(span, "request.id") == Some(Value::from(request_id.to_owned())))
        .expect("server span")
}

#[tokio::test]
async fn test_unmatched_request_span_is_named_by_method() {
    span_exporter();

    let status = send(
        Request::get("/no/such/route")
            .header("x-request-id", "unmatched-1")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let server = server_span_for("unmatched-1");
    assert_eq!(server.name, "GET");
    assert_eq!(attribute(&server, "http.route"), None);
    assert_eq!(
        attribute(&server, "url.path"),
        Some(Value::from("/no/such/route"))
    );
}

#[tokio::test]
async fn test_panicking_handler_ends_span_as_error() {
    span_exporter();

    async fn boom() -> &'static str {
        panic!("handler exploded");
    }

    let meter_provider = SdkMeterProvider::builder().build();
    let router = instrument(
        Router::new().route("/boom", get(boom)),
        &ServiceConfig::default(),
        ApiMetrics::new(&meter_provider.meter("api")),
    );
    let response = router
        .oneshot(
            Request::get("/boom")
                .header("x-request-id", "panic-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let server = server_span_for("panic-1");
    assert_eq!(server.name, "GET /boom");
    assert_eq!(
        attribute(&server, "http.response.status_code"),
        Some(Value::I64(500))
    );
    assert!(matches!(server.status, Status::Error { .. }));
}
