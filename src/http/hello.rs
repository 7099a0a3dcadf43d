//! `GET /hello`

use axum::http::StatusCode;
use axum::response::IntoResponse;
use opentelemetry::global;
use opentelemetry::trace::Tracer;

use crate::observability::INSTRUMENTATION_SCOPE;

pub const GREETING: &str = "Hi!!!";

pub async fn hello() -> impl IntoResponse {
    global::tracer(INSTRUMENTATION_SCOPE).in_span("getHello", |_cx| {
        tracing::info!("{GREETING}");
    });

    (StatusCode::OK, GREETING)
}
