//! Request metrics middleware.
//!
//! # Metrics
//! - `api.counter` (counter): calls, by path and method
//! - `api.duration` (histogram, seconds): latency distribution
//! - `api.request.size` / `api.response.size` (histogram, bytes)
//! - `api.responses` (counter): responses by status code
//! - `api.errors` (counter): inner errors and responses with status >= 400
//!
//! # Design Decisions
//! - Instruments are built once per layer and shared by clone
//! - Generic over the inner service so errors pass through untouched

use std::future::Future;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::HttpBody;
use axum::http::header::CONTENT_LENGTH;
use axum::http::{HeaderMap, Request, Response};
use futures_util::future::BoxFuture;
use opentelemetry::metrics::{Counter, Histogram, Meter};
use opentelemetry::{global, KeyValue};
use opentelemetry_semantic_conventions::attribute::{
    ERROR_TYPE, HTTP_REQUEST_METHOD, HTTP_RESPONSE_STATUS_CODE,
};
use tower::{Layer, Service};

use crate::http::request::{RequestIdExt as _, UNMATCHED_ROUTE};

/// Meter scope for the API instruments.
pub const METER_NAME: &str = "api";

/// Attribute carrying the matched route, or [`UNMATCHED_ROUTE`].
pub const PATH_ATTRIBUTE: &str = "api.path";

/// Latency buckets in seconds: 1ms up to 10s.
const DURATION_BUCKETS: &[f64] = &[
    0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Payload size buckets in bytes.
const SIZE_BUCKETS: &[f64] = &[
    0.0, 64.0, 256.0, 1024.0, 4096.0, 16384.0, 65536.0, 262144.0, 1048576.0,
];

/// Instruments recorded for every request.
#[derive(Clone)]
pub struct ApiMetrics {
    calls: Counter<u64>,
    duration: Histogram<f64>,
    request_size: Histogram<u64>,
    response_size: Histogram<u64>,
    responses: Counter<u64>,
    errors: Counter<u64>,
}

impl ApiMetrics {
    pub fn new(meter: &Meter) -> Self {
        Self {
            calls: meter
                .u64_counter("api.counter")
                .with_description("Number of API calls.")
                .with_unit("{call}")
                .build(),
            duration: meter
                .f64_histogram("api.duration")
                .with_description("The duration of api execution.")
                .with_unit("s")
                .with_boundaries(DURATION_BUCKETS.to_vec())
                .build(),
            request_size: meter
                .u64_histogram("api.request.size")
                .with_description("Size of request bodies.")
                .with_unit("By")
                .with_boundaries(SIZE_BUCKETS.to_vec())
                .build(),
            response_size: meter
                .u64_histogram("api.response.size")
                .with_description("Size of response bodies.")
                .with_unit("By")
                .with_boundaries(SIZE_BUCKETS.to_vec())
                .build(),
            responses: meter
                .u64_counter("api.responses")
                .with_description("Number of API responses by status code.")
                .with_unit("{response}")
                .build(),
            errors: meter
                .u64_counter("api.errors")
                .with_description("Number of failed API calls.")
                .with_unit("{error}")
                .build(),
        }
    }

    /// Instruments bound to the globally registered meter provider.
    pub fn from_global() -> Self {
        Self::new(&global::meter(METER_NAME))
    }
}

/// [`Layer`] applying [`MetricsService`].
#[derive(Clone)]
pub struct MetricsLayer {
    metrics: ApiMetrics,
}

impl MetricsLayer {
    pub fn new(metrics: ApiMetrics) -> Self {
        Self { metrics }
    }
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService {
            inner,
            metrics: self.metrics.clone(),
        }
    }
}

#[derive(Clone)]
pub struct MetricsService<S> {
    inner: S,
    metrics: ApiMetrics,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for MetricsService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ReqBody: HttpBody + Send + 'static,
    ResBody: HttpBody + Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        // Use the instance that was driven to readiness.
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);

        let metrics = self.metrics.clone();
        let attributes = vec![
            KeyValue::new(
                PATH_ATTRIBUTE,
                request.route().unwrap_or_else(|| UNMATCHED_ROUTE.to_owned()),
            ),
            KeyValue::new(HTTP_REQUEST_METHOD, request.method().to_string()),
        ];

        metrics.calls.add(1, &attributes);
        metrics
            .request_size
            .record(body_size(request.headers(), request.body()), &attributes);

        Box::pin(record_outcome(metrics, attributes, inner, request))
    }
}

fn record_outcome<S, ReqBody, ResBody>(
    metrics: ApiMetrics,
    mut attributes: Vec<KeyValue>,
    mut inner: S,
    request: Request<ReqBody>,
) -> impl Future<Output = Result<Response<ResBody>, S::Error>>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    ResBody: HttpBody,
{
    let started = Instant::now();
    let call = inner.call(request);

    async move {
        let result = call.await;
        let elapsed = started.elapsed().as_secs_f64();

        match &result {
            Ok(response) => {
                let status = response.status();
                attributes.push(KeyValue::new(
                    HTTP_RESPONSE_STATUS_CODE,
                    i64::from(status.as_u16()),
                ));

                metrics.duration.record(elapsed, &attributes);
                metrics
                    .response_size
                    .record(body_size(response.headers(), response.body()), &attributes);
                metrics.responses.add(1, &attributes);

                if status.as_u16() >= 400 {
                    attributes.push(KeyValue::new(ERROR_TYPE, status.as_str().to_owned()));
                    metrics.errors.add(1, &attributes);
                }
            }
            Err(_) => {
                attributes.push(KeyValue::new(ERROR_TYPE, "_OTHER"));
                metrics.duration.record(elapsed, &attributes);
                metrics.errors.add(1, &attributes);
            }
        }

        result
    }
}

/// `Content-Length` if declared, otherwise the body's size hint.
fn body_size<B: HttpBody>(headers: &HeaderMap, body: &B) -> u64 {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .unwrap_or_else(|| {
            let hint = body.size_hint();
            hint.exact().unwrap_or_else(|| hint.lower())
        })
}
