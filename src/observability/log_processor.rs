//! Log record decoration with request-scoped attributes.

use std::time::Duration;

use opentelemetry::logs::{AnyValue, LogRecord as _};
use opentelemetry::trace::TraceContextExt as _;
use opentelemetry::{Context, InstrumentationScope, Key};
use opentelemetry_sdk::error::OTelSdkResult;
use opentelemetry_sdk::logs::{LogProcessor, SdkLogRecord};
use opentelemetry_sdk::Resource;

use crate::http::request::RequestId;

/// Derives extra attributes from the context a record is emitted in.
pub type ContextAttributes = fn(&Context) -> Vec<(Key, AnyValue)>;

/// A [`LogProcessor`] that appends context-derived attributes to every
/// record before handing it to `inner`.
#[derive(Debug)]
pub struct ContextualLogProcessor<P> {
    inner: P,
    attributes: ContextAttributes,
}

impl<P: LogProcessor> ContextualLogProcessor<P> {
    pub fn new(inner: P, attributes: ContextAttributes) -> Self {
        Self { inner, attributes }
    }

    /// Decorate with [`request_attributes`].
    pub fn with_request_attributes(inner: P) -> Self {
        Self::new(inner, request_attributes)
    }
}

impl<P: LogProcessor> LogProcessor for ContextualLogProcessor<P> {
    fn emit(&self, record: &mut SdkLogRecord, scope: &InstrumentationScope) {
        for (key, value) in Context::map_current(self.attributes) {
            record.add_attribute(key, value);
        }
        self.inner.emit(record, scope);
    }

    fn force_flush(&self) -> OTelSdkResult {
        self.inner.force_flush()
    }

    fn shutdown_with_timeout(&self, timeout: Duration) -> OTelSdkResult {
        self.inner.shutdown_with_timeout(timeout)
    }

    fn shutdown(&self) -> OTelSdkResult {
        self.inner.shutdown()
    }

    fn set_resource(&mut self, resource: &Resource) {
        self.inner.set_resource(resource);
    }
}

/// `request_id`, `trace_id` and `span_id` of the request being served.
pub fn request_attributes(cx: &Context) -> Vec<(Key, AnyValue)> {
    let mut attributes = Vec::with_capacity(3);

    if let Some(request_id) = cx.get::<RequestId>() {
        attributes.push((
            Key::from_static_str("request_id"),
            AnyValue::from(request_id.as_str().to_owned()),
        ));
    }

    let span = cx.span();
    let span_context = span.span_context();
    if span_context.is_valid() {
        attributes.push((
            Key::from_static_str("trace_id"),
            AnyValue::from(span_context.trace_id().to_string()),
        ));
        attributes.push((
            Key::from_static_str("span_id"),
            AnyValue::from(span_context.span_id().to_string()),
        ));
    }

    attributes
}
