//! Shared utilities for integration tests.

use std::net::SocketAddr;

use opentelemetry::metrics::MeterProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_sdk::metrics::data::{AggregatedMetrics, MetricData};
use opentelemetry_sdk::metrics::{InMemoryMetricExporter, PeriodicReader, SdkMeterProvider};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use hello_otel::config::ServiceConfig;
use hello_otel::http::HttpServer;
use hello_otel::lifecycle::Shutdown;
use hello_otel::observability::ApiMetrics;

/// A server running on an ephemeral port.
#[allow(dead_code)]
pub struct RunningServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), std::io::Error>>,
}

#[allow(dead_code)]
impl RunningServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start the service on 127.0.0.1 with a private meter provider.
#[allow(dead_code)]
pub async fn start_server(meter_provider: &SdkMeterProvider) -> RunningServer {
    let mut config = ServiceConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    let server = HttpServer::new(config, ApiMetrics::new(&meter_provider.meter("api")));
    let handle = tokio::spawn(server.run(listener, receiver));

    RunningServer {
        addr,
        shutdown,
        handle,
    }
}

/// Meter provider exporting to memory on `force_flush`.
#[allow(dead_code)]
pub fn meter_provider() -> (SdkMeterProvider, InMemoryMetricExporter) {
    let exporter = InMemoryMetricExporter::default();
    let provider = SdkMeterProvider::builder()
        .with_reader(PeriodicReader::builder(exporter.clone()).build())
        .build();
    (provider, exporter)
}

/// Data points of the u64 counter `name` from the latest export.
#[allow(dead_code)]
pub fn counter_points(
    provider: &SdkMeterProvider,
    exporter: &InMemoryMetricExporter,
    name: &str,
) -> Vec<(u64, Vec<KeyValue>)> {
    provider.force_flush().unwrap();
    let exported = exporter.get_finished_metrics().unwrap();
    let Some(latest) = exported.last() else {
        return Vec::new();
    };

    latest
        .scope_metrics()
        .flat_map(|scope| scope.metrics())
        .filter(|metric| metric.name() == name)
        .flat_map(|metric| match metric.data() {
            AggregatedMetrics::U64(MetricData::Sum(sum)) => sum
                .data_points()
                .map(|point| (point.value(), point.attributes().cloned().collect()))
                .collect::<Vec<_>>(),
            _ => panic!("{name} is not a u64 sum"),
        })
        .collect()
}

/// Sum of every data point of the u64 counter `name`.
#[allow(dead_code)]
pub fn counter_total(
    provider: &SdkMeterProvider,
    exporter: &InMemoryMetricExporter,
    name: &str,
) -> u64 {
    counter_points(provider, exporter, name)
        .iter()
        .map(|(value, _)| value)
        .sum()
}
