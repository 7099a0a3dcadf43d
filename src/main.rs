//! hello-otel
//!
//! A single `GET /hello` endpoint instrumented end to end with OpenTelemetry.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────▶ request id ─▶ timeout ─▶ server span ─▶ metrics ─▶ request logs ─▶ /hello
//!
//!     Telemetry
//!     spans, metrics, log records ─▶ stdout (default) | OTLP/gRPC
//! ```
//!
//! # Startup order
//! config → telemetry providers → tracing subscriber → listener → serve
//!
//! # Shutdown order
//! signal → server drains → telemetry providers flushed and shut down

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;

use hello_otel::config::{load_config, validation::validate_config, ConfigError};
use hello_otel::lifecycle::{wait_for_signal, Shutdown};
use hello_otel::observability::{init_subscriber, ApiMetrics, Telemetry};
use hello_otel::HttpServer;

#[derive(Parser)]
#[command(name = "hello-otel")]
#[command(about = "OpenTelemetry instrumented hello service", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load(&cli) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("hello-otel: {error}");
            return ExitCode::FAILURE;
        }
    };

    let mut telemetry = match Telemetry::init(&config) {
        Ok(telemetry) => telemetry,
        Err(error) => {
            eprintln!("hello-otel: {error}");
            if let Some(cleanup) = error.cleanup {
                eprintln!("hello-otel: {cleanup}");
            }
            return ExitCode::FAILURE;
        }
    };

    if let Some(logger_provider) = telemetry.logger_provider() {
        if let Err(error) = init_subscriber(&config.logging, logger_provider) {
            eprintln!("hello-otel: {error}");
            return finish(&mut telemetry, ExitCode::FAILURE);
        }
    }

    tracing::info!(
        service = %config.service.name,
        version = %config.service.version,
        protocol = ?config.telemetry.protocol,
        bind_address = %config.listener.bind_address,
        "Configuration loaded"
    );

    let listener = match TcpListener::bind(&config.listener.bind_address).await {
        Ok(listener) => listener,
        Err(error) => {
            tracing::error!(
                bind_address = %config.listener.bind_address,
                error = %error,
                "Failed to bind listener"
            );
            return finish(&mut telemetry, ExitCode::FAILURE);
        }
    };

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(error) = wait_for_signal().await {
                tracing::error!(error = %error, "Signal handling failed");
            }
            shutdown.trigger();
        }
    });

    let server = HttpServer::new(config, ApiMetrics::from_global());
    let code = match server.run(listener, receiver).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(error = %error, "HTTP server failed");
            ExitCode::FAILURE
        }
    };

    finish(&mut telemetry, code)
}

fn load(cli: &Cli) -> Result<hello_otel::ServiceConfig, ConfigError> {
    let mut config = load_config(cli.config.as_deref())?;

    if let Some(bind) = &cli.bind {
        config.listener.bind_address = bind.clone();
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    Ok(config)
}

fn finish(telemetry: &mut Telemetry, code: ExitCode) -> ExitCode {
    tracing::info!("Flushing telemetry");

    match telemetry.shutdown() {
        Ok(()) => code,
        Err(error) => {
            eprintln!("hello-otel: {error}");
            ExitCode::FAILURE
        }
    }
}
