//! Lumen: an HTTP service instrumented with OpenTelemetry.
//!
//! # Usage
//!
//! ```bash
//! lumen --port 9000 --otel-endpoint http://localhost:4317 --metrics-exporter prometheus
//! ```
//!
//! Environment variables can also be used:
//! - `LUMEN_PORT`: Port to listen on
//! - `OTEL_SERVICE_NAME`: Service name in the telemetry resource
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: Collector for traces (and OTLP metrics)
//! - `LUMEN_METRICS_EXPORTER`: `prometheus` (scrape `/metrics`) or `otlp`
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)

use anyhow::Context;
use lumen::config::Config;
use lumen::observability::provider::Telemetry;
use lumen::observability::tracing::init_tracing;
use lumen::server::{create_router, run_server};
use tokio::sync::watch;

/// Print startup banner with version and configuration.
fn print_banner(config: &Config) {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        r#"
  Lumen v{} - instrumented HTTP service

  Configuration:
    Address:    {}:{}
    Service:    {} {}
    Collector:  {}
    Metrics:    {:?}
    Log Level:  {}

  Press Ctrl+C to shutdown gracefully.
"#,
        version,
        config.host,
        config.port,
        config.service_name,
        config.service_version,
        config.otel_endpoint.as_deref().unwrap_or("none"),
        config.metrics_exporter,
        config.log_level
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse configuration from CLI arguments and environment
    let config = Config::parse_args();

    // Exporter failures are fatal: never serve without telemetry
    let telemetry_config = config.telemetry();
    let telemetry =
        Telemetry::configure(&telemetry_config).context("failed to configure telemetry")?;

    // Initialize tracing/logging, bridged into the service tracer
    init_tracing(&config.log_level, telemetry.tracer().clone());

    // Providers are built before the subscriber exists, so report them here
    tracing::info!(
        service = %telemetry_config.service_name,
        version = %telemetry_config.service_version,
        endpoint = telemetry_config.collector_endpoint.as_deref().unwrap_or("none"),
        exporter = ?telemetry_config.metrics_exporter,
        "Telemetry providers configured"
    );

    let router = create_router(&telemetry, config.request_timeout())
        .context("failed to create HTTP metrics instruments")?;

    // Print startup banner
    print_banner(&config);

    // Create shutdown signal channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Spawn signal handler task
    tokio::spawn(async move {
        // Wait for SIGTERM or SIGINT (Ctrl+C)
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm =
                signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

            tokio::select! {
                _ = ctrl_c => {
                    tracing::info!("Received SIGINT (Ctrl+C), initiating shutdown...");
                }
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, initiating shutdown...");
                }
            }
        }

        #[cfg(not(unix))]
        {
            ctrl_c.await.expect("failed to listen for ctrl+c");
            tracing::info!("Received Ctrl+C, initiating shutdown...");
        }

        // Signal shutdown
        let _ = shutdown_tx.send(true);
    });

    // Run the server
    let served = run_server(&config, router, shutdown_rx).await;

    // Flush telemetry even if the server failed
    if let Err(e) = tokio::task::block_in_place(|| telemetry.shutdown()) {
        tracing::error!(error = %e, "Telemetry shutdown incomplete");
    }

    served.context("HTTP server failed")?;

    tracing::info!("Lumen shutdown complete");
    Ok(())
}
