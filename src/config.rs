//! Configuration parsing for the Lumen service.
//!
//! Supports:
//! - CLI arguments via clap
//! - Environment variable overrides
//! - Sensible defaults for a local collector

use clap::{Parser, ValueEnum};
use std::time::Duration;

use crate::observability::provider::TelemetryConfig;

/// How metrics leave the process.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetricsExporterKind {
    /// Pull: expose a Prometheus text endpoint at `/metrics`.
    #[default]
    Prometheus,
    /// Push: periodically export over OTLP/gRPC to the collector endpoint.
    Otlp,
}

/// Lumen: an HTTP service instrumented with OpenTelemetry.
#[derive(Parser, Debug, Clone)]
#[command(name = "lumen")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Host address to bind to
    #[arg(long, env = "LUMEN_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "LUMEN_PORT", default_value_t = 9000)]
    pub port: u16,

    /// Service name reported in the telemetry resource
    #[arg(long, env = "OTEL_SERVICE_NAME", default_value = "sample")]
    pub service_name: String,

    /// Service version reported in the telemetry resource
    #[arg(long, env = "LUMEN_SERVICE_VERSION", default_value = "1.0.0")]
    pub service_version: String,

    /// OpenTelemetry collector endpoint (optional for the Prometheus exporter)
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otel_endpoint: Option<String>,

    /// Metrics export strategy
    #[arg(
        long,
        env = "LUMEN_METRICS_EXPORTER",
        value_enum,
        default_value_t = MetricsExporterKind::Prometheus
    )]
    pub metrics_exporter: MetricsExporterKind,

    /// Interval between OTLP metric pushes, in seconds
    #[arg(long, env = "LUMEN_EXPORT_INTERVAL_SECS", default_value_t = 3)]
    pub export_interval_secs: u64,

    /// Per-request timeout, in seconds
    #[arg(long, env = "LUMEN_REQUEST_TIMEOUT_SECS", default_value_t = 10)]
    pub request_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Parse configuration from CLI arguments and environment.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Telemetry settings derived from this configuration.
    pub fn telemetry(&self) -> TelemetryConfig {
        TelemetryConfig {
            service_name: self.service_name.clone(),
            service_version: self.service_version.clone(),
            collector_endpoint: self.otel_endpoint.clone(),
            metrics_exporter: self.metrics_exporter,
            export_interval: Duration::from_secs(self.export_interval_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Create a default configuration for testing.
    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0, // Random port
            log_level: "debug".into(),
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 9000,
            service_name: "sample".into(),
            service_version: "1.0.0".into(),
            otel_endpoint: None,
            metrics_exporter: MetricsExporterKind::Prometheus,
            export_interval_secs: 3,
            request_timeout_secs: 10,
            log_level: "info".into(),
        }
    }
}
