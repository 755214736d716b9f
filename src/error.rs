//! Error types for telemetry setup and teardown.

use opentelemetry::metrics::MetricsError;
use opentelemetry::trace::TraceError;
use std::fmt;
use thiserror::Error;

/// Errors raised while building providers, exporters or instruments.
///
/// All of these happen before the server accepts traffic and are fatal to
/// startup.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Failed to build trace exporter: {0}")]
    TraceExporter(#[from] TraceError),

    #[error("Failed to build metrics exporter: {0}")]
    MetricsExporter(#[source] MetricsError),

    #[error("Failed to create instrument {name}: {source}")]
    Instrument {
        name: &'static str,
        #[source]
        source: MetricsError,
    },

    #[error("OTLP metrics export requires a collector endpoint")]
    MissingEndpoint,
}

/// Outcome of shutting down both providers.
///
/// At least one field is `Some` whenever this error is returned.
#[derive(Debug)]
pub struct ShutdownError {
    pub tracer: Option<TraceError>,
    pub meter: Option<MetricsError>,
}

impl fmt::Display for ShutdownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.tracer, &self.meter) {
            (Some(t), Some(m)) => write!(
                f,
                "tracer provider shutdown failed: {t}; meter provider shutdown failed: {m}"
            ),
            (Some(t), None) => write!(f, "tracer provider shutdown failed: {t}"),
            (None, Some(m)) => write!(f, "meter provider shutdown failed: {m}"),
            (None, None) => write!(f, "provider shutdown failed"),
        }
    }
}

impl std::error::Error for ShutdownError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match (&self.tracer, &self.meter) {
            (Some(t), _) => Some(t),
            (None, Some(m)) => Some(m),
            (None, None) => None,
        }
    }
}
