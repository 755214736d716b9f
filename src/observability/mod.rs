//! OpenTelemetry observability infrastructure.
//!
//! Provides:
//! - Tracer and meter providers with OTLP or Prometheus export
//! - Structured logging bridged into OpenTelemetry traces
//! - HTTP endpoints for Prometheus scraping and health checks

pub mod prometheus;
pub mod provider;
pub mod tracing;
