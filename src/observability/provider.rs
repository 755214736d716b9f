//! Tracer and meter provider registry.
//!
//! Builds the OpenTelemetry providers once at startup and owns them for the
//! life of the process. Metrics leave the process either by Prometheus pull
//! (`/metrics`) or by periodic OTLP/gRPC push; traces are pushed over
//! OTLP/gRPC when a collector endpoint is configured.

use opentelemetry::metrics::{Meter, MeterProvider as _, MetricsError};
use opentelemetry::trace::{TraceError, TracerProvider as _};
use opentelemetry::KeyValue;
use opentelemetry_otlp::{Protocol, WithExportConfig};
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::{Config as TraceConfig, Tracer, TracerProvider};
use opentelemetry_sdk::{runtime, Resource};
use prometheus::Registry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::config::MetricsExporterKind;
use crate::error::{ShutdownError, TelemetryError};

/// Instrumentation scope for every meter this service creates.
pub const METER_NAME: &str = "lumen";

/// Startup settings for [`Telemetry::configure`].
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub service_version: String,
    /// OTLP/gRPC collector, e.g. `http://localhost:4317`.
    pub collector_endpoint: Option<String>,
    pub metrics_exporter: MetricsExporterKind,
    /// Push interval for the OTLP metrics reader.
    pub export_interval: Duration,
}

impl TelemetryConfig {
    /// Prometheus pull metrics, no trace export.
    pub fn new(service_name: impl Into<String>, service_version: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            service_version: service_version.into(),
            collector_endpoint: None,
            metrics_exporter: MetricsExporterKind::Prometheus,
            export_interval: Duration::from_secs(3),
        }
    }
}

/// Process-wide tracer and meter providers.
///
/// Constructed explicitly and passed to whatever composes the server. The
/// providers are flushed and released by [`Telemetry::shutdown`], or on drop
/// if shutdown was never called.
pub struct Telemetry {
    tracer_provider: TracerProvider,
    tracer: Tracer,
    meter_provider: SdkMeterProvider,
    prometheus: Option<Registry>,
    shut_down: AtomicBool,
}

impl Telemetry {
    /// Build the resource, exporters and providers.
    ///
    /// Any exporter construction failure is returned; callers should not
    /// start serving traffic without a `Telemetry`.
    pub fn configure(config: &TelemetryConfig) -> Result<Self, TelemetryError> {
        let resource = service_resource(&config.service_name, &config.service_version);

        let (meter_provider, prometheus) = match config.metrics_exporter {
            MetricsExporterKind::Prometheus => {
                let registry = Registry::new();
                let provider = prometheus_meter_provider(&registry, resource.clone())?;
                (provider, Some(registry))
            }
            MetricsExporterKind::Otlp => {
                let endpoint = config
                    .collector_endpoint
                    .as_deref()
                    .ok_or(TelemetryError::MissingEndpoint)?;
                let provider =
                    otlp_meter_provider(endpoint, resource.clone(), config.export_interval)?;
                (provider, None)
            }
        };

        let tracer_provider = match config.collector_endpoint.as_deref() {
            Some(endpoint) => otlp_tracer_provider(endpoint, resource)?,
            // Spans are still created and propagated, just never exported
            None => TracerProvider::builder()
                .with_config(TraceConfig::default().with_resource(resource))
                .build(),
        };

        let tracer = tracer_provider
            .tracer_builder(config.service_name.clone())
            .with_version(config.service_version.clone())
            .build();

        Ok(Self {
            tracer_provider,
            tracer,
            meter_provider,
            prometheus,
            shut_down: AtomicBool::new(false),
        })
    }

    /// The shared tracer, named and versioned after the service.
    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    pub fn meter_provider(&self) -> &SdkMeterProvider {
        &self.meter_provider
    }

    /// The service-scoped meter.
    pub fn meter(&self) -> Meter {
        self.meter_provider.meter(METER_NAME)
    }

    /// Registry backing `/metrics`, present only with the Prometheus exporter.
    pub fn prometheus_registry(&self) -> Option<&Registry> {
        self.prometheus.as_ref()
    }

    /// Flush and release both providers.
    ///
    /// The meter provider is shut down even when the tracer provider fails.
    /// Only the first call does any work; later calls return `Ok(())`.
    pub fn shutdown(&self) -> Result<(), ShutdownError> {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            tracing::debug!("Telemetry already shut down");
            return Ok(());
        }

        tracing::info!("Shutting down telemetry providers");
        shutdown_both(
            || self.tracer_provider.shutdown(),
            || self.meter_provider.shutdown(),
        )
    }
}

impl Drop for Telemetry {
    fn drop(&mut self) {
        // Failures are logged inside shutdown_both
        let _ = self.shutdown();
    }
}

/// Run both shutdowns, collecting every failure.
fn shutdown_both<T, M>(tracer: T, meter: M) -> Result<(), ShutdownError>
where
    T: FnOnce() -> Result<(), TraceError>,
    M: FnOnce() -> Result<(), MetricsError>,
{
    let tracer = tracer().err();
    if let Some(e) = &tracer {
        tracing::error!(error = %e, "Tracer provider shutdown failed");
    }

    let meter = meter().err();
    if let Some(e) = &meter {
        tracing::error!(error = %e, "Meter provider shutdown failed");
    }

    if tracer.is_none() && meter.is_none() {
        Ok(())
    } else {
        Err(ShutdownError { tracer, meter })
    }
}

/// SDK default resource merged with the service identity.
pub fn service_resource(service_name: &str, service_version: &str) -> Resource {
    Resource::default().merge(&Resource::new([
        KeyValue::new("service.name", service_name.to_string()),
        KeyValue::new("service.version", service_version.to_string()),
    ]))
}

/// Meter provider whose reader is collected on every scrape of `registry`.
pub fn prometheus_meter_provider(
    registry: &Registry,
    resource: Resource,
) -> Result<SdkMeterProvider, TelemetryError> {
    let exporter = opentelemetry_prometheus::exporter()
        .with_registry(registry.clone())
        .build()
        .map_err(TelemetryError::MetricsExporter)?;

    Ok(SdkMeterProvider::builder()
        .with_reader(exporter)
        .with_resource(resource)
        .build())
}

fn otlp_meter_provider(
    endpoint: &str,
    resource: Resource,
    interval: Duration,
) -> Result<SdkMeterProvider, TelemetryError> {
    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(endpoint)
        .with_protocol(Protocol::Grpc);

    opentelemetry_otlp::new_pipeline()
        .metrics(runtime::Tokio)
        .with_exporter(exporter)
        .with_resource(resource)
        .with_period(interval)
        .build()
        .map_err(TelemetryError::MetricsExporter)
}

fn otlp_tracer_provider(
    endpoint: &str,
    resource: Resource,
) -> Result<TracerProvider, TelemetryError> {
    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(endpoint)
        .with_protocol(Protocol::Grpc);

    Ok(opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(exporter)
        .with_trace_config(TraceConfig::default().with_resource(resource))
        .install_batch(runtime::Tokio)?)
}
