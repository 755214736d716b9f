//! Test utilities for Lumen integration tests.
//!
//! Provides:
//! - A Prometheus-backed meter whose recordings can be inspected
//! - Helpers to drive a router and read recorded metric families

#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use lumen::observability::provider::{prometheus_meter_provider, service_resource};
use opentelemetry::metrics::{Meter, MeterProvider as _};
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::proto::{Metric, MetricFamily};
use prometheus::Registry;
use std::collections::HashMap;
use tower::ServiceExt;

/// Meter provider whose recordings are read back through a Prometheus
/// registry.
pub struct MetricsFixture {
    pub registry: Registry,
    pub provider: SdkMeterProvider,
}

impl MetricsFixture {
    pub fn new() -> Self {
        let registry = Registry::new();
        let provider = prometheus_meter_provider(&registry, service_resource("test", "0.0.0"))
            .expect("failed to build meter provider");
        Self { registry, provider }
    }

    pub fn meter(&self) -> Meter {
        self.provider.meter("test")
    }

    /// Recorded series of the family whose name starts with `prefix`.
    pub fn series(&self, prefix: &str) -> Vec<Metric> {
        self.registry
            .gather()
            .into_iter()
            .find(|family: &MetricFamily| family.get_name().starts_with(prefix))
            .map(|family| family.get_metric().to_vec())
            .unwrap_or_default()
    }

    /// Request counter series.
    pub fn requests(&self) -> Vec<Metric> {
        self.series("http_requests")
    }

    /// Request duration histogram series.
    pub fn durations(&self) -> Vec<Metric> {
        self.series("http_request_duration")
    }
}

impl Default for MetricsFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// The `method`, `uri` and `statusCode` labels of one series.
pub fn request_labels(metric: &Metric) -> HashMap<String, String> {
    metric
        .get_label()
        .iter()
        .filter(|l| matches!(l.get_name(), "method" | "uri" | "statusCode"))
        .map(|l| (l.get_name().to_string(), l.get_value().to_string()))
        .collect()
}

/// Expected label set for a request.
pub fn labels(method: &str, uri: &str, status: u16) -> HashMap<String, String> {
    HashMap::from([
        ("method".to_string(), method.to_string()),
        ("uri".to_string(), uri.to_string()),
        ("statusCode".to_string(), status.to_string()),
    ])
}

/// Send one request through `router` and return status and body.
pub async fn send(router: &Router, method: &str, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .expect("invalid request"),
        )
        .await
        .expect("router failed");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    (status, body.to_vec())
}
