//! HTTP request metrics middleware.
//!
//! Key metrics:
//! - http.requests: Counter of completed requests
//! - http.request.duration: Histogram of request latency in nanoseconds
//!
//! Both are recorded once per request with the same attributes:
//! `method`, `uri` (raw request target, query included) and `statusCode`.

use axum::http::{Method, Request, Response, Uri};
use futures::future::BoxFuture;
use futures::FutureExt;
use opentelemetry::metrics::{Counter, Histogram, Meter, MetricsError};
use opentelemetry::KeyValue;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tower::{Layer, Service};

use super::status::StatusInterceptor;
use crate::error::TelemetryError;

pub const REQUESTS_COUNTER: &str = "http.requests";
pub const REQUEST_DURATION_HISTOGRAM: &str = "http.request.duration";

/// Something that can create the instruments the middleware records into.
///
/// Implemented for [`Meter`]; the SDK behind it handles concurrent recording
/// and export.
pub trait InstrumentFactory {
    fn counter(
        &self,
        name: &'static str,
        description: &'static str,
    ) -> Result<Counter<u64>, MetricsError>;

    fn histogram(
        &self,
        name: &'static str,
        description: &'static str,
        unit: &'static str,
    ) -> Result<Histogram<f64>, MetricsError>;
}

impl InstrumentFactory for Meter {
    fn counter(
        &self,
        name: &'static str,
        description: &'static str,
    ) -> Result<Counter<u64>, MetricsError> {
        self.u64_counter(name).with_description(description).try_init()
    }

    fn histogram(
        &self,
        name: &'static str,
        description: &'static str,
        unit: &'static str,
    ) -> Result<Histogram<f64>, MetricsError> {
        self.f64_histogram(name)
            .with_description(description)
            .with_unit(unit)
            .try_init()
    }
}

/// Request counter and duration histogram, created once and shared by every
/// request the middleware sees.
#[derive(Debug)]
pub struct HttpMetrics {
    requests: Counter<u64>,
    request_duration: Histogram<f64>,
}

impl HttpMetrics {
    /// Create both instruments.
    ///
    /// Fails if either instrument cannot be created; check this before
    /// serving traffic.
    pub fn new(meter: &impl InstrumentFactory) -> Result<Self, TelemetryError> {
        let requests = meter
            .counter(REQUESTS_COUNTER, "HTTP Requests Counter")
            .map_err(|source| TelemetryError::Instrument {
                name: REQUESTS_COUNTER,
                source,
            })?;

        let request_duration = meter
            .histogram(REQUEST_DURATION_HISTOGRAM, "HTTP Request Duration", "ns")
            .map_err(|source| TelemetryError::Instrument {
                name: REQUEST_DURATION_HISTOGRAM,
                source,
            })?;

        Ok(Self {
            requests,
            request_duration,
        })
    }

    /// Tower layer recording into these instruments.
    pub fn layer(self) -> HttpMetricsLayer {
        HttpMetricsLayer {
            metrics: Arc::new(self),
        }
    }

    fn record(&self, elapsed: Duration, attributes: &[KeyValue]) {
        self.request_duration.record(elapsed.as_nanos() as f64, attributes);
        self.requests.add(1, attributes);
    }
}

/// Layer wrapping a service with [`HttpMetricsService`].
#[derive(Debug, Clone)]
pub struct HttpMetricsLayer {
    metrics: Arc<HttpMetrics>,
}

impl<S> Layer<S> for HttpMetricsLayer {
    type Service = HttpMetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        HttpMetricsService {
            inner,
            metrics: Arc::clone(&self.metrics),
        }
    }
}

/// Service recording one duration and one request count per call.
#[derive(Debug, Clone)]
pub struct HttpMetricsService<S> {
    inner: S,
    metrics: Arc<HttpMetrics>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for HttpMetricsService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let recording =
            RecordingContext::start(Arc::clone(&self.metrics), req.method(), req.uri());
        let response = self.inner.call(req);
        Box::pin(instrument(recording, response))
    }
}

async fn instrument<F, B, E>(
    mut recording: RecordingContext,
    response: F,
) -> Result<Response<B>, E>
where
    F: std::future::Future<Output = Result<Response<B>, E>>,
{
    let result = AssertUnwindSafe(recording.status.intercept(response))
        .catch_unwind()
        .await;

    match result {
        Ok(result) => {
            recording.finish();
            result
        }
        Err(payload) => {
            recording.status.server_error();
            recording.finish();
            panic::resume_unwind(payload)
        }
    }
}

/// Per-request state between entry and metric emission.
///
/// Recording happens exactly once: on [`RecordingContext::finish`], or on
/// drop if the request future is abandoned mid-flight, using whatever status
/// has been observed by then. A panic in the inner service is recorded as 500.
struct RecordingContext {
    metrics: Option<Arc<HttpMetrics>>,
    start: Instant,
    method: Method,
    uri: Uri,
    status: StatusInterceptor,
}

impl RecordingContext {
    fn start(metrics: Arc<HttpMetrics>, method: &Method, uri: &Uri) -> Self {
        Self {
            metrics: Some(metrics),
            start: Instant::now(),
            method: method.clone(),
            uri: uri.clone(),
            status: StatusInterceptor::new(),
        }
    }

    fn finish(mut self) {
        self.record();
    }

    fn record(&mut self) {
        let Some(metrics) = self.metrics.take() else {
            return;
        };

        let elapsed = self.start.elapsed();
        let status = self.status.observed_status();
        let attributes = [
            KeyValue::new("method", self.method.as_str().to_owned()),
            KeyValue::new("uri", self.uri.to_string()),
            KeyValue::new("statusCode", i64::from(status.as_u16())),
        ];

        metrics.record(elapsed, &attributes);

        tracing::trace!(
            method = %self.method,
            uri = %self.uri,
            status = status.as_u16(),
            elapsed_ns = elapsed.as_nanos() as u64,
            "Recorded request metrics"
        );
    }
}

impl Drop for RecordingContext {
    fn drop(&mut self) {
        self.record();
    }
}
