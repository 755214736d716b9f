//! HTTP middleware.
//!
//! - [`metrics`]: request counter and latency histogram per request
//! - [`status`]: response status capture used by the metrics middleware

pub mod metrics;
pub mod status;

pub use metrics::{HttpMetrics, HttpMetricsLayer, HttpMetricsService, InstrumentFactory};
pub use status::StatusInterceptor;
