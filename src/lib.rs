//! Lumen: an HTTP service instrumented with OpenTelemetry.
//!
//! Every request is counted and timed by a tower middleware, traces are
//! exported over OTLP/gRPC, and metrics are either scraped by Prometheus or
//! pushed over OTLP.
//!
//! # Architecture
//!
//! - **Explicit providers**: tracer and meter providers live in a
//!   [`Telemetry`](observability::provider::Telemetry) value owned by the
//!   process root, not in globals
//! - **Route-agnostic metrics**: `http.requests` and `http.request.duration`
//!   recorded with `method`, `uri` and `statusCode` for every route
//! - **Invisible to clients**: the middleware never alters or fails a response
//!
//! # Modules
//!
//! - [`config`]: CLI and environment configuration
//! - [`error`]: Startup and shutdown error types
//! - [`middleware`]: HTTP metrics middleware and status capture
//! - [`observability`]: Providers, logging, scrape endpoint
//! - [`server`]: Router composition and HTTP server lifecycle
//! - [`service`]: Request handlers

// Lint configuration
#![warn(clippy::all)]
#![allow(
    clippy::module_name_repetitions, // middleware::metrics::HttpMetrics is fine
    clippy::must_use_candidate,      // Not all functions need #[must_use]
    clippy::missing_errors_doc,      // Error docs can be verbose
    clippy::missing_panics_doc,      // Panic docs can be verbose
    clippy::cast_precision_loss      // Nanosecond durations as f64 are fine
)]

pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
pub mod server;
pub mod service;
