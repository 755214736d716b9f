//! HTTP server setup and lifecycle.
//!
//! Configures the axum router with:
//! - The sample dice-roll handler
//! - Health check and Prometheus scrape endpoints
//! - Request logging, panic recovery, timeout and content-type layers
//! - The HTTP metrics middleware around every route
//! - Graceful shutdown support

use axum::http::{header, HeaderValue};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::TelemetryError;
use crate::middleware::HttpMetrics;
use crate::observability::prometheus::{self, health_handler, PrometheusState};
use crate::observability::provider::Telemetry;
use crate::service::{handle_roll, DiceState};

/// Build the application router.
///
/// Instrument creation happens here, so an error means the service must not
/// start.
pub fn create_router(
    telemetry: &Telemetry,
    request_timeout: Duration,
) -> Result<Router, TelemetryError> {
    let meter = telemetry.meter();
    let metrics = HttpMetrics::new(&meter)?;
    let dice = DiceState::new(telemetry.tracer().clone(), &meter)?;

    let mut router = Router::new()
        .route("/api", get(handle_roll))
        .with_state(Arc::new(dice))
        .route("/health", get(health_handler));

    if let Some(registry) = telemetry.prometheus_registry() {
        router = router.merge(prometheus::create_router(PrometheusState::new(
            registry.clone(),
        )));
    }

    // Outermost first: panics and timeouts become responses before the
    // metrics layer reads the status.
    Ok(router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(metrics.layer())
            .layer(CatchPanicLayer::new())
            .layer(TimeoutLayer::new(request_timeout))
            .layer(SetResponseHeaderLayer::if_not_present(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            )),
    ))
}

/// Run the Lumen HTTP server.
///
/// # Arguments
///
/// * `config` - Server configuration
/// * `router` - Application router from [`create_router`]
/// * `shutdown_rx` - Receiver for shutdown signal
///
/// # Returns
///
/// Returns when the server has shut down.
pub async fn run_server(
    config: &Config,
    router: Router,
    shutdown_rx: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    serve(listener, router, shutdown_rx).await
}

/// Serve `router` on an already bound listener until shutdown is signalled.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    mut shutdown_rx: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Starting Lumen HTTP server");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            // Wait for shutdown signal
            let _ = shutdown_rx.changed().await;
            tracing::info!("Shutdown signal received, stopping server");
        })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::provider::TelemetryConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tower::ServiceExt;

    fn test_telemetry() -> Telemetry {
        Telemetry::configure(&TelemetryConfig::new("sample", "1.0.0")).unwrap()
    }

    async fn get_text(router: &Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_router_serves_health() {
        let telemetry = test_telemetry();
        let router = create_router(&telemetry, Duration::from_secs(5)).unwrap();

        let (status, body) = get_text(&router, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_scrape_shows_api_requests() {
        let telemetry = test_telemetry();
        let router = create_router(&telemetry, Duration::from_secs(5)).unwrap();

        let (status, _) = get_text(&router, "/api?seed=1").await;
        assert_eq!(status, StatusCode::OK);

        let (status, exposition) = get_text(&router, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(exposition.contains("http_requests_total"), "{exposition}");
        assert!(exposition.contains("uri=\"/api?seed=1\""), "{exposition}");
        assert!(exposition.contains("statusCode=\"200\""), "{exposition}");
        assert!(exposition.contains("dice_rolls"), "{exposition}");
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let telemetry = test_telemetry();
        let router = create_router(&telemetry, Duration::from_secs(5)).unwrap();

        let (status, _) = get_text(&router, "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown_signal() {
        let telemetry = test_telemetry();
        let router = create_router(&telemetry, Duration::from_secs(5)).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let server = tokio::spawn(serve(listener, router, shutdown_rx));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.unwrap();
        assert!(raw.starts_with("HTTP/1.1 200"), "unexpected response: {raw}");

        shutdown_tx.send(true).unwrap();
        server.await.unwrap().unwrap();
    }
}
