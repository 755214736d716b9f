//! Response status capture.
//!
//! The inner service's response is a value handed back through a future, so
//! the interceptor sits around that future: it awaits it, remembers the
//! status it carried, and hands the result back untouched.

use axum::http::{Response, StatusCode};
use std::future::Future;

/// Remembers the status code of the response produced by an inner service.
///
/// Starts at `200 OK`, the status a response has when the handler never sets
/// one explicitly.
#[derive(Debug, Clone, Copy)]
pub struct StatusInterceptor {
    observed: StatusCode,
}

impl Default for StatusInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusInterceptor {
    pub fn new() -> Self {
        Self {
            observed: StatusCode::OK,
        }
    }

    /// Await the inner response, observing its status on the way through.
    ///
    /// An inner error is recorded as 500 and returned as-is.
    pub async fn intercept<F, B, E>(&mut self, response: F) -> Result<Response<B>, E>
    where
        F: Future<Output = Result<Response<B>, E>>,
    {
        let result = response.await;
        self.observed = match &result {
            Ok(response) => response.status(),
            Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        result
    }

    /// Mark the response as failed without one ever resolving.
    pub fn server_error(&mut self) {
        self.observed = StatusCode::INTERNAL_SERVER_ERROR;
    }

    /// Status seen so far; `200 OK` until the inner response resolves.
    pub fn observed_status(&self) -> StatusCode {
        self.observed
    }
}
