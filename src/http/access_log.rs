//! Generic access log.
//!
//! One line per response, unless the response carries [`AccessLogged`]:
//! the dispatch engine logs its own timing and marks what it handled.

use std::time::Instant;

use axum::{body::Body, http::Request, middleware::Next, response::Response};

/// Response extension meaning "already logged, skip the access line".
#[derive(Debug, Clone, Copy)]
pub struct AccessLogged;

pub async fn access_log_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    let response = next.run(request).await;

    if response.extensions().get::<AccessLogged>().is_none() {
        tracing::info!(
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "{} {} {}",
            method,
            path,
            response.status().as_u16()
        );
    }

    response
}
