//! Small fixed routes: liveness and redirects.

use std::time::Instant;

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
};

use crate::http::server::AppState;
use crate::observability::metrics;

/// `GET /ping`. Used by clients to assert the gateway is up.
pub async fn ping() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"))],
        "pong",
    )
}

/// `/`, `/detail/*`, `/page/*`: send the browser to the real server.
pub async fn redirect_to_upstream(State(state): State<AppState>, uri: Uri) -> Response {
    let start = Instant::now();
    let location = state.upstream.url_for(uri.path());

    let response = match HeaderValue::from_str(&location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(e) => {
            tracing::error!(location = %location, error = %e, "Unusable redirect target");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    };

    metrics::record_request("redirect", "redirect", response.status().as_u16(), start);
    response
}
