//! Path-based binary proxy for upload, download and thumbnail traffic.

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    response::{IntoResponse, Response},
};

use crate::error::GatewayError;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::proxy::headers::{forwardable_request_headers, strip_hop_by_hop};
use crate::proxy::stream::rechunk;

/// Forward the request to the same path (and query) on the fallback server.
///
/// Bodies stream in both directions; neither the upload nor the download is
/// ever held in memory as a whole.
pub async fn proxy_binary(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let (parts, body) = request.into_parts();

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| parts.uri.path());
    let url = state.upstream.url_for(path_and_query);

    let outbound_body = if has_body(&parts.headers) {
        Some(reqwest::Body::wrap_stream(body.into_data_stream()))
    } else {
        None
    };

    let remote = match state
        .upstream
        .send(
            parts.method.clone(),
            url,
            forwardable_request_headers(&parts.headers),
            outbound_body,
        )
        .await
    {
        Ok(remote) => remote,
        Err(e) => {
            tracing::error!(method = %parts.method, path = %parts.uri.path(), error = %e, "Upstream error");
            let error = GatewayError::from(e);
            metrics::record_request("binary", "error", error.status().as_u16(), start);
            return error.into_response();
        }
    };

    let status = remote.status();
    let headers = strip_hop_by_hop(remote.headers());
    let body = Body::from_stream(rechunk(remote.bytes_stream(), state.upstream.chunk_size()));

    tracing::debug!(status = status.as_u16(), path = %parts.uri.path(), "Relaying binary response");
    metrics::record_request("binary", "proxy", status.as_u16(), start);

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// Whether the inbound request announces a body.
fn has_body(headers: &HeaderMap) -> bool {
    if headers.contains_key(header::TRANSFER_ENCODING) {
        return true;
    }
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .is_some_and(|len| len > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_has_body() {
        let mut headers = HeaderMap::new();
        assert!(!has_body(&headers));

        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("0"));
        assert!(!has_body(&headers));

        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("12"));
        assert!(has_body(&headers));

        let mut chunked = HeaderMap::new();
        chunked.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        assert!(has_body(&chunked));
    }
}
