//! Streaming passthrough of JSON-RPC calls to the fallback endpoint.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
};
use bytes::Bytes;

use crate::proxy::headers::forwardable_request_headers;
use crate::proxy::stream::{rechunk, CapturedStream, PassthroughAnalyzer};
use crate::upstream::{UpstreamClient, UpstreamError};

/// Replay an RPC request against the fallback endpoint.
///
/// A `200` is streamed back as it arrives and tapped for `analyzer`. Any
/// other status is read in full and returned with upstream's exact body.
/// Either way the caller sees a decoded body, so the call never negotiates
/// a content coding with upstream.
pub async fn passthrough(
    upstream: &UpstreamClient,
    analyzer: Arc<dyn PassthroughAnalyzer>,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response, UpstreamError> {
    let remote = upstream
        .post_api(passthrough_request_headers(headers), body)
        .await?;

    let status = remote.status();
    if status == StatusCode::OK {
        let chunks = rechunk(remote.bytes_stream(), upstream.chunk_size());
        let body = Body::from_stream(CapturedStream::new(chunks, analyzer));
        return Ok(json_response(status, body));
    }

    tracing::debug!(status = status.as_u16(), "Relaying upstream error status");
    let text = remote.bytes().await?;
    Ok(json_response(status, Body::from(text)))
}

fn json_response(status: StatusCode, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

/// Forwardable headers minus `Accept-Encoding`.
fn passthrough_request_headers(headers: &HeaderMap) -> HeaderMap {
    let mut out = forwardable_request_headers(headers);
    out.remove(header::ACCEPT_ENCODING);
    out
}
