//! Per-request spans.
//!
//! Every inbound request gets a span carrying a fresh request ID, so the
//! dispatch engine's headline, fault and timing lines can be correlated.
//! The ID lives only in logs; nothing is added to forwarded headers.

use axum::http::Request;
use tracing::Span;
use uuid::Uuid;

/// `make_span_with` callback for `tower_http::trace::TraceLayer`.
pub fn make_request_span<B>(request: &Request<B>) -> Span {
    let request_id = Uuid::new_v4();
    tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    )
}
