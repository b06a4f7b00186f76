//! Header filtering across the proxy boundary.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers (both directions)
//! - Drop the inbound `Host` (it names the gateway, not the upstream)

use axum::http::{header, HeaderMap, HeaderName};

/// Headers meaningful only to a single transport connection.
pub const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    // HeaderName is always lowercase.
    HOP_BY_HOP_HEADERS.contains(&name.as_str())
}

/// Copy of `headers` without the hop-by-hop set. Order and repeated values are kept.
pub fn strip_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if !is_hop_by_hop(name) {
            out.append(name.clone(), value.clone());
        }
    }
    out
}

/// Headers to send upstream for an inbound request.
pub fn forwardable_request_headers(headers: &HeaderMap) -> HeaderMap {
    let mut out = strip_hop_by_hop(headers);
    out.remove(header::HOST);
    out
}
