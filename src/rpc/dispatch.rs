//! RPC dispatch engine.
//!
//! # Request lifecycle
//! ```text
//! POST /api3/json
//!     → parse envelope           (failure → 400, empty body, nothing else)
//!     → log headline
//!     → registry lookup          (unknown → passthrough)
//!     → invoke handler on the blocking pool, timed (over budget → passthrough)
//!     → translate Outcome:
//!         Success   → 200 application/json
//!         Prebuilt  → verbatim
//!         Fault     → 200 {exception, error_code, message}
//!         Forward   → passthrough, local result discarded
//!         Internal  → 500
//!     → log timing, mark response as access-logged
//! ```

use std::time::Instant;

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{header, request::Parts, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde_json::Value;

use crate::error::GatewayError;
use crate::http::access_log::AccessLogged;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::proxy::passthrough::passthrough;
use crate::rpc::envelope::{Envelope, Params};
use crate::rpc::outcome::{Fault, Outcome, PassthroughSignal, PrebuiltResponse};

/// Largest envelope accepted from a client.
pub const MAX_ENVELOPE_BYTES: usize = 64 * 1024 * 1024;

const ROUTE: &str = "api3";

/// Entry point for `POST /api3/json`.
pub async fn json_api(State(state): State<AppState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let body = match to_bytes(body, MAX_ENVELOPE_BYTES).await {
        Ok(body) => body,
        Err(e) => {
            tracing::debug!(error = %e, "Failed to read request body");
            return malformed();
        }
    };
    dispatch(&state, &parts, body).await
}

/// Entry point for `POST /<prefix>/api3/json`; anything else under the
/// catch-all route is not ours.
pub async fn prefixed_json_api(state: State<AppState>, request: Request<Body>) -> Response {
    if !request.uri().path().ends_with(crate::upstream::API3_PATH) {
        return StatusCode::NOT_FOUND.into_response();
    }
    if request.method() != axum::http::Method::POST {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }
    json_api(state, request).await
}

/// Answer one RPC body locally or forward it.
pub async fn dispatch(state: &AppState, parts: &Parts, body: Bytes) -> Response {
    let request_start = Instant::now();

    let envelope = match Envelope::parse(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::debug!(error = %e, "Rejecting malformed envelope");
            metrics::record_request(ROUTE, "malformed", 400, request_start);
            return malformed();
        }
    };

    tracing::info!("{}", envelope.headline());

    let Some(handler) = state.registry.lookup(&envelope.method_name) else {
        tracing::info!(
            "Passing through \"{}\" due to unknown API method",
            envelope.method_name
        );
        return forward(state, parts, body, request_start).await;
    };

    let start = Instant::now();
    let params = envelope.method_params.clone();
    let task = tokio::task::spawn_blocking(move || handler.call(&params));
    let outcome = match tokio::time::timeout(state.handler_timeout, task).await {
        Ok(joined) => {
            joined.unwrap_or_else(|e| Outcome::Internal(format!("handler task failed: {e}")))
        }
        // The blocking call runs to completion on its own; its result is dropped.
        Err(_) => Outcome::Forward(PassthroughSignal::with_kind(
            "HandlerTimeout",
            format!("no local answer within {:?}", state.handler_timeout),
            &envelope.method_params,
        )),
    };

    let mut entity_count = None;
    let (response, label) = match outcome {
        Outcome::Success(result) => {
            entity_count = result
                .get("entities")
                .and_then(Value::as_array)
                .map(Vec::len);
            (success(&result), "local")
        }
        Outcome::Prebuilt(prebuilt) => (prebuilt_response(prebuilt), "local"),
        Outcome::Fault(fault) => {
            tracing::warn!("{}", fault);
            (fault_response(&fault), "fault")
        }
        Outcome::Forward(signal) => {
            log_passthrough(&envelope.method_name, &signal);
            let response = forward(state, parts, body, request_start).await;
            (response, "passthrough")
        }
        Outcome::Internal(message) => {
            tracing::error!(method = %envelope.method_name, "Handler contract violation: {}", message);
            let error = GatewayError::Internal(message);
            metrics::record_request(ROUTE, "error", error.status().as_u16(), request_start);
            return error.into_response();
        }
    };

    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    match entity_count {
        Some(count) => tracing::info!(
            "Returned {} {}s in {:.1}ms",
            count,
            envelope.entity_type().unwrap_or("entity"),
            elapsed_ms
        ),
        None => tracing::info!("Returned in {:.1}ms", elapsed_ms),
    }

    if label != "passthrough" {
        metrics::record_request(ROUTE, label, response.status().as_u16(), request_start);
    }
    mark_logged(response)
}

/// Hand the original request to the passthrough engine.
async fn forward(state: &AppState, parts: &Parts, body: Bytes, start: Instant) -> Response {
    match passthrough(&state.upstream, state.analyzer.clone(), &parts.headers, body).await {
        Ok(response) => {
            metrics::record_request(ROUTE, "passthrough", response.status().as_u16(), start);
            response
        }
        Err(e) => {
            tracing::error!(error = %e, "Upstream error");
            let error = GatewayError::from(e);
            metrics::record_request(ROUTE, "error", error.status().as_u16(), start);
            error.into_response()
        }
    }
}

fn log_passthrough(method_name: &str, signal: &PassthroughSignal) {
    let params = &signal.method_params;
    let dump = if params.is_empty() {
        String::new()
    } else {
        format!("\n{}", sorted_pretty_json(params))
    };
    tracing::info!(
        "Passing through {} due to {}(\"{}\"):{}",
        method_name,
        signal.kind,
        signal.reason,
        dump
    );
}

/// Pretty-printed JSON (4-space indent) with keys sorted at every level.
fn sorted_pretty_json(params: &Params) -> String {
    let value = sort_keys(&Value::Object(params.clone()));
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    if serde::Serialize::serialize(&value, &mut serializer).is_err() {
        return String::new();
    }
    String::from_utf8(out).unwrap_or_default()
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key.clone(), sort_keys(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

fn malformed() -> Response {
    StatusCode::BAD_REQUEST.into_response()
}

fn json_body(status: StatusCode, body: Vec<u8>) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

fn success(result: &Params) -> Response {
    match serde_json::to_vec(result) {
        Ok(body) => json_body(StatusCode::OK, body),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode handler result");
            GatewayError::Internal(e.to_string()).into_response()
        }
    }
}

fn fault_response(fault: &Fault) -> Response {
    match serde_json::to_vec(&fault.body()) {
        Ok(body) => json_body(StatusCode::OK, body),
        Err(e) => GatewayError::Internal(e.to_string()).into_response(),
    }
}

fn prebuilt_response(prebuilt: PrebuiltResponse) -> Response {
    let mut response = Response::new(Body::from(prebuilt.body));
    *response.status_mut() = prebuilt.status;
    for (name, value) in prebuilt.headers {
        response.headers_mut().append(name, value);
    }
    response
}

fn mark_logged(mut response: Response) -> Response {
    response.extensions_mut().insert(AccessLogged);
    response
}
