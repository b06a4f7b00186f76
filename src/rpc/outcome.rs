//! Handler outcomes and the fault/passthrough taxonomy.
//!
//! Handlers never throw: every invocation ends in exactly one [`Outcome`],
//! which the dispatch engine matches on exhaustively.

use axum::http::{HeaderName, HeaderValue, StatusCode};
use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;

use crate::rpc::envelope::Params;

/// An application-level error acknowledged with a transport-success status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} ({code}): {message}")]
pub struct Fault {
    /// Name of the fault family, used in log lines.
    pub kind: &'static str,
    pub code: i64,
    pub message: String,
}

impl Fault {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self::with_kind("Fault", code, message)
    }

    pub fn with_kind(kind: &'static str, code: i64, message: impl Into<String>) -> Self {
        Self {
            kind,
            code,
            message: message.into(),
        }
    }

    /// The wire body for this fault.
    pub fn body(&self) -> FaultBody<'_> {
        FaultBody {
            exception: true,
            error_code: self.code,
            message: &self.message,
        }
    }
}

/// JSON payload returned to the caller for a [`Fault`].
#[derive(Debug, Serialize)]
pub struct FaultBody<'a> {
    pub exception: bool,
    pub error_code: i64,
    pub message: &'a str,
}

/// A handler's decision that the real upstream must answer this request.
#[derive(Debug, Clone, PartialEq)]
pub struct PassthroughSignal {
    /// Name of the signal family, used in log lines.
    pub kind: &'static str,
    pub reason: String,
    /// The method params the handler was given, echoed for diagnostics.
    pub method_params: Params,
}

impl PassthroughSignal {
    pub fn new(reason: impl Into<String>, method_params: &Params) -> Self {
        Self::with_kind("Passthrough", reason, method_params)
    }

    pub fn with_kind(kind: &'static str, reason: impl Into<String>, method_params: &Params) -> Self {
        Self {
            kind,
            reason: reason.into(),
            method_params: method_params.clone(),
        }
    }
}

/// A complete response a handler built itself; relayed verbatim.
#[derive(Debug, Clone)]
pub struct PrebuiltResponse {
    pub body: Bytes,
    pub status: StatusCode,
    pub headers: Vec<(HeaderName, HeaderValue)>,
}

/// Everything a method handler can produce.
#[derive(Debug)]
pub enum Outcome {
    /// Result mapping, sent as `200 application/json`.
    Success(Params),
    /// Pre-built (body, status, headers) triple.
    Prebuilt(PrebuiltResponse),
    /// Application fault, sent as `200` with an exception payload.
    Fault(Fault),
    /// Defer to the upstream; any local result is discarded.
    Forward(PassthroughSignal),
    /// Handler contract violation. Never expected in a correct deployment.
    Internal(String),
}

impl From<Fault> for Outcome {
    fn from(fault: Fault) -> Self {
        Outcome::Fault(fault)
    }
}

impl From<PassthroughSignal> for Outcome {
    fn from(signal: PassthroughSignal) -> Self {
        Outcome::Forward(signal)
    }
}
