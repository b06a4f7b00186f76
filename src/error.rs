//! Top-level gateway errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::config::ConfigError;
use crate::upstream::UpstreamError;

/// Errors that end a request or abort startup.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("cache initialization failed: {0}")]
    Cache(String),

    #[error("internal handler error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Details stay in the logs; the caller only sees the status.
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        self.status().into_response()
    }
}
