//! The shared HTTP client pointed at the fallback server.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, Method};
use bytes::Bytes;
use thiserror::Error;

use crate::config::UpstreamConfig;

/// Path of the JSON-RPC endpoint on the fallback server.
pub const API3_PATH: &str = "/api3/json";

/// Errors that can occur talking to the fallback server.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("invalid upstream base URL {0:?}")]
    InvalidBaseUrl(String),

    #[error("failed to build upstream client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Connection-pooled client for the fallback server.
///
/// Cloning is cheap; all clones share one pool.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    chunk_size: usize,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let base_url = config.base_url.trim().trim_end_matches('/');
        match url::Url::parse(base_url) {
            Ok(url) if url.has_host() => {}
            _ => return Err(UpstreamError::InvalidBaseUrl(config.base_url.clone())),
        }

        // Redirects belong to the caller, not to us.
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
            .build()
            .map_err(UpstreamError::Build)?;

        Ok(Self {
            http,
            base_url: Arc::from(base_url),
            chunk_size: config.chunk_size.max(1),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL of the fallback JSON-RPC endpoint.
    pub fn api_url(&self) -> String {
        self.url_for(API3_PATH)
    }

    /// Full URL for a path (and optional query) on the fallback server.
    pub fn url_for(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base_url, path_and_query)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// POST a buffered JSON-RPC body to the fallback endpoint.
    pub async fn post_api(
        &self,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<reqwest::Response, UpstreamError> {
        self.send(Method::POST, self.api_url(), headers, Some(body.into()))
            .await
    }

    /// Issue an arbitrary request; the response body is left unread.
    ///
    /// `None` sends no body at all, which keeps bodiless GETs bodiless.
    pub async fn send(
        &self,
        method: Method,
        url: String,
        headers: HeaderMap,
        body: Option<reqwest::Body>,
    ) -> Result<reqwest::Response, UpstreamError> {
        tracing::debug!(method = %method, url = %url, "Forwarding to upstream");
        let mut request = self.http.request(method, url).headers(headers);
        if let Some(body) = body {
            request = request.body(body);
        }
        Ok(request.send().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> UpstreamConfig {
        UpstreamConfig {
            base_url: base_url.to_string(),
            ..UpstreamConfig::default()
        }
    }

    #[test]
    fn test_urls() {
        let client = UpstreamClient::new(&config("https://sg.example.com/")).unwrap();
        assert_eq!(client.base_url(), "https://sg.example.com");
        assert_eq!(client.api_url(), "https://sg.example.com/api3/json");
        assert_eq!(
            client.url_for("/upload/a/b?x=1"),
            "https://sg.example.com/upload/a/b?x=1"
        );
        assert_eq!(client.chunk_size(), 8192);
    }

    #[test]
    fn test_rejects_relative_base() {
        assert!(matches!(
            UpstreamClient::new(&config("sg.example.com")),
            Err(UpstreamError::InvalidBaseUrl(_))
        ));
    }
}
