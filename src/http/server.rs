//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing spans, access log, timeout on local routes)
//! - Bind server to listener with graceful shutdown
//! - Route RPC traffic to the dispatch engine and file traffic to the binary proxy

use axum::{
    body::Body,
    middleware,
    routing::{any, get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::http::access_log::access_log_middleware;
use crate::http::handlers::{ping, redirect_to_upstream};
use crate::lifecycle::ShutdownSignal;
use crate::observability::tracing::make_request_span;
use crate::proxy::binary::proxy_binary;
use crate::proxy::stream::{NoopAnalyzer, PassthroughAnalyzer};
use crate::rpc::dispatch::{json_api, prefixed_json_api};
use crate::rpc::registry::MethodRegistry;
use crate::upstream::UpstreamClient;

/// Application state injected into handlers.
///
/// Built once at startup; every field is read-only while serving.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<MethodRegistry>,
    pub upstream: UpstreamClient,
    pub analyzer: Arc<dyn PassthroughAnalyzer>,
    /// Budget for one local handler call before the request falls back upstream.
    pub handler_timeout: Duration,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    /// Create a new HTTP server answering `registry` methods locally.
    pub fn new(config: GatewayConfig, registry: MethodRegistry) -> Result<Self, GatewayError> {
        Self::with_analyzer(config, registry, Arc::new(NoopAnalyzer))
    }

    /// Like [`HttpServer::new`], with a hook receiving passthrough responses.
    pub fn with_analyzer(
        config: GatewayConfig,
        registry: MethodRegistry,
        analyzer: Arc<dyn PassthroughAnalyzer>,
    ) -> Result<Self, GatewayError> {
        let upstream = UpstreamClient::new(&config.upstream)?;

        tracing::info!(
            upstream = %upstream.base_url(),
            methods = ?registry.method_names(),
            "Gateway initialized"
        );

        let state = AppState {
            registry: Arc::new(registry),
            upstream,
            analyzer,
            handler_timeout: Duration::from_secs(config.timeouts.request_secs),
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Only routes answered entirely by the gateway sit behind the timeout
    /// layer. Forwarded traffic runs for as long as upstream takes.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let local = Router::new()
            .route("/ping", get(ping))
            .route("/", any(redirect_to_upstream))
            .route("/detail/{*path}", any(redirect_to_upstream))
            .route("/page/{*path}", any(redirect_to_upstream))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

        let forwarded = Router::new()
            .route("/api3/json", post(json_api))
            .route("/file_serve/{*path}", get(proxy_binary).post(proxy_binary))
            .route("/thumbnail/{*path}", get(proxy_binary).post(proxy_binary))
            .route("/upload/{*path}", get(proxy_binary).post(proxy_binary))
            .route("/{*path}", any(prefixed_json_api));

        local
            .merge(forwarded)
            .with_state(state)
            .layer(middleware::from_fn(access_log_middleware))
            .layer(TraceLayer::new_for_http().make_span_with(make_request_span::<Body>))
    }

    /// The fully layered router, for serving it elsewhere.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}
