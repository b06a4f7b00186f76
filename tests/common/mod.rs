//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{HeaderMap, Method, Request},
    response::Response,
    Router,
};
use bytes::Bytes;
use tokio::net::TcpListener;

use sgcache_gateway::config::GatewayConfig;
use sgcache_gateway::proxy::PassthroughAnalyzer;
use sgcache_gateway::rpc::MethodRegistry;
use sgcache_gateway::{HttpServer, Shutdown};

/// One request as the stub upstream saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// A fake fallback server recording everything it receives.
pub struct StubUpstream {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

#[allow(dead_code)]
impl StubUpstream {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

/// Start a stub upstream answering every request with `respond`.
pub async fn start_stub_upstream<F>(respond: F) -> StubUpstream
where
    F: Fn(&Recorded) -> Response + Send + Sync + 'static,
{
    start_slow_stub_upstream(Duration::ZERO, respond).await
}

/// Like [`start_stub_upstream`], holding every response back by `delay`.
#[allow(dead_code)]
pub async fn start_slow_stub_upstream<F>(delay: Duration, respond: F) -> StubUpstream
where
    F: Fn(&Recorded) -> Response + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let respond = Arc::new(respond);

    let recorded = requests.clone();
    let app = Router::new().fallback(move |request: Request<Body>| {
        let recorded = recorded.clone();
        let respond = respond.clone();
        async move {
            let (parts, body) = request.into_parts();
            let body = to_bytes(body, usize::MAX).await.unwrap_or_default();
            let request = Recorded {
                method: parts.method,
                uri: parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.to_string())
                    .unwrap_or_default(),
                headers: parts.headers,
                body,
            };
            let response = respond(&request);
            recorded.lock().unwrap().push(request);
            tokio::time::sleep(delay).await;
            response
        }
    });

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    StubUpstream { addr, requests }
}

/// An address nothing listens on.
#[allow(dead_code)]
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn gateway_config(upstream_url: &str) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.upstream.base_url = upstream_url.into();
    config.upstream.chunk_size = 1024;
    config
}

/// A running gateway; it drains and stops when `shutdown` fires or is dropped.
pub struct Gateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

#[allow(dead_code)]
impl Gateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

#[allow(dead_code)]
pub async fn start_gateway(config: GatewayConfig, registry: MethodRegistry) -> Gateway {
    serve(HttpServer::new(config, registry).unwrap()).await
}

#[allow(dead_code)]
pub async fn start_gateway_with_analyzer(
    config: GatewayConfig,
    registry: MethodRegistry,
    analyzer: Arc<dyn PassthroughAnalyzer>,
) -> Gateway {
    serve(HttpServer::with_analyzer(config, registry, analyzer).unwrap()).await
}

async fn serve(server: HttpServer) -> Gateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    Gateway { addr, shutdown }
}

/// Test client that neither follows redirects nor uses env proxies.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}
