//! Selective-interception gateway for a JSON-RPC production-tracking service.
//!
//! Known RPC methods are answered from a local cache; everything else,
//! including all file traffic, is forwarded byte-for-byte to the real server.

// Core subsystems
pub mod config;
pub mod http;
pub mod proxy;
pub mod rpc;
pub mod upstream;

// Local answers
pub mod cache;
pub mod handlers;

// Cross-cutting concerns
pub mod error;
pub mod lifecycle;
pub mod observability;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
