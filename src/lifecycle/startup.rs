//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize the cache before anything can be served
//! - Build the method registry from it
//! - Bind the listener last (traffic only when ready)
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently

use std::path::Path;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::cache::{Cache, MemoryCache, NullCache};
use crate::config::{CacheConfig, GatewayConfig};
use crate::error::GatewayError;
use crate::handlers::builtin_registry;
use crate::rpc::MethodRegistry;

/// Open the cache described by `config`.
pub fn build_cache(config: &CacheConfig) -> Result<Arc<dyn Cache>, GatewayError> {
    if !config.enabled {
        tracing::info!("Cache disabled; every method passes through");
        return Ok(Arc::new(NullCache));
    }

    let cache = match &config.seed_path {
        Some(path) => MemoryCache::load(Path::new(path))
            .map_err(|e| GatewayError::Cache(e.to_string()))?,
        None => MemoryCache::new(),
    };
    tracing::info!(entities = cache.len(), "Cache ready");
    Ok(Arc::new(cache))
}

/// Cache plus built-in handlers, ready to serve.
pub fn build_registry(config: &GatewayConfig) -> Result<MethodRegistry, GatewayError> {
    let cache = build_cache(&config.cache)?;
    Ok(builtin_registry(cache))
}

/// Bind the configured listener address.
pub async fn bind_listener(config: &GatewayConfig) -> Result<TcpListener, GatewayError> {
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");
    Ok(listener)
}
