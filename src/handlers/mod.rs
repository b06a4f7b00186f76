//! Built-in method handlers.
//!
//! Registration happens once, here, before the server starts. Methods not
//! listed (e.g. `info`, every write) always reach the real server.

pub mod find;

use std::sync::Arc;

use crate::cache::Cache;
use crate::rpc::MethodRegistry;

pub use find::FindHandler;

/// Register every built-in handler against `cache`.
pub fn register_builtin(registry: &mut MethodRegistry, cache: Arc<dyn Cache>) {
    registry.register("find", FindHandler::new(cache));
}

/// A registry holding only the built-in handlers.
pub fn builtin_registry(cache: Arc<dyn Cache>) -> MethodRegistry {
    let mut registry = MethodRegistry::new();
    register_builtin(&mut registry, cache);
    registry
}
