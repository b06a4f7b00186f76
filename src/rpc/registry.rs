//! Method registry.
//!
//! # Responsibilities
//! - Map RPC method names to handlers
//! - Built once at startup, then frozen behind an `Arc`
//!
//! # Design Decisions
//! - Registering a name twice replaces the earlier handler (last wins)
//! - Lookups take `&self` only, so concurrent requests need no locking

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::rpc::envelope::Params;
use crate::rpc::outcome::Outcome;

/// A unit of logic answering one RPC method locally.
///
/// Invocation is synchronous and may block on the cache.
pub trait MethodHandler: Send + Sync {
    fn call(&self, params: &Params) -> Outcome;
}

impl<F> MethodHandler for F
where
    F: Fn(&Params) -> Outcome + Send + Sync,
{
    fn call(&self, params: &Params) -> Outcome {
        self(params)
    }
}

/// Lookup table from method name to handler.
#[derive(Default, Clone)]
pub struct MethodRegistry {
    handlers: HashMap<String, Arc<dyn MethodHandler>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`, replacing any earlier registration.
    pub fn register<H>(&mut self, name: impl Into<String>, handler: H) -> &mut Self
    where
        H: MethodHandler + 'static,
    {
        let name = name.into();
        if self.handlers.insert(name.clone(), Arc::new(handler)).is_some() {
            tracing::debug!(method = %name, "Replacing previously registered handler");
        }
        self
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn MethodHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered method names, sorted.
    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodRegistry")
            .field("methods", &self.method_names())
            .finish()
    }
}
