//! Local cache capability.
//!
//! # Data Flow
//! ```text
//! handler (e.g. find)
//!     → FindQuery::from_params (method params → typed query)
//!     → Cache::find (opaque, may block)
//!     → rows, or Miss / Unsupported (→ passthrough), or Backend (→ fault)
//! ```
//!
//! # Design Decisions
//! - The store is external; this module only fixes its interface
//! - Anything the cache cannot answer exactly is a signal, never a guess

pub mod memory;
pub mod query;

use serde_json::{Map, Value};
use thiserror::Error;

pub use memory::{MemoryCache, NullCache};
pub use query::{Condition, FindQuery, LogicalOperator};

/// One entity row: a JSON object with at least `type` and `id`.
pub type Entity = Map<String, Value>;

/// Why the cache did not answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The cache holds nothing for this request.
    #[error("cache miss: {0}")]
    Miss(String),

    /// The request uses something the cache cannot evaluate.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The store itself failed.
    #[error("cache backend failure: {0}")]
    Backend(String),
}

/// Read access to cached entities.
///
/// Calls are synchronous and may block.
pub trait Cache: Send + Sync {
    /// Every entity matching `query`, in id order. Paging is the caller's job.
    fn find(&self, query: &FindQuery) -> Result<Vec<Entity>, CacheError>;
}
