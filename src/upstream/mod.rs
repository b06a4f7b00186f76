//! Upstream (fallback server) subsystem.
//!
//! # Data Flow
//! ```text
//! dispatch engine / binary proxy
//!     → client.rs (one pooled reqwest::Client, built at startup)
//!     → fallback server
//! ```
//!
//! # Design Decisions
//! - Single client shared by every request; pooling is per connection
//! - No retries and no backoff: transport errors surface to the caller
//! - Redirects are relayed, never followed

pub mod client;

pub use client::{UpstreamClient, UpstreamError, API3_PATH};
