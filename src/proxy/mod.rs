//! Forwarding to the fallback server.
//!
//! # Data Flow
//! ```text
//! RPC passthrough (passthrough.rs):
//!     inbound headers - Host - hop-by-hop, buffered envelope
//!     → POST {fallback}/api3/json
//!     → 200: streamed back in capped chunks, tapped for the analyzer
//!     → other: status + exact body, in one piece
//!
//! Binary proxy (binary.rs):
//!     inbound headers - Host - hop-by-hop, streamed body, same path + query
//!     → {fallback}{path}
//!     → status + headers - hop-by-hop, streamed body
//! ```
//!
//! # Design Decisions
//! - headers.rs is the single place hop-by-hop names live
//! - Nothing is retried; a transport failure is a 502 for that request
//! - No compression or re-encoding happens on the relayed bytes

pub mod binary;
pub mod headers;
pub mod passthrough;
pub mod stream;

pub use headers::{forwardable_request_headers, strip_hop_by_hop, HOP_BY_HOP_HEADERS};
pub use passthrough::passthrough;
pub use stream::{NoopAnalyzer, PassthroughAnalyzer};
