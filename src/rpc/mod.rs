//! JSON-RPC interception subsystem.
//!
//! # Data Flow
//! ```text
//! request body
//!     → envelope.rs (decode, headline)
//!     → registry.rs (method name → handler)
//!     → handler returns outcome.rs::Outcome
//!     → dispatch.rs (translate outcome to a wire response)
//! ```
//!
//! # Design Decisions
//! - Handlers return a tagged Outcome instead of raising errors
//! - Faults are application errors: status 200 with an exception payload
//! - Unknown methods and passthrough signals are not errors; they forward

pub mod dispatch;
pub mod envelope;
pub mod outcome;
pub mod registry;

pub use envelope::{Envelope, EnvelopeError, Params};
pub use outcome::{Fault, Outcome, PassthroughSignal, PrebuiltResponse};
pub use registry::{MethodHandler, MethodRegistry};
