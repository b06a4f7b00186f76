//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request span, timeout, access log)
//!     → /api3/json            → rpc::dispatch (local handler or passthrough)
//!     → /file_serve, /thumbnail, /upload → proxy::binary
//!     → /, /detail, /page     → handlers.rs (redirect to upstream)
//!     → /ping                 → handlers.rs
//!     → Send to client
//! ```

pub mod access_log;
pub mod handlers;
pub mod server;

pub use access_log::AccessLogged;
pub use server::{AppState, HttpServer};
