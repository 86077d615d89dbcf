//! Middleware for observability.
//!
//! Request logging with latency tracking; the auth gates live in
//! `crate::auth::middleware`.

pub mod logging;

pub use logging::request_logging;
