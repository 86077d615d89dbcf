//! HTTP API surface: router assembly and public endpoints.

pub mod routes;

pub use routes::{create_router, AppState};
