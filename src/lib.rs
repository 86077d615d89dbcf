//! Bazaar Backend Library
//!
//! Exposes the authentication core and HTTP surface for use by the
//! binary and tests.

pub mod api;
pub mod auth;
pub mod middleware;
