//! Authentication Module
//! Mission: Secure API access with JWT tokens, RBAC, and password hashing

pub mod api;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod user_store;

pub use jwt::{TokenError, TokenManager};
pub use middleware::{optional_auth, require_auth, require_role, AuthContext};
pub use models::Role;
pub use user_store::UserStore;
