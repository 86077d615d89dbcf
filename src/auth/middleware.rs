//! Authentication Middleware
//! Mission: Gate API endpoints on validated token identity

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::auth::{
    jwt::{Claims, TokenManager},
    models::Role,
};

/// Request-scoped identity, attached to request extensions by a successful
/// auth gate and dropped with the request. Absence means unauthenticated.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: u32,
    pub email: String,
    pub username: String,
    pub role: String,
}

impl From<Claims> for AuthContext {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
            email: claims.email,
            username: claims.username,
            role: claims.role,
        }
    }
}

/// Gate rejection types
#[derive(Debug)]
pub enum GateError {
    MissingHeader,
    MalformedHeader,
    InvalidToken,
    Unauthenticated,
    Forbidden(Role),
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            GateError::MissingHeader => {
                (StatusCode::UNAUTHORIZED, "Authorization header required")
            }
            GateError::MalformedHeader => (
                StatusCode::UNAUTHORIZED,
                "Invalid authorization header format",
            ),
            GateError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid or expired token"),
            GateError::Unauthenticated => (StatusCode::UNAUTHORIZED, "Authentication required"),
            GateError::Forbidden(role) => (StatusCode::FORBIDDEN, role.privilege_message()),
        };

        (
            status,
            Json(json!({ "success": false, "message": message })),
        )
            .into_response()
    }
}

/// Extract the bearer token from an `Authorization` header.
///
/// Accepts exactly two space-separated parts with a literal `Bearer` scheme;
/// anything else is a malformed header.
pub fn bearer_token(headers: &HeaderMap) -> Result<String, GateError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(GateError::MissingHeader)?
        .to_str()
        .map_err(|_| GateError::MalformedHeader)?;

    let parts: Vec<&str> = header.split(' ').collect();
    if parts.len() != 2 || parts[0] != "Bearer" {
        return Err(GateError::MalformedHeader);
    }

    Ok(parts[1].to_string())
}

/// Required auth gate: rejects with 401 unless a valid bearer token is
/// presented. On success the resolved identity is attached to the request.
pub async fn require_auth(
    State(tokens): State<Arc<TokenManager>>,
    mut req: Request,
    next: Next,
) -> Result<Response, GateError> {
    let token = bearer_token(req.headers())?;

    let claims = tokens.validate(&token).map_err(|err| {
        // Variant stays in the logs; the client sees a uniform message.
        debug!(error = %err, "rejected bearer token");
        GateError::InvalidToken
    })?;

    req.extensions_mut().insert(AuthContext::from(claims));

    Ok(next.run(req).await)
}

/// Optional auth gate: attaches identity when a valid token is presented,
/// but lets every request through. Missing or invalid credentials are
/// silently ignored.
pub async fn optional_auth(
    State(tokens): State<Arc<TokenManager>>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Ok(token) = bearer_token(req.headers()) {
        match tokens.validate(&token) {
            Ok(claims) => {
                req.extensions_mut().insert(AuthContext::from(claims));
            }
            Err(err) => debug!(error = %err, "ignoring invalid bearer token"),
        }
    }

    next.run(req).await
}

/// Role gate: requires that an auth gate already resolved an identity with
/// the configured role. Pure function of the request context; must run
/// after `require_auth` or `optional_auth`.
pub async fn require_role(
    State(required): State<Role>,
    req: Request,
    next: Next,
) -> Result<Response, GateError> {
    let ctx = req
        .extensions()
        .get::<AuthContext>()
        .ok_or(GateError::Unauthenticated)?;

    if ctx.role != required.as_str() {
        debug!(
            user_id = ctx.user_id,
            role = %ctx.role,
            required = required.as_str(),
            "role gate rejected request"
        );
        return Err(GateError::Forbidden(required));
    }

    Ok(next.run(req).await)
}

/// Extract the authenticated identity from a request (use after an auth gate).
pub fn extract_context(req: &Request) -> Option<&AuthContext> {
    req.extensions().get::<AuthContext>()
}
