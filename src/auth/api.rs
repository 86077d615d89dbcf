//! Authentication API Endpoints
//! Mission: Provide registration, login, refresh, and user management

use axum::{
    extract::{Path, Request, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, info, warn};

use crate::api::AppState;
use crate::auth::{
    jwt::TokenError,
    middleware::{bearer_token, extract_context, GateError},
    models::{
        LoginRequest, LoginResponse, RefreshResponse, RegisterRequest, Role, UserResponse,
    },
    password,
};

/// Register endpoint - POST /api/v1/auth/register
///
/// New accounts always get the `user` role; admin accounts are provisioned
/// out of band.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<LoginResponse>, AuthApiError> {
    if !password::is_acceptable_password(&payload.password) {
        return Err(AuthApiError::WeakPassword);
    }

    let user = state
        .store
        .create_user(&payload.email, &payload.username, &payload.password, Role::User)
        .map_err(|e| {
            warn!("Failed to create user: {e:#}");
            AuthApiError::UserAlreadyExists
        })?;

    let (token, expires_in) = state.tokens.issue_for(&user).map_err(signing_failure)?;

    info!("✅ Registered user: {} ({})", user.username, user.email);

    Ok(Json(LoginResponse {
        token,
        expires_in,
        role: user.role.as_str().to_string(),
        user: UserResponse::from_user(&user),
    }))
}

/// Login endpoint - POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthApiError> {
    info!("🔐 Login attempt: {}", payload.email);

    let user = state
        .store
        .verify_credentials(&payload.email, &payload.password)
        .map_err(|e| {
            error!("Credential verification failed: {e:#}");
            AuthApiError::InternalError
        })?
        .ok_or_else(|| {
            warn!("❌ Failed login attempt: {}", payload.email);
            AuthApiError::InvalidCredentials
        })?;

    let (token, expires_in) = state.tokens.issue_for(&user).map_err(signing_failure)?;

    info!("✅ Login successful: {} ({})", user.username, user.role.as_str());

    Ok(Json(LoginResponse {
        token,
        expires_in,
        role: user.role.as_str().to_string(),
        user: UserResponse::from_user(&user),
    }))
}

/// Token refresh endpoint - POST /api/v1/auth/refresh
///
/// Reads the same `Authorization: Bearer` header as the gates. The presented
/// token must still be valid; the response carries a brand-new token with a
/// fresh full-length window.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RefreshResponse>, AuthApiError> {
    let token = bearer_token(&headers)?;

    let (token, expires_in) = state.tokens.refresh(&token).map_err(|err| match err {
        TokenError::Signing => signing_failure(err),
        _ => {
            warn!(error = %err, "refused token refresh");
            AuthApiError::InvalidToken
        }
    })?;

    Ok(Json(RefreshResponse { token, expires_in }))
}

/// Get current user info - GET /api/v1/users/profile
///
/// Built entirely from the validated claims; no database lookup.
pub async fn profile(req: Request) -> Result<Json<UserResponse>, AuthApiError> {
    let ctx = extract_context(&req).ok_or(AuthApiError::Unauthorized)?;

    Ok(Json(UserResponse {
        id: ctx.user_id,
        email: ctx.email.clone(),
        username: ctx.username.clone(),
        role: ctx.role.clone(),
        created_at: String::new(), // Not carried in the token
    }))
}

/// List all users - GET /api/v1/admin/users (admin gate applied in routing)
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, AuthApiError> {
    let users = state.store.list_users().map_err(|e| {
        error!("Failed to list users: {e:#}");
        AuthApiError::InternalError
    })?;

    let response: Vec<UserResponse> = users.iter().map(UserResponse::from_user).collect();

    Ok(Json(response))
}

/// Delete user - DELETE /api/v1/admin/users/:id (admin gate applied in routing)
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<u32>,
    req: Request,
) -> Result<StatusCode, AuthApiError> {
    let ctx = extract_context(&req).ok_or(AuthApiError::Unauthorized)?;

    // Don't allow deleting yourself
    if user_id == ctx.user_id {
        return Err(AuthApiError::CannotDeleteSelf);
    }

    state
        .store
        .delete_user(user_id)
        .map_err(|_| AuthApiError::UserNotFound)?;

    Ok(StatusCode::NO_CONTENT)
}

fn signing_failure(err: TokenError) -> AuthApiError {
    error!(error = %err, "token signing failed");
    AuthApiError::InternalError
}

/// Auth API errors
#[derive(Debug)]
pub enum AuthApiError {
    InvalidCredentials,
    Unauthorized,
    MissingHeader,
    MalformedHeader,
    InvalidToken,
    WeakPassword,
    UserAlreadyExists,
    UserNotFound,
    CannotDeleteSelf,
    InternalError,
}

impl From<GateError> for AuthApiError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::MissingHeader => AuthApiError::MissingHeader,
            GateError::MalformedHeader => AuthApiError::MalformedHeader,
            GateError::InvalidToken => AuthApiError::InvalidToken,
            GateError::Unauthenticated | GateError::Forbidden(_) => AuthApiError::Unauthorized,
        }
    }
}

impl IntoResponse for AuthApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthApiError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid email or password")
            }
            AuthApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthApiError::MissingHeader => {
                (StatusCode::UNAUTHORIZED, "Authorization header required")
            }
            AuthApiError::MalformedHeader => (
                StatusCode::UNAUTHORIZED,
                "Invalid authorization header format",
            ),
            AuthApiError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid or expired token"),
            AuthApiError::WeakPassword => (
                StatusCode::BAD_REQUEST,
                "Password must be at least 6 characters",
            ),
            AuthApiError::UserAlreadyExists => {
                (StatusCode::CONFLICT, "Email or username already exists")
            }
            AuthApiError::UserNotFound => (StatusCode::NOT_FOUND, "User not found"),
            AuthApiError::CannotDeleteSelf => {
                (StatusCode::BAD_REQUEST, "Cannot delete your own account")
            }
            AuthApiError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        (
            status,
            Json(json!({ "success": false, "message": message })),
        )
            .into_response()
    }
}
