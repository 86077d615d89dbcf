//! Router assembly.
//!
//! Gate ordering per route group:
//! required/optional auth gate first, then (for admin routes) the role gate,
//! then the handler. A rejection at any gate short-circuits the rest.

use axum::{
    extract::Request,
    middleware,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::auth::{
    api as auth_api,
    middleware::{extract_context, optional_auth, require_auth, require_role},
    Role, TokenManager, UserStore,
};
use crate::middleware::request_logging;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<UserStore>,
    pub tokens: Arc<TokenManager>,
}

/// Create the API router
pub fn create_router(store: Arc<UserStore>, tokens: Arc<TokenManager>) -> Router {
    let state = AppState {
        store,
        tokens: tokens.clone(),
    };

    // Credential issuance; public by definition.
    let auth_routes = Router::new()
        .route("/api/v1/auth/register", post(auth_api::register))
        .route("/api/v1/auth/login", post(auth_api::login))
        .route("/api/v1/auth/refresh", post(auth_api::refresh))
        .with_state(state.clone());

    // Requires a valid token.
    let protected_routes = Router::new()
        .route("/api/v1/users/profile", get(auth_api::profile))
        .route_layer(middleware::from_fn_with_state(
            tokens.clone(),
            require_auth,
        ));

    // Valid token required, then the admin role.
    let admin_routes = Router::new()
        .route("/api/v1/admin/users", get(auth_api::list_users))
        .route("/api/v1/admin/users/:id", delete(auth_api::delete_user))
        .route_layer(middleware::from_fn_with_state(Role::Admin, require_role))
        .route_layer(middleware::from_fn_with_state(
            tokens.clone(),
            require_auth,
        ))
        .with_state(state);

    // Works anonymously; behavior varies when identity is present.
    let optional_routes = Router::new()
        .route("/api/v1/listings", get(get_listings))
        .route_layer(middleware::from_fn_with_state(tokens, optional_auth));

    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/categories", get(get_categories));

    Router::new()
        .merge(public_routes)
        .merge(auth_routes)
        .merge(protected_routes)
        .merge(optional_routes)
        .merge(admin_routes)
        .layer(middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive())
}

// ===== Route Handlers =====

/// Health check endpoint
async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running",
    }))
}

/// Listings placeholder; responds for anonymous and authenticated viewers.
async fn get_listings(req: Request) -> Json<Value> {
    let viewer = extract_context(&req);
    Json(json!({
        "success": true,
        "message": "Get listings endpoint - Coming soon",
        "personalized": viewer.is_some(),
        "viewer": viewer.map(|ctx| ctx.username.clone()),
    }))
}

/// Categories placeholder
async fn get_categories() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "Get categories endpoint - Coming soon",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request as HttpRequest, StatusCode},
    };
    use chrono::Duration;
    use tempfile::NamedTempFile;
    use tower::ServiceExt;

    fn test_app() -> (Router, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let store = Arc::new(UserStore::new(temp_file.path().to_str().unwrap()).unwrap());
        let tokens = Arc::new(TokenManager::new(
            "test-secret-key-12345".to_string(),
            Duration::hours(1),
        ));
        (create_router(store, tokens), temp_file)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> HttpRequest<Body> {
        HttpRequest::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn register(app: &Router, email: &str, username: &str, password: &str) -> Value {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/auth/register",
                json!({ "email": email, "username": username, "password": password }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        json_body(response).await
    }

    async fn login(app: &Router, email: &str, password: &str) -> axum::response::Response {
        app.clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/auth/login",
                json!({ "email": email, "password": password }),
            ))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let (app, _temp) = test_app();

        let response = app
            .oneshot(HttpRequest::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let (app, _temp) = test_app();

        let registered = register(&app, "alice@example.com", "alice", "password123").await;
        assert!(!registered["token"].as_str().unwrap().is_empty());
        assert_eq!(registered["role"], "user");
        assert_eq!(registered["user"]["username"], "alice");

        let response = login(&app, "alice@example.com", "password123").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert!(!body["token"].as_str().unwrap().is_empty());

        let response = login(&app, "alice@example.com", "wrongpassword").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["message"], "Invalid email or password");
    }

    #[tokio::test]
    async fn test_register_weak_password() {
        let (app, _temp) = test_app();

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/auth/register",
                json!({ "email": "a@example.com", "username": "a_user", "password": "abc" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let (app, _temp) = test_app();

        register(&app, "bob@example.com", "bob", "password123").await;

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/auth/register",
                json!({ "email": "bob@example.com", "username": "bob2", "password": "password123" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_profile_requires_auth() {
        let (app, _temp) = test_app();

        let response = app
            .clone()
            .oneshot(
                HttpRequest::get("/api/v1/users/profile")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let registered = register(&app, "carol@example.com", "carol", "password123").await;
        let token = registered["token"].as_str().unwrap().to_string();

        let response = app
            .oneshot(
                HttpRequest::get("/api/v1/users/profile")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["username"], "carol");
        assert_eq!(body["email"], "carol@example.com");
    }

    #[tokio::test]
    async fn test_listings_optional_auth() {
        let (app, _temp) = test_app();

        let response = app
            .clone()
            .oneshot(
                HttpRequest::get("/api/v1/listings")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["personalized"], false);

        let registered = register(&app, "dave@example.com", "dave", "password123").await;
        let token = registered["token"].as_str().unwrap().to_string();

        let response = app
            .oneshot(
                HttpRequest::get("/api/v1/listings")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["personalized"], true);
        assert_eq!(body["viewer"], "dave");
    }

    #[tokio::test]
    async fn test_admin_routes_role_gated() {
        let (app, _temp) = test_app();

        // Regular user gets 403
        let registered = register(&app, "eve@example.com", "eve", "password123").await;
        let user_token = registered["token"].as_str().unwrap().to_string();
        let user_id = registered["user"]["id"].as_u64().unwrap();

        let response = app
            .clone()
            .oneshot(
                HttpRequest::get("/api/v1/admin/users")
                    .header(header::AUTHORIZATION, format!("Bearer {user_token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // Seeded admin passes
        let response = login(&app, "admin@bazaar.local", "admin123").await;
        assert_eq!(response.status(), StatusCode::OK);
        let admin_token = json_body(response).await["token"]
            .as_str()
            .unwrap()
            .to_string();

        let response = app
            .clone()
            .oneshot(
                HttpRequest::get("/api/v1/admin/users")
                    .header(header::AUTHORIZATION, format!("Bearer {admin_token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body.as_array().unwrap().len(), 2);

        // Admin can delete the other user
        let response = app
            .clone()
            .oneshot(
                HttpRequest::delete(format!("/api/v1/admin/users/{user_id}"))
                    .header(header::AUTHORIZATION, format!("Bearer {admin_token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        // But not themselves
        let response = app
            .clone()
            .oneshot(
                HttpRequest::delete("/api/v1/admin/users/1")
                    .header(header::AUTHORIZATION, format!("Bearer {admin_token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // No token at all
        let response = app
            .oneshot(
                HttpRequest::get("/api/v1/admin/users")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_endpoint() {
        let (app, _temp) = test_app();

        let registered = register(&app, "frank@example.com", "frank", "password123").await;
        let token = registered["token"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(
                HttpRequest::post("/api/v1/auth/refresh")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let new_token = body["token"].as_str().unwrap().to_string();
        assert!(!new_token.is_empty());

        // The refreshed token authenticates
        let response = app
            .clone()
            .oneshot(
                HttpRequest::get("/api/v1/users/profile")
                    .header(header::AUTHORIZATION, format!("Bearer {new_token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Garbage cannot be refreshed
        let response = app
            .oneshot(
                HttpRequest::post("/api/v1/auth/refresh")
                    .header(header::AUTHORIZATION, "Bearer junk")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["message"], "Invalid or expired token");
    }
}
