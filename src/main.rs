//! Bazaar Backend - Marketplace API Server
//! Mission: Stateless JWT authentication with role-gated request handling

use anyhow::{Context, Result};
use chrono::Duration;
use dotenv::dotenv;
use std::path::Path;
use std::{env, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bazaar_backend::{
    api,
    auth::{TokenManager, UserStore},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment and logging
    load_env();
    init_tracing();

    info!("🚀 Bazaar API Server Starting");

    let auth_db_path = env::var("AUTH_DB_PATH").unwrap_or_else(|_| "bazaar_auth.db".to_string());
    let jwt_secret = env::var("JWT_SECRET")
        .unwrap_or_else(|_| "dev-secret-change-in-production-minimum-32-characters".to_string());
    let token_duration_hours = env::var("TOKEN_DURATION_HOURS")
        .unwrap_or_else(|_| "24".to_string())
        .parse::<i64>()
        .context("Invalid token duration")?;

    // Secret and duration are read once here and never revisited; the
    // manager and store are shared by reference with every gate and handler.
    let store = Arc::new(UserStore::new(&auth_db_path)?);
    let tokens = Arc::new(TokenManager::new(
        jwt_secret,
        Duration::hours(token_duration_hours),
    ));

    info!("🔐 Authentication initialized at: {}", auth_db_path);

    let app = api::create_router(store, tokens);

    let addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&addr).await?;
    info!("🎯 API server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn load_env() {
    // 1) Standard dotenv search (cwd + parents)
    let _ = dotenv();

    // 2) Also try the manifest-dir .env (common when running with
    //    --manifest-path from elsewhere)
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let candidate = manifest_dir.join(".env");
    if candidate.exists() {
        let _ = dotenv::from_path(&candidate);
    }
}

/// Initialize tracing with env-filter overrides
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bazaar_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
