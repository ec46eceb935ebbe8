use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crflash_api::auth::{self, AppState, AppStateInner};
use crflash_api::middleware::{require_admin, require_auth};
use crflash_api::{admin, reports};
use crflash_db::Database;
use crflash_types::models::Role;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crflash=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("CRFLASH_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("CRFLASH_DB_PATH").unwrap_or_else(|_| "crflash.db".into());
    let host = std::env::var("CRFLASH_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("CRFLASH_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = Database::open(&PathBuf::from(&db_path))?;
    seed_admin_account(&db)?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner { db, jwt_secret });

    // Routes
    let public_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/reports", get(reports::list_reports))
        .route("/reports", post(reports::create_report))
        .route("/reports/{id}", get(reports::get_report))
        .route("/reports/{id}", put(reports::update_report))
        .route("/reports/{id}/submit", post(reports::submit_report))
        .route("/reports/{id}/history", get(reports::report_history))
        .route("/config/managers", get(admin::managers_directory))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    let admin_routes = Router::new()
        .route("/admin/commissions", get(admin::list_commissions))
        .route("/admin/commissions", post(admin::create_commission))
        .route("/admin/commissions/{id}", put(admin::update_commission))
        .route("/admin/commissions/{id}", delete(admin::delete_commission))
        .route("/admin/managers", get(admin::list_managers))
        .route("/admin/managers", post(admin::create_manager))
        .route("/admin/managers/{id}", put(admin::update_manager))
        .route("/admin/managers/{id}", delete(admin::delete_manager))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("crflash server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// First-run bootstrap: an empty installation gets one admin account so the
/// instance is reachable. No-op once any user exists.
fn seed_admin_account(db: &Database) -> anyhow::Result<()> {
    if db.user_count()? > 0 {
        return Ok(());
    }

    let email =
        std::env::var("CRFLASH_ADMIN_EMAIL").unwrap_or_else(|_| "admin@crflash.local".into());
    let password = std::env::var("CRFLASH_ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".into());

    let hash = auth::hash_password(&password)?;
    db.create_user(
        &Uuid::new_v4().to_string(),
        "Admin Principal",
        &email,
        &hash,
        Role::Admin.as_str(),
    )?;

    info!("Seeded admin account {}", email);
    Ok(())
}
