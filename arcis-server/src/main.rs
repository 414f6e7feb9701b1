//! ARCIS Backend Server
//!
//! Ingests weapon detections from edge devices and officers, scores them,
//! raises alerts, and serves the review API.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ARCIS BACKEND                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────┐  ┌─────────────────────────┐ │
//! │  │  Device   │  │  Review   │  │  arcis-core             │ │
//! │  │  API      │  │  API      │  │  (frame decode,         │ │
//! │  │ (API key) │  │  (JWT)    │  │   threat classify)      │ │
//! │  └─────┬─────┘  └─────┬─────┘  └────────────┬────────────┘ │
//! │        └──────────────┼──────────────────────┘              │
//! │                       ▼                                     │
//! │                ┌─────────────┐                             │
//! │                │ PostgreSQL  │                             │
//! │                └─────────────┘                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;
mod models;
mod handlers;
mod middleware;
mod error;
mod ingest;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post, put},
    middleware as axum_middleware,
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use std::net::SocketAddr;

pub use error::{AppError, AppResult};

const DEFAULT_LOG_FILTER: &str = "arcis_server=debug,arcis_core=info,tower_http=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    init_tracing(&config);

    tracing::info!(environment = %config.environment, "ARCIS server starting...");
    tracing::info!("Database: {}", config.database_url.split('@').last().unwrap_or("***"));

    // Initialize database pool
    let pool = db::create_pool(&config.database_url, config.db_max_connections)
        .await
        .context("Failed to create database pool")?;

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    // Build application state
    let state = AppState {
        pool,
        config: config.clone(),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn init_tracing(config: &config::Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    if config.json_logs() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::PgPool,
    pub config: config::Config,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health::check));

    // Device routes (API key auth)
    let device_routes = Router::new()
        .route("/api/v1/devices/detections", post(handlers::devices::create_detection))
        .route("/api/v1/devices/detections/batch", post(handlers::devices::create_batch))
        .route("/api/v1/devices/detections/:id/frame", put(handlers::devices::attach_frame))
        .route("/api/v1/devices/jetson", post(handlers::devices::jetson))
        .route("/api/v1/devices/raspberry", post(handlers::devices::raspberry))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_device_key
        ));

    // Management routes (user JWT auth)
    let management_routes = Router::new()
        // Detections
        .route(
            "/api/v1/detections",
            get(handlers::detections::list).delete(handlers::detections::delete_all),
        )
        .route(
            "/api/v1/detections/:id",
            get(handlers::detections::get).delete(handlers::detections::delete),
        )
        .route("/api/v1/detections/:id/comments", post(handlers::detections::add_comment))
        .route("/api/v1/detections/:id/threat-analysis", get(handlers::detections::threat_analysis))

        // Frames
        .route("/api/v1/detections/:id/frame", get(handlers::frames::get_frame))
        .route("/api/v1/detections/:id/jpeg", get(handlers::frames::get_jpeg))

        // Threats
        .route("/api/v1/threats", get(handlers::threats::list))
        .route("/api/v1/threats/recent", get(handlers::threats::recent))

        // Manual entries
        .route(
            "/api/v1/manual-detections",
            get(handlers::manual::list).post(handlers::manual::create),
        )

        // Alerts
        .route("/api/v1/alerts", get(handlers::alerts::list).post(handlers::alerts::create))
        .route("/api/v1/alerts/:id", get(handlers::alerts::get))
        .route("/api/v1/alerts/:id/acknowledge", put(handlers::alerts::acknowledge))

        // Reports
        .route("/api/v1/reports/detections", get(handlers::reports::detections))
        .route("/api/v1/reports/threat-distribution", get(handlers::reports::threat_distribution))
        .route("/api/v1/reports/alerts", get(handlers::reports::alerts))
        .route("/api/v1/reports/manual", get(handlers::reports::manual))

        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_user_auth
        ));

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .merge(device_routes)
        .merge(management_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
