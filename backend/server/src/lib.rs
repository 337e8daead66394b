//! Publication server for Galyleo dashboards.
//!
//! Users publish named dashboards (JSON documents) into a per-user folder of an
//! object store and get back a public URL.
//!
//!
//!
//! # General Infrastructure
//! - Redis hash `users` holds the user registry, see [`database`]
//! - S3 bucket holds the dashboards, see [`storage`]
//! - Each user gets a sequence number at registration; their dashboards live under `dashboards/<count>/`
//! - Anything published without a known user goes to `dashboards/0/`
//!
//!
//!
//! # Studio Secret
//!
//! The dashboard studio holds a shared secret. When a publish request carries
//! both a user name and that secret, the user is registered on the spot if
//! needed. Without the secret, unknown users publish anonymously. Leaving
//! `STUDIO_SECRET` unset turns this off.
//!
//!
//!
//! # Setup
//!
//! Run against local, in-process stores.
//! ```sh
//! BACKEND=memory RUST_LOG=info cargo run -p publisher-backend
//! ```
//!
//! Run against Redis and MinIO.
//! ```sh
//! REDIS_URL=redis://127.0.0.1:6379 \
//! S3_ENDPOINT=http://127.0.0.1:9000 \
//! DASHBOARD_BUCKET=user-galyleo-dashboards \
//! STUDIO_SECRET=... \
//! cargo run -p publisher-backend
//! ```
//!
//! Publish a dashboard.
//! ```sh
//! curl -X POST localhost:8080/add_dashboard \
//!     -H 'Content-Type: application/json' \
//!     -d '{"user": "alice", "name": "chart1", "dashboard": {"tables": {}}}'
//! ```
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    routing::{get, post},
};
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tokio::{net::TcpListener, signal::ctrl_c};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

pub mod auth;
pub mod config;
pub mod dashboards;
pub mod database;
pub mod error;
pub mod paths;
pub mod routes;
pub mod state;
pub mod storage;
pub mod users;
pub mod utils;

use config::Config;
use routes::{
    add_dashboard_handler, add_user_handler, delete_dashboard_handler,
    get_dashboard_content_handler, get_dashboard_handler, get_dashboard_url_handler,
    get_studio_url_handler, health_handler, list_user_dashboards_handler, routes_handler,
};
use state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(routes_handler))
        .route("/routes", get(routes_handler))
        .route("/health", get(health_handler))
        .route("/add_user", post(add_user_handler))
        .route("/list_user_dashboards/:user", get(list_user_dashboards_handler))
        .route("/add_dashboard", post(add_dashboard_handler))
        .route("/get_dashboard", get(get_dashboard_handler))
        .route("/get_dashboard_url", get(get_dashboard_url_handler))
        .route("/get_dashboard_content", get(get_dashboard_content_handler))
        .route("/delete_dashboard", post(delete_dashboard_handler))
        .route("/get_studio_url", get(get_studio_url_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = AppState::new(config).await?;

    info!("Starting server...");
    let app = build_router(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
