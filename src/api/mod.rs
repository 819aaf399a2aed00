//! Stridelog REST API
//!
//! HTTP API layer for the run log, built with Axum.
//!
//! # Endpoints
//!
//! ## Runs
//! - `GET /runs/` - List runs (`start_date`, `end_date`, `run_type`)
//! - `POST /runs/` - Log a run
//! - `GET /runs/:id` - Get a run
//! - `PUT /runs/:id` - Update a run
//! - `DELETE /runs/:id` - Delete a run
//! - `GET /runs/weekly_mileage` - Weekly totals
//! - `GET /runs/stats` - Miles per run type
//! - `GET /runs/export` - CSV export
//!
//! ## Activity files
//! - `POST /runs/import` - Create a run from a GPX/FIT file
//! - `POST /runs/:id/files` - Attach a file to a run
//! - `POST /runs/:id/reprocess` - Rebuild derived data
//! - `GET /runs/:id/metrics|series|splits|track` - Derived data
//!
//! ## Goals
//! - `GET /goals/weekly` - Goals covering a date range
//! - `GET /goals/:week_start` - Get a weekly goal
//! - `PUT /goals/:week_start` - Set a weekly goal
//!
//! ## Strava
//! - `GET /strava/auth_url`, `GET /strava/callback`, `POST /strava/sync`
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! # Example
//!
//! ```rust,ignore
//! use stridelog::api::{serve, AppState};
//! use stridelog::config::Config;
//! use stridelog::storage::Store;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let store = Arc::new(Store::open(&config.storage.database)?);
//!     let server = config.server.clone();
//!
//!     serve(AppState::new(store, config), &server).await?;
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::ServerConfig;

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let max_body = state.config.server.max_upload_mb.max(1) * 1024 * 1024;
    let cors = cors_layer(&state.config.server.cors_origins);

    let run_routes = Router::new()
        .route("/weekly_mileage", get(routes::runs::weekly_mileage))
        .route("/stats", get(routes::runs::run_stats))
        .route("/export", get(routes::export::export_runs))
        .route("/import", post(routes::files::import_activity))
        .route(
            "/:id",
            get(routes::runs::get_run)
                .put(routes::runs::update_run)
                .delete(routes::runs::delete_run),
        )
        .route("/:id/files", post(routes::files::upload_run_file))
        .route("/:id/reprocess", post(routes::files::reprocess_run))
        .route("/:id/metrics", get(routes::derived::get_metrics))
        .route("/:id/series", get(routes::derived::get_series))
        .route("/:id/splits", get(routes::derived::get_splits))
        .route("/:id/track", get(routes::derived::get_track));

    let goal_routes = Router::new()
        .route("/weekly", get(routes::goals::list_goals))
        .route(
            "/:week_start",
            get(routes::goals::get_goal).put(routes::goals::upsert_goal),
        );

    let strava_routes = Router::new()
        .route("/auth_url", get(routes::strava::auth_url))
        .route("/callback", get(routes::strava::callback))
        .route("/sync", post(routes::strava::sync));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    // Create shared state
    let shared_state = Arc::new(state);

    Router::new()
        .route("/", get(routes::runs::root))
        // Collection path is served with and without the trailing slash
        .route("/runs", get(routes::runs::list_runs).post(routes::runs::create_run))
        .route("/runs/", get(routes::runs::list_runs).post(routes::runs::create_run))
        .nest("/runs", run_routes)
        .nest("/goals", goal_routes)
        .nest("/strava", strava_routes)
        .nest("/health", health_routes)
        .layer(DefaultBodyLimit::max(max_body))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(shared_state)
}

/// Permissive when no origins are configured, otherwise the listed origins
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Start the API server
pub async fn serve(state: AppState, config: &ServerConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Stridelog API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Stridelog API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
