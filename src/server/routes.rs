//! Router configuration for the web server.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::admin_page))
        .route("/api/health", get(handlers::health))
        .route("/api/stats", get(handlers::api_stats))
        // Pipeline
        .route("/api/pipeline", post(handlers::api_run_pipeline))
        .route("/api/pipeline/status", get(handlers::api_pipeline_status))
        // Structured analysis
        .route("/api/grobid/upload", post(handlers::api_grobid_upload))
        .route("/api/grobid/:source/:id", post(handlers::api_grobid_article))
        // Per-source articles
        .route("/api/:source/articles", get(handlers::api_articles))
        .route("/api/:source/articles/:id", get(handlers::api_article))
        .route("/api/:source/controversies", get(handlers::api_controversies))
        .route("/api/:source/search", get(handlers::api_search))
        .route("/api/:source/harvest", post(handlers::api_harvest))
        .route("/api/:source/reanalyze", post(handlers::api_reanalyze))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
