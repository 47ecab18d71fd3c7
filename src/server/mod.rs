//! Web API and admin page.
//!
//! JSON endpoints for browsing articles and triggering pipeline stages,
//! plus a single HTML admin page.

mod handlers;
mod routes;
mod templates;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::config::Settings;
use crate::repository::DbContext;
use crate::services::{build_structured_analysis, Pipeline, PipelineReport, StructuredAnalysis};

/// Status of the background pipeline run (only one can run at a time).
#[derive(Clone, Debug, Default, Serialize)]
pub struct PipelineJobStatus {
    pub running: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub report: Option<PipelineReport>,
    pub error: Option<String>,
}

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub ctx: DbContext,
    pub pipeline: Arc<Pipeline>,
    pub structured: Arc<StructuredAnalysis>,
    pub pipeline_job: Arc<RwLock<PipelineJobStatus>>,
}

impl AppState {
    pub fn new(ctx: DbContext, pipeline: Pipeline, structured: StructuredAnalysis) -> Self {
        Self {
            ctx,
            pipeline: Arc::new(pipeline),
            structured: Arc::new(structured),
            pipeline_job: Arc::new(RwLock::new(PipelineJobStatus::default())),
        }
    }

    pub async fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let ctx = settings.create_db_context();
        ctx.init_schema().await?;

        let pipeline = Pipeline::from_settings(&ctx, settings)?;
        let structured = build_structured_analysis(&ctx, settings, pipeline.processor())?;
        Ok(Self::new(ctx, pipeline, structured))
    }
}

/// Start the web server.
pub async fn serve(settings: &Settings, bind: &str) -> anyhow::Result<()> {
    let state = AppState::from_settings(settings).await?;
    let app = create_router(state);

    let addr: SocketAddr = bind.parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
