//! HTML admin page.

use axum::{extract::State, response::Html};

use super::super::templates;
use super::super::AppState;
use crate::models::{SourceTable, CONTROVERSY_THRESHOLD};

const RECENT_CONTROVERSIES: i64 = 5;

pub async fn admin_page(State(state): State<AppState>) -> Html<String> {
    let articles = state.ctx.articles();
    let mut sections = Vec::new();

    for source in SourceTable::ALL {
        let counts = articles.counts(source).await.unwrap_or_else(|e| {
            tracing::warn!("Admin page: counts of {} unavailable: {}", source.slug(), e);
            Default::default()
        });
        let flagged = articles
            .list_controversial(source, CONTROVERSY_THRESHOLD, RECENT_CONTROVERSIES)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Admin page: controversies of {} unavailable: {}", source.slug(), e);
                Vec::new()
            });
        sections.push(templates::source_section(source, &counts, &flagged));
    }

    let watermark = state.ctx.meta().get_watermark().await.unwrap_or_else(|e| {
        tracing::warn!("Admin page: watermark unavailable: {}", e);
        None
    });
    let running = state.pipeline_job.read().await.running;
    let content = templates::admin_content(&sections, watermark, running);
    Html(templates::base_template("Administration", &content))
}
