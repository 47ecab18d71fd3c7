//! Article and statistics endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use super::super::AppState;
use super::{parse_source, ApiError};
use crate::models::{Article, CONTROVERSY_THRESHOLD};
use crate::repository::{ArticleSearch, DateOrder, SearchPage};
use crate::services::{HarvestReport, ReanalyzeReport, DEFAULT_REANALYZE_LIMIT};

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 200;
const DEFAULT_SEARCH_LIMIT: i64 = 10;
const MAX_SEARCH_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ControversyParams {
    pub threshold: Option<f64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LimitParams {
    pub limit: Option<i64>,
}

/// Query string of `GET /api/:source/search`. Dates are `YYYY-MM-DD`,
/// `sort` is `date_desc` (default) or `date_asc`.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub keyword: Option<String>,
    pub author: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub sort: Option<DateOrder>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

fn page_size(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

/// Health check endpoint for container orchestration.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Per-source counts, structured record count and the harvest watermark.
pub async fn api_stats(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let articles = state.ctx.articles();
    let openalex = articles.counts(crate::models::SourceTable::OpenAlex).await?;
    let oai = articles.counts(crate::models::SourceTable::Oai).await?;
    let structured = state.ctx.structured().count().await?;
    let watermark = state.ctx.meta().get_watermark().await?;

    Ok(Json(serde_json::json!({
        "openalex": openalex,
        "oai": oai,
        "structured": structured,
        "watermark": watermark.map(|d| d.format("%Y-%m-%d").to_string()),
    })))
}

pub async fn api_articles(
    State(state): State<AppState>,
    Path(source): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<Article>>, ApiError> {
    let source = parse_source(&source)?;
    let articles = state
        .ctx
        .articles()
        .list(source, page_size(params.limit), params.offset.unwrap_or(0).max(0))
        .await?;
    Ok(Json(articles))
}

pub async fn api_article(
    State(state): State<AppState>,
    Path((source, id)): Path<(String, i32)>,
) -> Result<Json<Article>, ApiError> {
    let source = parse_source(&source)?;
    state
        .ctx
        .articles()
        .get(source, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("article {} not found", id)))
}

pub async fn api_controversies(
    State(state): State<AppState>,
    Path(source): Path<String>,
    Query(params): Query<ControversyParams>,
) -> Result<Json<Vec<Article>>, ApiError> {
    let source = parse_source(&source)?;
    let threshold = params.threshold.unwrap_or(CONTROVERSY_THRESHOLD);
    let articles = state
        .ctx
        .articles()
        .list_controversial(source, threshold, page_size(params.limit))
        .await?;
    Ok(Json(articles))
}

/// Keyword, author and date-range search over one source.
pub async fn api_search(
    State(state): State<AppState>,
    Path(source): Path<String>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchPage>, ApiError> {
    let source = parse_source(&source)?;
    let search = ArticleSearch {
        keyword: params.keyword,
        author: params.author,
        date_from: params.date_from,
        date_to: params.date_to,
        order: params.sort.unwrap_or_default(),
    };
    let limit = params
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT);
    let page = state
        .ctx
        .articles()
        .search(source, &search, params.page.unwrap_or(1).max(1), limit)
        .await?;
    Ok(Json(page))
}

/// Run one harvest synchronously and return its report.
pub async fn api_harvest(
    State(state): State<AppState>,
    Path(source): Path<String>,
) -> Result<Json<HarvestReport>, ApiError> {
    let source = parse_source(&source)?;
    Ok(Json(state.pipeline.harvest(source).await?))
}

pub async fn api_reanalyze(
    State(state): State<AppState>,
    Path(source): Path<String>,
    Query(params): Query<LimitParams>,
) -> Result<Json<ReanalyzeReport>, ApiError> {
    let source = parse_source(&source)?;
    let limit = params.limit.unwrap_or(DEFAULT_REANALYZE_LIMIT).max(1);
    Ok(Json(state.pipeline.reanalyze(source, limit).await?))
}
