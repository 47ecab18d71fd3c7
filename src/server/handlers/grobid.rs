//! Structured-document analysis endpoints.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::super::AppState;
use super::{parse_source, ApiError};
use crate::models::StructuredMetadata;
use crate::services::UploadAnalysis;

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub filename: Option<String>,
}

/// POST /api/grobid/:source/:id
pub async fn api_grobid_article(
    State(state): State<AppState>,
    Path((source, id)): Path<(String, i32)>,
) -> Result<Json<StructuredMetadata>, ApiError> {
    let source = parse_source(&source)?;
    Ok(Json(state.structured.analyze_article(source, id).await?))
}

/// POST /api/grobid/upload with the PDF as the raw request body.
pub async fn api_grobid_upload(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<Json<UploadAnalysis>, ApiError> {
    let filename = params.filename.unwrap_or_else(|| "upload.pdf".to_string());
    Ok(Json(
        state
            .structured
            .analyze_upload(body.to_vec(), &filename)
            .await?,
    ))
}
