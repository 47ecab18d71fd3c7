//! HTTP request handlers for the web server.

mod admin;
mod api;
mod grobid;
mod pipeline;

pub use admin::admin_page;
pub use api::{
    api_article, api_articles, api_controversies, api_harvest, api_reanalyze, api_search,
    api_stats, health,
};
pub use grobid::{api_grobid_article, api_grobid_upload};
pub use pipeline::{api_pipeline_status, api_run_pipeline};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::models::SourceTable;
use crate::repository::DieselError;
use crate::services::ServiceError;

/// Error returned by JSON endpoints as `{"error": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

impl From<DieselError> for ApiError {
    fn from(e: DieselError) -> Self {
        tracing::error!("Database error: {}", e);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, format!("Database error: {}", e))
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        let status = match &e {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServiceError::Grobid(_) | ServiceError::Source(_) | ServiceError::PdfUnavailable(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

/// Resolve the `:source` path segment; unknown sources are 404.
fn parse_source(name: &str) -> Result<SourceTable, ApiError> {
    SourceTable::from_name(name).ok_or_else(|| ApiError::not_found(format!("unknown source '{}'", name)))
}
