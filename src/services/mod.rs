//! Pipeline services shared by the CLI and the web server.

pub mod harvest;
pub mod pipeline;
pub mod processor;
pub mod structured;

pub use harvest::{HarvestReport, Harvester};
pub use pipeline::{
    build_processor, build_structured_analysis, BackfillReport, Pipeline, PipelineReport,
    ReanalyzeReport, ReanalyzedArticle, DEFAULT_REANALYZE_LIMIT,
};
pub use processor::{ArticleProcessor, ProcessOutcome};
pub use structured::{
    rescore_structured, BatchReport, RescoreReport, StructuredAnalysis, UploadAnalysis,
};

use thiserror::Error;

use crate::fetch::FetchError;
use crate::grobid::GrobidError;
use crate::repository::DieselError;
use crate::sources::SourceError;
use crate::tei::TeiError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("database error: {0}")]
    Database(#[from] DieselError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Grobid(#[from] GrobidError),
    #[error(transparent)]
    Tei(#[from] TeiError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("no PDF available from {0}")]
    PdfUnavailable(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
