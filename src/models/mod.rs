//! Data models for sciharvest.

mod article;
mod controversy;
mod structured;

pub use article::{file_identifier, Article, CandidateRecord, SourceTable};
pub use controversy::{ControversyResult, CONTROVERSY_THRESHOLD, NO_EXCERPT, SCORING_ERROR};
pub use structured::{Citation, StructuredMetadata, TeiMetadata};
