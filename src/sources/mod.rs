//! Upstream article listings.
//!
//! Each source turns one page of an external listing into
//! [`CandidateRecord`]s ready for deduplication and insertion.

mod links;
pub mod oai;
pub mod openalex;

pub use links::LinkCorrector;
pub use oai::OaiPmhSource;
pub use openalex::OpenAlexSource;

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{CandidateRecord, SourceTable};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("listing returned HTTP {0}")]
    Status(u16),
    #[error("protocol error {code}: {message}")]
    Protocol { code: String, message: String },
    #[error("could not parse listing: {0}")]
    Parse(String),
}

impl SourceError {
    /// Network and protocol failures are worth another attempt; a response
    /// that cannot be understood is not.
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Transport(_) | SourceError::Protocol { .. } => true,
            SourceError::Status(code) => *code == 429 || *code >= 500,
            SourceError::Parse(_) => false,
        }
    }
}

/// One page of a listing plus the cursor for the next one.
#[derive(Debug, Clone, Default)]
pub struct RecordPage {
    pub records: Vec<CandidateRecord>,
    pub next: Option<String>,
}

/// How often a whole listing is restarted after a transient failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn once() -> Self {
        Self {
            attempts: 1,
            delay: Duration::ZERO,
        }
    }
}

#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Table the records of this source are stored in.
    fn table(&self) -> SourceTable;

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::once()
    }

    /// Fetch one page of records published on or after `since`.
    async fn list(&self, since: NaiveDate, cursor: Option<&str>)
        -> Result<RecordPage, SourceError>;
}
