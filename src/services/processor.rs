//! Per-article fetch, extract, clean and score.

use std::sync::Arc;

use crate::cleaner::clean_text;
use crate::extract::TextExtractor;
use crate::fetch::PdfFetcher;
use crate::models::{file_identifier, ControversyResult, SourceTable};
use crate::nlp::ControversyScorer;
use crate::repository::{ArticleRepository, DieselError};

/// How processing a single article ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    /// Text stored; the score is present when scoring was requested.
    Completed(Option<ControversyResult>),
    /// No PDF could be obtained from the link.
    FetchFailed,
    /// The PDF had no usable text layer.
    ExtractionEmpty,
}

impl ProcessOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ProcessOutcome::Completed(_))
    }
}

pub struct ArticleProcessor {
    articles: ArticleRepository,
    fetcher: Arc<dyn PdfFetcher>,
    extractor: Arc<dyn TextExtractor>,
    scorer: Arc<ControversyScorer>,
}

impl ArticleProcessor {
    pub fn new(
        articles: ArticleRepository,
        fetcher: Arc<dyn PdfFetcher>,
        extractor: Arc<dyn TextExtractor>,
        scorer: Arc<ControversyScorer>,
    ) -> Self {
        Self {
            articles,
            fetcher,
            extractor,
            scorer,
        }
    }

    pub fn scorer(&self) -> &Arc<ControversyScorer> {
        &self.scorer
    }

    pub fn fetcher(&self) -> &Arc<dyn PdfFetcher> {
        &self.fetcher
    }

    /// Fetch the PDF behind `link`, store its cleaned text and optionally
    /// its controversy score.
    ///
    /// Fetch and extraction misses leave the row without text for a later
    /// backfill; only storage failures are errors.
    pub async fn process(
        &self,
        source: SourceTable,
        id: i32,
        link: &str,
        score: bool,
    ) -> Result<ProcessOutcome, DieselError> {
        let identifier = file_identifier(source, id);

        let Some(path) = self.fetcher.fetch(link, &identifier).await else {
            tracing::warn!("Could not download PDF for {} from {}", identifier, link);
            return Ok(ProcessOutcome::FetchFailed);
        };

        let Some(raw) = self.extractor.extract(&path).await else {
            tracing::warn!("Empty text extracted from {}", link);
            return Ok(ProcessOutcome::ExtractionEmpty);
        };

        let text = clean_text(&raw);
        self.articles.save_text(source, id, &text).await?;

        if !score {
            return Ok(ProcessOutcome::Completed(None));
        }

        let result = self.scorer.score(&text).await;
        self.articles.save_controversy(source, id, &result).await?;
        Ok(ProcessOutcome::Completed(Some(result)))
    }
}
