//! Full pipeline: harvest, extraction backfill and structured re-scoring.

use std::sync::Arc;

use serde::Serialize;

use super::harvest::{HarvestReport, Harvester};
use super::processor::{ArticleProcessor, ProcessOutcome};
use super::structured::{rescore_structured, RescoreReport, StructuredAnalysis};
use super::ServiceError;
use crate::cleaner::clean_text;
use crate::config::Settings;
use crate::extract::PdfTextExtractor;
use crate::fetch::HttpPdfFetcher;
use crate::grobid::GrobidClient;
use crate::models::SourceTable;
use crate::nlp::{ControversyScorer, HttpModelLoader};
use crate::repository::{ArticleRepository, DbContext, DieselError, StructuredMetadataRepository};
use crate::sources::{OaiPmhSource, OpenAlexSource, RecordSource};

/// Default number of articles re-scored by [`Pipeline::reanalyze`].
pub const DEFAULT_REANALYZE_LIMIT: i64 = 100;

#[derive(Debug, Clone, Default, Serialize)]
pub struct BackfillReport {
    pub source: Option<SourceTable>,
    pub attempted: usize,
    pub extracted: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReanalyzeReport {
    pub articles: Vec<ReanalyzedArticle>,
    pub failed: usize,
}

/// Re-scoring outcome of one stored article.
#[derive(Debug, Clone, Serialize)]
pub struct ReanalyzedArticle {
    pub id: i32,
    pub score: f64,
    pub is_controversial: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub harvests: Vec<HarvestReport>,
    pub backfill: BackfillReport,
    pub rescore: RescoreReport,
    /// Stage-level failures. Later stages still run.
    pub errors: Vec<String>,
}

/// Runs the pipeline stages in sequence over one database.
pub struct Pipeline {
    articles: ArticleRepository,
    structured: StructuredMetadataRepository,
    processor: Arc<ArticleProcessor>,
    harvester: Harvester,
    sources: Vec<Arc<dyn RecordSource>>,
    backfill_source: SourceTable,
    backfill_limit: usize,
}

impl Pipeline {
    pub fn new(
        ctx: &DbContext,
        processor: Arc<ArticleProcessor>,
        sources: Vec<Arc<dyn RecordSource>>,
        settings: &Settings,
    ) -> Self {
        Self {
            articles: ctx.articles(),
            structured: ctx.structured(),
            harvester: Harvester::new(
                ctx.articles(),
                ctx.meta(),
                processor.clone(),
                &settings.harvest,
            ),
            processor,
            sources,
            backfill_source: settings.harvest.backfill_source,
            backfill_limit: settings.harvest.backfill_limit,
        }
    }

    /// Wire the HTTP fetcher, `pdftotext`, the remote sentiment model and
    /// both upstream sources from settings.
    pub fn from_settings(ctx: &DbContext, settings: &Settings) -> Result<Self, ServiceError> {
        let processor = Arc::new(build_processor(ctx, settings)?);
        let sources: Vec<Arc<dyn RecordSource>> = vec![
            Arc::new(OpenAlexSource::new(&settings.harvest, &settings.fetch)?),
            Arc::new(OaiPmhSource::new(&settings.harvest, &settings.fetch)?),
        ];
        Ok(Self::new(ctx, processor, sources, settings))
    }

    pub fn processor(&self) -> &Arc<ArticleProcessor> {
        &self.processor
    }

    /// Harvest one source.
    pub async fn harvest(&self, table: SourceTable) -> Result<HarvestReport, ServiceError> {
        let source = self
            .sources
            .iter()
            .find(|s| s.table() == table)
            .ok_or_else(|| ServiceError::NotFound(format!("no source for {}", table.slug())))?;
        Ok(self.harvester.run(source.as_ref()).await?)
    }

    /// Harvest every configured source in order.
    pub async fn harvest_all(&self) -> Result<Vec<HarvestReport>, ServiceError> {
        let mut reports = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            reports.push(self.harvester.run(source.as_ref()).await?);
        }
        Ok(reports)
    }

    /// Fetch and extract text for rows still missing it. No scoring.
    pub async fn backfill(
        &self,
        source: SourceTable,
        limit: usize,
    ) -> Result<BackfillReport, DieselError> {
        let mut report = BackfillReport {
            source: Some(source),
            ..Default::default()
        };

        for article in self.articles.missing_text(source, limit as i64).await? {
            report.attempted += 1;
            match self
                .processor
                .process(source, article.id, &article.pdf_link, false)
                .await
            {
                Ok(ProcessOutcome::Completed(_)) => report.extracted += 1,
                Ok(_) => report.failed += 1,
                Err(e) => {
                    tracing::warn!("Backfill of {} failed: {}", article.file_identifier(), e);
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            "Backfill {}: {}/{} extracted",
            source.slug(),
            report.extracted,
            report.attempted
        );
        Ok(report)
    }

    /// Re-clean and re-score stored articles that have text.
    pub async fn reanalyze(
        &self,
        source: SourceTable,
        limit: i64,
    ) -> Result<ReanalyzeReport, DieselError> {
        let scorer = self.processor.scorer();
        let mut report = ReanalyzeReport::default();

        for article in self.articles.with_text(source, limit).await? {
            let Some(text) = article.full_text.as_deref() else {
                continue;
            };
            let result = scorer.score(&clean_text(text)).await;
            if let Err(e) = self
                .articles
                .save_controversy(source, article.id, &result)
                .await
            {
                tracing::warn!("Could not save score of {}: {}", article.file_identifier(), e);
                report.failed += 1;
                continue;
            }
            report.articles.push(ReanalyzedArticle {
                id: article.id,
                score: result.score,
                is_controversial: result.is_controversial,
            });
        }

        tracing::info!(
            "Reanalyzed {} {} articles ({} failed)",
            report.articles.len(),
            source.slug(),
            report.failed
        );
        Ok(report)
    }

    pub async fn rescore_structured(&self) -> Result<RescoreReport, DieselError> {
        rescore_structured(&self.structured, self.processor.scorer()).await
    }

    /// Harvest all sources, backfill text for the configured source, then
    /// re-score stored structured markup. Stages run one after another; a
    /// failing source or stage is logged and recorded, and the run goes on.
    pub async fn run_full(&self, limit: Option<usize>) -> PipelineReport {
        let mut errors = Vec::new();

        let mut harvests = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            match self.harvester.run(source.as_ref()).await {
                Ok(report) => harvests.push(report),
                Err(e) => {
                    tracing::error!("Harvest of {} failed: {}", source.table().slug(), e);
                    errors.push(format!("harvest {}: {}", source.table().slug(), e));
                }
            }
        }

        let backfill = match self
            .backfill(self.backfill_source, limit.unwrap_or(self.backfill_limit))
            .await
        {
            Ok(report) => report,
            Err(e) => {
                tracing::error!("Backfill stage failed: {}", e);
                errors.push(format!("backfill: {}", e));
                BackfillReport {
                    source: Some(self.backfill_source),
                    ..Default::default()
                }
            }
        };

        let rescore = match self.rescore_structured().await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!("Structured re-score stage failed: {}", e);
                errors.push(format!("rescore: {}", e));
                RescoreReport::default()
            }
        };

        tracing::info!("Pipeline run complete ({} stage errors)", errors.len());
        PipelineReport {
            harvests,
            backfill,
            rescore,
            errors,
        }
    }
}

/// Article processor backed by the network and `pdftotext`.
pub fn build_processor(ctx: &DbContext, settings: &Settings) -> Result<ArticleProcessor, ServiceError> {
    let fetcher = HttpPdfFetcher::new(&settings.fetch, settings.pdf_dir.clone())?;
    let scorer = ControversyScorer::new(
        Arc::new(HttpModelLoader::new(settings.sentiment.clone())),
        settings.sentiment.max_chars,
    );
    Ok(ArticleProcessor::new(
        ctx.articles(),
        Arc::new(fetcher),
        Arc::new(PdfTextExtractor::new()),
        Arc::new(scorer),
    ))
}

/// Structured analysis sharing the processor's fetcher and scorer.
pub fn build_structured_analysis(
    ctx: &DbContext,
    settings: &Settings,
    processor: &ArticleProcessor,
) -> Result<StructuredAnalysis, ServiceError> {
    Ok(StructuredAnalysis::new(
        ctx.articles(),
        ctx.structured(),
        GrobidClient::new(&settings.grobid)?,
        processor.scorer().clone(),
        processor.fetcher().clone(),
    ))
}
