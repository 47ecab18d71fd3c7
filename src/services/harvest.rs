//! Incremental harvest runs over a [`RecordSource`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::Serialize;

use super::processor::{ArticleProcessor, ProcessOutcome};
use crate::config::HarvestSettings;
use crate::models::{CandidateRecord, SourceTable};
use crate::repository::{ArticleRepository, DieselError, MetaRepository};
use crate::sources::{RecordSource, SourceError};

/// Summary of one harvest run.
#[derive(Debug, Clone, Serialize)]
pub struct HarvestReport {
    pub source: SourceTable,
    pub since: NaiveDate,
    pub listed: usize,
    pub inserted: usize,
    pub completed: usize,
    pub duplicates: usize,
    pub failed: usize,
    /// Listing attempts made, including retries.
    pub attempts: u32,
    /// Set when the listing was given up before it ended.
    pub error: Option<String>,
    /// Watermark written at the end of the run, if any.
    pub watermark: Option<NaiveDate>,
}

impl HarvestReport {
    fn new(source: SourceTable, since: NaiveDate) -> Self {
        Self {
            source,
            since,
            listed: 0,
            inserted: 0,
            completed: 0,
            duplicates: 0,
            failed: 0,
            attempts: 0,
            error: None,
            watermark: None,
        }
    }

    pub fn aborted(&self) -> bool {
        self.error.is_some()
    }
}

pub struct Harvester {
    articles: ArticleRepository,
    meta: MetaRepository,
    processor: Arc<ArticleProcessor>,
    max_records: usize,
    request_delay: Duration,
    lookback_days: i64,
}

impl Harvester {
    pub fn new(
        articles: ArticleRepository,
        meta: MetaRepository,
        processor: Arc<ArticleProcessor>,
        settings: &HarvestSettings,
    ) -> Self {
        Self {
            articles,
            meta,
            processor,
            max_records: settings.max_records,
            request_delay: settings.request_delay,
            lookback_days: settings.lookback_days,
        }
    }

    /// Start of the harvest window: the stored watermark, or the lookback
    /// period when none is stored.
    pub async fn since(&self) -> Result<NaiveDate, DieselError> {
        Ok(self.meta.get_watermark().await?.unwrap_or_else(|| {
            (Utc::now() - chrono::Duration::days(self.lookback_days)).date_naive()
        }))
    }

    /// Harvest new records from `source`.
    ///
    /// Transient listing failures restart the listing per the source's retry
    /// policy; anything else ends the run with the rows stored so far. The
    /// watermark moves to today only when a record was completed.
    pub async fn run(&self, source: &dyn RecordSource) -> Result<HarvestReport, DieselError> {
        let table = source.table();
        let since = self.since().await?;
        let policy = source.retry_policy();
        let mut report = HarvestReport::new(table, since);

        tracing::info!("Harvesting {} since {}", table.slug(), since);

        loop {
            report.attempts += 1;
            match self.pass(source, since, &mut report).await {
                Ok(()) => break,
                Err(e) if e.is_transient() && report.attempts < policy.attempts => {
                    tracing::warn!(
                        "{} listing attempt {}/{} failed: {}; retrying in {:?}",
                        table.slug(),
                        report.attempts,
                        policy.attempts,
                        e,
                        policy.delay
                    );
                    tokio::time::sleep(policy.delay).await;
                }
                Err(e) => {
                    tracing::error!("{} harvest stopped: {}", table.slug(), e);
                    report.error = Some(e.to_string());
                    break;
                }
            }
        }

        if report.completed > 0 {
            let today = Utc::now().date_naive();
            match self.meta.set_watermark(today).await {
                Ok(()) => {
                    report.watermark = Some(today);
                    tracing::info!(
                        "{} harvest done: {} articles, watermark set to {}",
                        table.slug(),
                        report.completed,
                        today
                    );
                }
                Err(e) => tracing::error!(
                    "{} harvest done: {} articles, watermark not saved: {}",
                    table.slug(),
                    report.completed,
                    e
                ),
            }
        } else {
            tracing::info!("No new {} articles, watermark unchanged", table.slug());
        }

        Ok(report)
    }

    /// Walk the listing from its first page until it ends or the cap is hit.
    async fn pass(
        &self,
        source: &dyn RecordSource,
        since: NaiveDate,
        report: &mut HarvestReport,
    ) -> Result<(), SourceError> {
        let mut cursor: Option<String> = None;

        loop {
            if report.completed >= self.max_records {
                return Ok(());
            }

            let page = source.list(since, cursor.as_deref()).await?;
            report.listed += page.records.len();

            for record in page.records {
                if report.completed >= self.max_records {
                    return Ok(());
                }
                self.handle(source.table(), record, report).await;
            }

            match page.next {
                Some(token) => cursor = Some(token),
                None => return Ok(()),
            }
        }
    }

    async fn handle(&self, table: SourceTable, record: CandidateRecord, report: &mut HarvestReport) {
        match self.articles.exists(table, &record.pdf_link).await {
            Ok(true) => {
                tracing::info!("Duplicate skipped: {}", record.title);
                report.duplicates += 1;
                return;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!("Lookup failed for {}: {}", record.pdf_link, e);
                report.failed += 1;
                return;
            }
        }

        let id = match self.articles.insert(table, &record).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                tracing::warn!("Duplicate rejected on insert: {}", record.pdf_link);
                report.duplicates += 1;
                return;
            }
            Err(e) => {
                tracing::warn!("Insert failed for {}: {}", record.title, e);
                report.failed += 1;
                return;
            }
        };
        report.inserted += 1;

        match self.processor.process(table, id, &record.pdf_link, true).await {
            Ok(ProcessOutcome::Completed(result)) => {
                report.completed += 1;
                let score = result.map(|r| r.score).unwrap_or_default();
                tracing::info!("Article stored: {} (controversy score {})", record.title, score);
                tokio::time::sleep(self.request_delay).await;
            }
            Ok(_) => report.failed += 1,
            Err(e) => {
                tracing::warn!("Could not store results for {}: {}", record.title, e);
                report.failed += 1;
            }
        }
    }
}
