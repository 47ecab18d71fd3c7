//! Pipeline tests against a real SQLite file with network-free stubs.
//!
//! Upstream listings, PDF downloads, text extraction and the sentiment model
//! are replaced by in-process stubs; everything else runs for real.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tempfile::{tempdir, TempDir};

use sciharvest::config::Settings;
use sciharvest::extract::TextExtractor;
use sciharvest::fetch::PdfFetcher;
use sciharvest::models::{CandidateRecord, ControversyResult, SourceTable};
use sciharvest::nlp::{ControversyScorer, ModelError, SentimentModel, SentimentScores};
use sciharvest::repository::{DbContext, NewStructuredMetadata};
use sciharvest::services::{ArticleProcessor, Pipeline};
use sciharvest::sources::{RecordPage, RecordSource, RetryPolicy, SourceError};

const PAPER_TEXT: &str = "Sentence one is neutral.\n\
    Sentence two is wildly ambiguous and contested by experts five words minimum.";

/// Fails the first `misses` downloads, then succeeds.
struct StubFetcher {
    dir: PathBuf,
    misses: AtomicUsize,
}

impl StubFetcher {
    fn new(dir: &Path, misses: usize) -> Arc<Self> {
        Arc::new(Self {
            dir: dir.to_path_buf(),
            misses: AtomicUsize::new(misses),
        })
    }
}

#[async_trait]
impl PdfFetcher for StubFetcher {
    async fn fetch(&self, _url: &str, identifier: &str) -> Option<PathBuf> {
        let left = self.misses.load(Ordering::SeqCst);
        if left > 0 {
            self.misses.store(left - 1, Ordering::SeqCst);
            return None;
        }
        Some(self.pdf_path(identifier))
    }

    fn pdf_path(&self, identifier: &str) -> PathBuf {
        self.dir.join(format!("{}.pdf", identifier))
    }
}

struct StubExtractor;

#[async_trait]
impl TextExtractor for StubExtractor {
    async fn extract(&self, _path: &Path) -> Option<String> {
        Some(PAPER_TEXT.to_string())
    }
}

/// Balanced sentiment for sentences mentioning "contested", one-sided otherwise.
struct KeywordModel;

#[async_trait]
impl SentimentModel for KeywordModel {
    async fn classify(&self, text: &str) -> Result<SentimentScores, ModelError> {
        if text.contains("contested") {
            Ok(SentimentScores {
                positive: 0.45,
                negative: 0.55,
            })
        } else {
            Ok(SentimentScores {
                positive: 0.9,
                negative: 0.1,
            })
        }
    }
}

/// Serves a fixed set of records, optionally failing the first calls.
struct StubSource {
    records: Vec<CandidateRecord>,
    failures: AtomicUsize,
    malformed: bool,
    policy: RetryPolicy,
}

impl StubSource {
    fn new(records: Vec<CandidateRecord>) -> Self {
        Self {
            records,
            failures: AtomicUsize::new(0),
            malformed: false,
            policy: RetryPolicy::once(),
        }
    }

    /// Failures are unparseable listings instead of 503s.
    fn malformed(mut self) -> Self {
        self.malformed = true;
        self
    }

    fn failing(mut self, failures: usize, attempts: u32) -> Self {
        self.failures = AtomicUsize::new(failures);
        self.policy = RetryPolicy {
            attempts,
            delay: Duration::ZERO,
        };
        self
    }
}

#[async_trait]
impl RecordSource for StubSource {
    fn table(&self) -> SourceTable {
        SourceTable::Oai
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.policy
    }

    async fn list(&self, _since: NaiveDate, _cursor: Option<&str>) -> Result<RecordPage, SourceError> {
        let left = self.failures.load(Ordering::SeqCst);
        if left > 0 {
            self.failures.store(left - 1, Ordering::SeqCst);
            if self.malformed {
                return Err(SourceError::Parse("truncated listing".to_string()));
            }
            return Err(SourceError::Status(503));
        }
        Ok(RecordPage {
            records: self.records.clone(),
            next: None,
        })
    }
}

fn record(title: &str, link: &str) -> CandidateRecord {
    CandidateRecord {
        title: title.to_string(),
        authors: "Marie Curie".to_string(),
        publication_date: Some("2024-03-01".to_string()),
        abstract_text: "Un résumé.".to_string(),
        pdf_link: link.to_string(),
    }
}

struct Harness {
    dir: TempDir,
    ctx: DbContext,
    pipeline: Pipeline,
}

async fn harness(source: StubSource, fetch_misses: usize, max_records: usize) -> Harness {
    let dir = tempdir().unwrap();
    let mut settings = Settings::with_data_dir(dir.path().to_path_buf());
    settings.harvest.request_delay = Duration::ZERO;
    settings.harvest.max_records = max_records;

    let ctx = DbContext::from_path(&dir.path().join("harvest.db"));
    ctx.init_schema().await.unwrap();

    let processor = Arc::new(ArticleProcessor::new(
        ctx.articles(),
        StubFetcher::new(dir.path(), fetch_misses),
        Arc::new(StubExtractor),
        Arc::new(ControversyScorer::with_model(Arc::new(KeywordModel), 512)),
    ));
    let pipeline = Pipeline::new(&ctx, processor, vec![Arc::new(source)], &settings);

    Harness {
        dir,
        ctx,
        pipeline,
    }
}

#[tokio::test]
async fn test_harvest_stores_cleans_and_scores() {
    let h = harness(
        StubSource::new(vec![record("Étude X", "http://example.org/x.pdf")]),
        0,
        10,
    )
    .await;

    let report = h.pipeline.harvest(SourceTable::Oai).await.unwrap();
    assert_eq!(report.listed, 1);
    assert_eq!(report.inserted, 1);
    assert_eq!(report.completed, 1);
    assert_eq!(report.watermark, Some(Utc::now().date_naive()));

    let rows = h.ctx.articles().list(SourceTable::Oai, 10, 0).await.unwrap();
    assert_eq!(rows.len(), 1);
    let article = &rows[0];
    assert_eq!(article.title, "Étude X");
    assert_eq!(
        article.full_text.as_deref(),
        Some(
            "Sentence one is neutral. Sentence two is wildly ambiguous and contested by experts five words minimum."
        )
    );
    assert_eq!(article.controversy_score, Some(0.9));
    assert_eq!(article.is_controversial, Some(true));
    assert_eq!(
        article.controversy_excerpt.as_deref(),
        Some("Sentence two is wildly ambiguous and contested by experts five words minimum.")
    );

    assert_eq!(
        h.ctx.meta().get_watermark().await.unwrap(),
        Some(Utc::now().date_naive())
    );
}

#[tokio::test]
async fn test_second_harvest_skips_duplicates() {
    let h = harness(
        StubSource::new(vec![record("Étude X", "http://example.org/x.pdf")]),
        0,
        10,
    )
    .await;

    h.pipeline.harvest(SourceTable::Oai).await.unwrap();
    let second = h.pipeline.harvest(SourceTable::Oai).await.unwrap();

    assert_eq!(second.duplicates, 1);
    assert_eq!(second.inserted, 0);
    assert_eq!(second.completed, 0);
    assert_eq!(second.watermark, None);
    assert_eq!(h.ctx.articles().counts(SourceTable::Oai).await.unwrap().total, 1);
}

#[tokio::test]
async fn test_fetch_miss_keeps_row_for_backfill() {
    let h = harness(
        StubSource::new(vec![record("Étude Y", "http://example.org/y.pdf")]),
        1,
        10,
    )
    .await;

    let report = h.pipeline.harvest(SourceTable::Oai).await.unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(report.completed, 0);
    assert_eq!(h.ctx.meta().get_watermark().await.unwrap(), None);

    let counts = h.ctx.articles().counts(SourceTable::Oai).await.unwrap();
    assert_eq!(counts.total, 1);
    assert_eq!(counts.with_text, 0);

    let backfill = h.pipeline.backfill(SourceTable::Oai, 20).await.unwrap();
    assert_eq!(backfill.attempted, 1);
    assert_eq!(backfill.extracted, 1);

    let article = &h.ctx.articles().list(SourceTable::Oai, 10, 0).await.unwrap()[0];
    assert!(article.has_text());
    // backfill extracts without scoring
    assert_eq!(article.controversy_score, None);

    let rescored = h.pipeline.reanalyze(SourceTable::Oai, 100).await.unwrap();
    assert_eq!(rescored.failed, 0);
    assert_eq!(rescored.articles.len(), 1);
    assert_eq!(rescored.articles[0].score, 0.9);
}

#[tokio::test]
async fn test_max_records_caps_completed_articles() {
    let records = (1..=3)
        .map(|i| record(&format!("Paper {}", i), &format!("http://example.org/{}.pdf", i)))
        .collect();
    let h = harness(StubSource::new(records), 0, 2).await;

    let report = h.pipeline.harvest(SourceTable::Oai).await.unwrap();
    assert_eq!(report.completed, 2);
    assert_eq!(report.inserted, 2);
    assert_eq!(h.ctx.articles().counts(SourceTable::Oai).await.unwrap().total, 2);
}

#[tokio::test]
async fn test_transient_listing_failure_is_retried() {
    let source = StubSource::new(vec![record("Étude Z", "http://example.org/z.pdf")]).failing(1, 3);
    let h = harness(source, 0, 10).await;

    let report = h.pipeline.harvest(SourceTable::Oai).await.unwrap();
    assert_eq!(report.attempts, 2);
    assert_eq!(report.completed, 1);
    assert!(!report.aborted());
}

#[tokio::test]
async fn test_exhausted_retries_abort_without_watermark() {
    let source = StubSource::new(vec![record("Étude Z", "http://example.org/z.pdf")]).failing(5, 2);
    let h = harness(source, 0, 10).await;

    let report = h.pipeline.harvest(SourceTable::Oai).await.unwrap();
    assert_eq!(report.attempts, 2);
    assert!(report.aborted());
    assert_eq!(h.ctx.meta().get_watermark().await.unwrap(), None);
}

#[tokio::test]
async fn test_unknown_source_is_not_found() {
    let h = harness(StubSource::new(Vec::new()), 0, 10).await;
    assert!(h.pipeline.harvest(SourceTable::OpenAlex).await.is_err());
}

#[tokio::test]
async fn test_parse_failure_aborts_without_retry() {
    let source = StubSource::new(vec![record("Étude Z", "http://example.org/z.pdf")])
        .failing(5, 3)
        .malformed();
    let h = harness(source, 0, 10).await;

    let report = h.pipeline.harvest(SourceTable::Oai).await.unwrap();
    assert_eq!(report.attempts, 1);
    assert!(report.aborted());
    assert_eq!(report.inserted, 0);
    assert_eq!(h.ctx.meta().get_watermark().await.unwrap(), None);
}

const TEI: &str = r#"<TEI xmlns="http://www.tei-c.org/ns/1.0">
    <teiHeader><profileDesc><abstract><p>This finding is contested by many experts worldwide.</p></abstract></profileDesc></teiHeader>
    <text><body><div><p>The method follows standard practice in the field.</p></div></body></text>
</TEI>"#;

#[tokio::test]
async fn test_run_full_runs_stages_in_order() {
    let h = harness(
        StubSource::new(vec![record("Étude W", "http://example.org/w.pdf")]),
        1,
        10,
    )
    .await;

    let structured = NewStructuredMetadata::new(
        42,
        SourceTable::OpenAlex,
        Some("Seeded".to_string()),
        None,
        None,
        &[],
        Some(TEI.to_string()),
        None,
        &ControversyResult::empty(),
    );
    h.ctx.structured().upsert(&structured).await.unwrap();

    let report = h.pipeline.run_full(None).await;
    assert!(report.errors.is_empty(), "{:?}", report.errors);

    // stage 1: the record is stored but its PDF is missed
    assert_eq!(report.harvests.len(), 1);
    assert_eq!(report.harvests[0].inserted, 1);
    assert_eq!(report.harvests[0].completed, 0);

    // stage 2: the default backfill (oai) picks up the row harvested above
    assert_eq!(report.backfill.source, Some(SourceTable::Oai));
    assert_eq!(report.backfill.attempted, 1);
    assert_eq!(report.backfill.extracted, 1);
    let article = &h.ctx.articles().list(SourceTable::Oai, 10, 0).await.unwrap()[0];
    assert!(article.has_text());
    assert_eq!(article.controversy_score, None);

    // stage 3: stored TEI is re-scored into the structured record
    assert_eq!(report.rescore.rescored, 1);
    assert_eq!(report.rescore.controversial, 1);
    assert_eq!(report.rescore.failed, 0);
    let stored = h
        .ctx
        .structured()
        .get(42, SourceTable::OpenAlex)
        .await
        .unwrap()
        .unwrap();
    let controversy = stored.controversy.unwrap();
    assert_eq!(controversy.score, 0.9);
    assert!(controversy.is_controversial);
}

#[tokio::test]
async fn test_run_full_continues_after_aborted_harvest() {
    let source = StubSource::new(vec![record("Étude V", "http://example.org/v.pdf")])
        .failing(1, 1)
        .malformed();
    let h = harness(source, 0, 10).await;

    let report = h.pipeline.run_full(Some(5)).await;
    assert!(report.harvests[0].aborted());
    assert_eq!(report.backfill.attempted, 0);
    assert_eq!(report.rescore.rescored, 0);
}

impl Harness {
    /// Run raw SQL against the database file, bypassing the repositories.
    fn sql(&self, statements: &str) {
        rusqlite::Connection::open(self.dir.path().join("harvest.db"))
            .unwrap()
            .execute_batch(statements)
            .unwrap();
    }
}

#[tokio::test]
async fn test_reanalyze_continues_past_failed_save() {
    let records = (1..=2)
        .map(|i| record(&format!("Paper {}", i), &format!("http://example.org/{}.pdf", i)))
        .collect();
    let h = harness(StubSource::new(records), 0, 10).await;
    h.pipeline.harvest(SourceTable::Oai).await.unwrap();

    let first = h.ctx.articles().list(SourceTable::Oai, 10, 0).await.unwrap();
    let rejected = first.iter().find(|a| a.title == "Paper 1").unwrap().id;
    h.sql(&format!(
        "CREATE TRIGGER reject_one BEFORE UPDATE OF score_controverse ON articles_oai
         WHEN OLD.id = {}
         BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        rejected
    ));

    let report = h.pipeline.reanalyze(SourceTable::Oai, 100).await.unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(report.articles.len(), 1);
    assert_ne!(report.articles[0].id, rejected);
}

#[tokio::test]
async fn test_run_full_runs_later_stages_after_harvest_error() {
    let h = harness(
        StubSource::new(vec![record("Étude U", "http://example.org/u.pdf")]),
        0,
        10,
    )
    .await;
    let structured = NewStructuredMetadata::new(
        7,
        SourceTable::Oai,
        None,
        None,
        None,
        &[],
        Some(TEI.to_string()),
        None,
        &ControversyResult::empty(),
    );
    h.ctx.structured().upsert(&structured).await.unwrap();

    // the harvest cannot read its watermark
    h.sql("DROP TABLE meta;");

    let report = h.pipeline.run_full(None).await;
    assert!(report.harvests.is_empty());
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with("harvest oai"));
    assert_eq!(report.backfill.source, Some(SourceTable::Oai));
    assert_eq!(report.rescore.rescored, 1);
}
