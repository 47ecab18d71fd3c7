//! Structured-document analysis through GROBID.

use std::sync::Arc;

use serde::Serialize;

use super::ServiceError;
use crate::fetch::PdfFetcher;
use crate::grobid::GrobidClient;
use crate::models::{ControversyResult, SourceTable, StructuredMetadata, TeiMetadata};
use crate::nlp::ControversyScorer;
use crate::repository::{
    ArticleRepository, DieselError, NewStructuredMetadata, StructuredMetadataRepository,
};
use crate::tei::parse_tei_metadata;

/// Characters of the abstract kept as its excerpt.
const ABSTRACT_EXCERPT_CHARS: usize = 300;

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub analyzed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RescoreReport {
    pub rescored: usize,
    pub controversial: usize,
    pub failed: usize,
}

/// Result of analyzing an uploaded PDF. Nothing is stored.
#[derive(Debug, Clone, Serialize)]
pub struct UploadAnalysis {
    pub filename: String,
    pub metadata: TeiMetadata,
    pub controversy: ControversyResult,
    pub tei_xml: String,
}

fn abstract_excerpt(abstract_text: Option<&str>) -> Option<String> {
    abstract_text.map(|a| a.chars().take(ABSTRACT_EXCERPT_CHARS).collect())
}

pub struct StructuredAnalysis {
    articles: ArticleRepository,
    structured: StructuredMetadataRepository,
    grobid: GrobidClient,
    scorer: Arc<ControversyScorer>,
    fetcher: Arc<dyn PdfFetcher>,
}

impl StructuredAnalysis {
    pub fn new(
        articles: ArticleRepository,
        structured: StructuredMetadataRepository,
        grobid: GrobidClient,
        scorer: Arc<ControversyScorer>,
        fetcher: Arc<dyn PdfFetcher>,
    ) -> Self {
        Self {
            articles,
            structured,
            grobid,
            scorer,
            fetcher,
        }
    }

    /// Score the markup through the TEI path, then upsert the record.
    pub async fn save_structured_metadata(
        &self,
        source: SourceTable,
        article_id: i32,
        metadata: &TeiMetadata,
        tei_xml: &str,
    ) -> Result<ControversyResult, DieselError> {
        let controversy = self.scorer.score_tei(tei_xml).await;
        let record = NewStructuredMetadata::new(
            article_id,
            source,
            metadata.title.clone(),
            metadata.abstract_text.clone(),
            Some(metadata.authors_joined()),
            &metadata.citations,
            Some(tei_xml.to_string()),
            abstract_excerpt(metadata.abstract_text.as_deref()),
            &controversy,
        );
        self.structured.upsert(&record).await?;
        Ok(controversy)
    }

    /// Run GROBID on a stored article's PDF, downloading it first if needed.
    pub async fn analyze_article(
        &self,
        source: SourceTable,
        id: i32,
    ) -> Result<StructuredMetadata, ServiceError> {
        let article = self
            .articles
            .get(source, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("{} article {}", source.slug(), id)))?;

        let identifier = article.file_identifier();
        let mut path = self.fetcher.pdf_path(&identifier);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            path = self
                .fetcher
                .fetch(&article.pdf_link, &identifier)
                .await
                .ok_or_else(|| ServiceError::PdfUnavailable(article.pdf_link.clone()))?;
        }

        let pdf = tokio::fs::read(&path).await?;
        let tei = self
            .grobid
            .process_pdf(pdf, &format!("{}.pdf", identifier))
            .await?;
        let metadata = parse_tei_metadata(&tei)?;
        let controversy = self
            .save_structured_metadata(source, id, &metadata, &tei)
            .await?;
        tracing::info!(
            "Structured analysis of {} stored (TEI score {})",
            identifier,
            controversy.score
        );

        self.structured
            .get(id, source)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("structured metadata for {}", identifier)))
    }

    /// Analyze articles with text but no structured record, up to `limit`
    /// per source.
    pub async fn analyze_batch(&self, limit: i64) -> Result<BatchReport, ServiceError> {
        let mut report = BatchReport::default();
        for source in SourceTable::ALL {
            for article in self.articles.without_structured(source, limit).await? {
                match self.analyze_article(source, article.id).await {
                    Ok(_) => report.analyzed += 1,
                    Err(e) => {
                        tracing::warn!(
                            "Structured analysis failed for {}: {}",
                            article.file_identifier(),
                            e
                        );
                        report.failed += 1;
                    }
                }
            }
        }
        Ok(report)
    }

    /// Analyze an uploaded PDF without storing anything.
    pub async fn analyze_upload(
        &self,
        pdf: Vec<u8>,
        filename: &str,
    ) -> Result<UploadAnalysis, ServiceError> {
        if !infer::is(&pdf, "pdf") {
            return Err(ServiceError::InvalidInput("only PDF files are accepted".into()));
        }
        let tei_xml = self.grobid.process_pdf(pdf, filename).await?;
        let metadata = parse_tei_metadata(&tei_xml)?;
        let controversy = self.scorer.score_tei(&tei_xml).await;
        Ok(UploadAnalysis {
            filename: filename.to_string(),
            metadata,
            controversy,
            tei_xml,
        })
    }
}

/// Recompute TEI controversy for every stored record that kept its markup.
pub async fn rescore_structured(
    structured: &StructuredMetadataRepository,
    scorer: &ControversyScorer,
) -> Result<RescoreReport, DieselError> {
    let mut report = RescoreReport::default();
    for record in structured.with_tei().await? {
        let Some(tei) = record.tei_xml.as_deref() else {
            continue;
        };
        let result = scorer.score_tei(tei).await;
        if let Err(e) = structured.save_controversy(record.id, &result).await {
            tracing::warn!("Could not save TEI score of record {}: {}", record.id, e);
            report.failed += 1;
            continue;
        }
        report.rescored += 1;
        if result.is_controversial {
            report.controversial += 1;
        }
    }
    tracing::info!("Rescored {} structured records", report.rescored);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nlp::{ModelError, SentimentModel, SentimentScores};
    use crate::repository::DbContext;
    use async_trait::async_trait;
    use tempfile::tempdir;

    struct Balanced;

    #[async_trait]
    impl SentimentModel for Balanced {
        async fn classify(&self, _text: &str) -> Result<SentimentScores, ModelError> {
            Ok(SentimentScores {
                positive: 0.5,
                negative: 0.5,
            })
        }
    }

    const TEI: &str = r#"<TEI xmlns="http://www.tei-c.org/ns/1.0">
        <teiHeader><profileDesc><abstract><p>The results remain disputed among many researchers.</p></abstract></profileDesc></teiHeader>
        <text><body><div><p>Some experts strongly disagree with this conclusion.</p></div></body></text>
    </TEI>"#;

    #[test]
    fn test_abstract_excerpt_truncates_chars() {
        let long = "é".repeat(400);
        assert_eq!(abstract_excerpt(Some(&long)).unwrap().chars().count(), 300);
        assert_eq!(abstract_excerpt(Some("short")).as_deref(), Some("short"));
        assert!(abstract_excerpt(None).is_none());
    }

    #[tokio::test]
    async fn test_rescore_structured_writes_tei_fields() {
        let dir = tempdir().unwrap();
        let ctx = DbContext::from_path(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        let repo = ctx.structured();

        let with_markup = NewStructuredMetadata::new(
            1,
            SourceTable::Oai,
            None,
            None,
            None,
            &[],
            Some(TEI.to_string()),
            None,
            &ControversyResult::empty(),
        );
        let without_markup = NewStructuredMetadata::new(
            2,
            SourceTable::Oai,
            None,
            None,
            None,
            &[],
            None,
            None,
            &ControversyResult::empty(),
        );
        repo.upsert(&with_markup).await.unwrap();
        repo.upsert(&without_markup).await.unwrap();

        let scorer = ControversyScorer::with_model(Arc::new(Balanced), 512);
        let report = rescore_structured(&repo, &scorer).await.unwrap();
        assert_eq!(report.rescored, 1);
        assert_eq!(report.controversial, 1);

        let stored = repo.get(1, SourceTable::Oai).await.unwrap().unwrap();
        let controversy = stored.controversy.unwrap();
        assert_eq!(controversy.score, 1.0);
        assert_eq!(
            controversy.excerpt,
            "The results remain disputed among many researchers."
        );

        let untouched = repo.get(2, SourceTable::Oai).await.unwrap().unwrap();
        assert_eq!(untouched.controversy.unwrap().score, 0.0);
    }

    #[tokio::test]
    async fn test_rescore_structured_continues_past_failed_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let ctx = DbContext::from_path(&path);
        ctx.init_schema().await.unwrap();
        let repo = ctx.structured();

        for article_id in [1, 2] {
            let record = NewStructuredMetadata::new(
                article_id,
                SourceTable::Oai,
                None,
                None,
                None,
                &[],
                Some(TEI.to_string()),
                None,
                &ControversyResult::empty(),
            );
            repo.upsert(&record).await.unwrap();
        }

        rusqlite::Connection::open(&path)
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER reject_first BEFORE UPDATE ON grobid_metadata
                 WHEN OLD.article_id = 1
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        let scorer = ControversyScorer::with_model(Arc::new(Balanced), 512);
        let report = rescore_structured(&repo, &scorer).await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.rescored, 1);

        let saved = repo.get(2, SourceTable::Oai).await.unwrap().unwrap();
        assert_eq!(saved.controversy.unwrap().score, 1.0);
        let rejected = repo.get(1, SourceTable::Oai).await.unwrap().unwrap();
        assert_eq!(rejected.controversy.unwrap().score, 0.0);
    }
}
