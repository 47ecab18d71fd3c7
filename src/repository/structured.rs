//! Structured-document (GROBID/TEI) metadata repository.

use chrono::Utc;
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::parse_datetime;
use super::pool::{AsyncSqlitePool, DieselError};
use super::records::StructuredMetadataRecord;
use crate::models::{Citation, ControversyResult, SourceTable, StructuredMetadata};
use crate::schema::grobid_metadata;

impl StructuredMetadataRecord {
    /// Convert to the domain model. Rows with an unknown source are dropped.
    fn into_model(self) -> Option<StructuredMetadata> {
        let source = SourceTable::from_name(&self.source)?;
        let citations: Vec<Citation> = self
            .citations
            .as_deref()
            .and_then(|c| serde_json::from_str(c).ok())
            .unwrap_or_default();
        let controversy = self.score_controverse_tei.map(|score| ControversyResult {
            is_controversial: self.est_controverse_tei.unwrap_or(false),
            score,
            excerpt: self.extrait_controverse_tei.clone().unwrap_or_default(),
        });

        Some(StructuredMetadata {
            id: self.id,
            article_id: self.article_id,
            source,
            title: self.titre,
            abstract_text: self.resume,
            authors: self.auteurs,
            citations,
            tei_xml: self.tei_xml,
            extracted_at: parse_datetime(&self.date_extraction),
            abstract_excerpt: self.extrait_resume,
            controversy,
        })
    }
}

/// Values written by an upsert. Every column is overwritten on conflict.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = grobid_metadata)]
#[diesel(treat_none_as_null = true)]
pub struct NewStructuredMetadata {
    pub article_id: i32,
    pub source: String,
    pub titre: Option<String>,
    pub resume: Option<String>,
    pub auteurs: Option<String>,
    pub citations: Option<String>,
    pub tei_xml: Option<String>,
    pub date_extraction: String,
    pub extrait_resume: Option<String>,
    pub est_controverse_tei: Option<bool>,
    pub score_controverse_tei: Option<f64>,
    pub extrait_controverse_tei: Option<String>,
}

impl NewStructuredMetadata {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        article_id: i32,
        source: SourceTable,
        title: Option<String>,
        abstract_text: Option<String>,
        authors: Option<String>,
        citations: &[Citation],
        tei_xml: Option<String>,
        abstract_excerpt: Option<String>,
        controversy: &ControversyResult,
    ) -> Self {
        Self {
            article_id,
            source: source.as_str().to_string(),
            titre: title,
            resume: abstract_text,
            auteurs: authors,
            citations: serde_json::to_string(citations).ok(),
            tei_xml,
            date_extraction: Utc::now().to_rfc3339(),
            extrait_resume: abstract_excerpt,
            est_controverse_tei: Some(controversy.is_controversial),
            score_controverse_tei: Some(controversy.score),
            extrait_controverse_tei: Some(controversy.excerpt.clone()),
        }
    }
}

#[derive(Clone)]
pub struct StructuredMetadataRepository {
    pool: AsyncSqlitePool,
}

impl StructuredMetadataRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or overwrite the record for (article_id, source) in one statement.
    pub async fn upsert(&self, record: &NewStructuredMetadata) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        diesel::insert_into(grobid_metadata::table)
            .values(record)
            .on_conflict((grobid_metadata::article_id, grobid_metadata::source))
            .do_update()
            .set(record)
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    pub async fn get(
        &self,
        article_id: i32,
        source: SourceTable,
    ) -> Result<Option<StructuredMetadata>, DieselError> {
        let mut conn = self.pool.get().await?;

        let record = grobid_metadata::table
            .filter(grobid_metadata::article_id.eq(article_id))
            .filter(grobid_metadata::source.eq(source.as_str()))
            .select(StructuredMetadataRecord::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        Ok(record.and_then(StructuredMetadataRecord::into_model))
    }

    /// Delete every record of one source.
    pub async fn purge(&self, source: SourceTable) -> Result<usize, DieselError> {
        let mut conn = self.pool.get().await?;

        diesel::delete(grobid_metadata::table.filter(grobid_metadata::source.eq(source.as_str())))
            .execute(&mut conn)
            .await
    }

    /// Every record that still carries its TEI markup.
    pub async fn with_tei(&self) -> Result<Vec<StructuredMetadata>, DieselError> {
        let mut conn = self.pool.get().await?;

        let records: Vec<StructuredMetadataRecord> = grobid_metadata::table
            .filter(grobid_metadata::tei_xml.is_not_null())
            .order(grobid_metadata::id.asc())
            .select(StructuredMetadataRecord::as_select())
            .load(&mut conn)
            .await?;

        Ok(records
            .into_iter()
            .filter_map(StructuredMetadataRecord::into_model)
            .collect())
    }

    /// Overwrite the TEI-derived controversy fields of one record.
    pub async fn save_controversy(
        &self,
        id: i32,
        result: &ControversyResult,
    ) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        diesel::update(grobid_metadata::table.find(id))
            .set((
                grobid_metadata::est_controverse_tei.eq(Some(result.is_controversial)),
                grobid_metadata::score_controverse_tei.eq(Some(result.score)),
                grobid_metadata::extrait_controverse_tei.eq(Some(&result.excerpt)),
            ))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    pub async fn count(&self) -> Result<i64, DieselError> {
        let mut conn = self.pool.get().await?;

        grobid_metadata::table
            .select(count_star())
            .first(&mut conn)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::DbContext;
    use tempfile::tempdir;

    async fn setup() -> (StructuredMetadataRepository, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let ctx = DbContext::from_path(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        (ctx.structured(), dir)
    }

    fn record(title: &str, score: f64) -> NewStructuredMetadata {
        NewStructuredMetadata::new(
            7,
            SourceTable::OpenAlex,
            Some(title.to_string()),
            Some("An abstract.".to_string()),
            Some("Ada Lovelace".to_string()),
            &[Citation {
                title: "On computing".to_string(),
                author: Some("Turing".to_string()),
                date: Some("1936".to_string()),
            }],
            Some("<TEI/>".to_string()),
            Some("An abstract.".to_string()),
            &ControversyResult::from_best(score, Some("excerpt")),
        )
    }

    #[tokio::test]
    async fn test_upsert_overwrites_same_key() {
        let (repo, _dir) = setup().await;

        repo.upsert(&record("First", 0.2)).await.unwrap();
        repo.upsert(&record("Second", 0.8)).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 1);
        let stored = repo.get(7, SourceTable::OpenAlex).await.unwrap().unwrap();
        assert_eq!(stored.title.as_deref(), Some("Second"));
        assert_eq!(stored.citations.len(), 1);
        assert_eq!(stored.citations[0].author.as_deref(), Some("Turing"));
        let controversy = stored.controversy.unwrap();
        assert!(controversy.is_controversial);
        assert_eq!(controversy.score, 0.8);
    }

    #[tokio::test]
    async fn test_same_article_id_differs_per_source() {
        let (repo, _dir) = setup().await;

        let mut other = record("Other", 0.1);
        other.source = SourceTable::Oai.as_str().to_string();
        repo.upsert(&record("Mine", 0.1)).await.unwrap();
        repo.upsert(&other).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 2);
        assert!(repo.get(7, SourceTable::Oai).await.unwrap().is_some());
        assert!(repo.get(8, SourceTable::Oai).await.unwrap().is_none());

        assert_eq!(repo.purge(SourceTable::Oai).await.unwrap(), 1);
        assert_eq!(repo.count().await.unwrap(), 1);
        assert!(repo.get(7, SourceTable::OpenAlex).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_save_controversy_updates_tei_fields() {
        let (repo, _dir) = setup().await;
        repo.upsert(&record("Doc", 0.1)).await.unwrap();

        let stored = repo.with_tei().await.unwrap();
        assert_eq!(stored.len(), 1);

        repo.save_controversy(stored[0].id, &ControversyResult::failed())
            .await
            .unwrap();
        let updated = repo.get(7, SourceTable::OpenAlex).await.unwrap().unwrap();
        assert_eq!(updated.controversy.unwrap().excerpt, "Erreur NLP");
    }
}
