//! Article repository over the two per-source tables.

use chrono::NaiveDate;
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};

use super::pool::{AsyncSqlitePool, DieselError};
use super::records::ArticleRecord;
use super::util::is_unique_violation;
use crate::models::{Article, CandidateRecord, ControversyResult, SourceTable};

/// Run `$body` with `$t` bound to the schema module of the selected table.
///
/// Table names are never formatted into SQL; each arm names a static
/// Diesel table.
macro_rules! with_table {
    ($source:expr, $t:ident => $body:block) => {
        match $source {
            SourceTable::OpenAlex => {
                use crate::schema::articles_openalex as $t;
                $body
            }
            SourceTable::Oai => {
                use crate::schema::articles_oai as $t;
                $body
            }
        }
    };
}

/// Narrow a boxed query of table `$t` by the criteria of an [`ArticleSearch`].
macro_rules! search_filters {
    ($query:expr, $t:ident, $search:expr) => {{
        let mut query = $query;
        if let Some(keyword) = non_empty(&$search.keyword) {
            let pattern = format!("%{}%", keyword);
            query = query.filter($t::titre.like(pattern.clone()).or($t::resume.like(pattern)));
        }
        if let Some(author) = non_empty(&$search.author) {
            query = query.filter($t::auteurs.like(format!("%{}%", author)));
        }
        if let Some(from) = $search.date_from {
            query = query.filter($t::date_publication.ge(from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = $search.date_to {
            query = query.filter($t::date_publication.le(to.format("%Y-%m-%d").to_string()));
        }
        query
    }};
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Publication-date ordering of search results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateOrder {
    #[serde(rename = "date_asc")]
    Asc,
    #[default]
    #[serde(rename = "date_desc")]
    Desc,
}

/// Search criteria over one source table. Empty criteria match everything.
///
/// Keywords match the title or the abstract, authors match the author list,
/// both case-insensitively for ASCII. Date bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct ArticleSearch {
    pub keyword: Option<String>,
    pub author: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub order: DateOrder,
}

/// One page of search results with the total match count.
#[derive(Debug, Clone, Serialize)]
pub struct SearchPage {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub articles: Vec<Article>,
}

/// Row counts for one source table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceCounts {
    pub total: i64,
    pub with_text: i64,
    pub controversial: i64,
}

#[derive(Clone)]
pub struct ArticleRepository {
    pool: AsyncSqlitePool,
}

impl ArticleRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// Check whether a PDF link is already stored for this source.
    pub async fn exists(&self, source: SourceTable, link: &str) -> Result<bool, DieselError> {
        let mut conn = self.pool.get().await?;

        let count: i64 = with_table!(source, t => {
            t::table
                .filter(t::lien_pdf.eq(link))
                .select(count_star())
                .first(&mut conn)
                .await?
        });

        Ok(count > 0)
    }

    /// Insert a placeholder row for a newly listed record.
    ///
    /// Returns the new id, or `None` when the link is already present.
    pub async fn insert(
        &self,
        source: SourceTable,
        record: &CandidateRecord,
    ) -> Result<Option<i32>, DieselError> {
        let mut conn = self.pool.get().await?;

        let result: Result<i32, DieselError> = with_table!(source, t => {
            diesel::insert_into(t::table)
                .values((
                    t::titre.eq(&record.title),
                    t::auteurs.eq(&record.authors),
                    t::date_publication.eq(&record.publication_date),
                    t::resume.eq(&record.abstract_text),
                    t::lien_pdf.eq(&record.pdf_link),
                ))
                .returning(t::id)
                .get_result(&mut conn)
                .await
        });

        match result {
            Ok(id) => Ok(Some(id)),
            Err(e) if is_unique_violation(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn get(&self, source: SourceTable, id: i32) -> Result<Option<Article>, DieselError> {
        let mut conn = self.pool.get().await?;

        let record: Option<ArticleRecord> = with_table!(source, t => {
            t::table.find(id).first::<ArticleRecord>(&mut conn).await.optional()?
        });

        Ok(record.map(|r| r.into_article(source)))
    }

    /// Store extracted full text.
    pub async fn save_text(
        &self,
        source: SourceTable,
        id: i32,
        text: &str,
    ) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        with_table!(source, t => {
            diesel::update(t::table.find(id))
                .set(t::texte_complet.eq(Some(text)))
                .execute(&mut conn)
                .await?;
        });

        Ok(())
    }

    /// Clear extracted text so a later backfill picks the row up again.
    pub async fn reset_text(&self, source: SourceTable, id: i32) -> Result<bool, DieselError> {
        let mut conn = self.pool.get().await?;

        let rows = with_table!(source, t => {
            diesel::update(t::table.find(id))
                .set(t::texte_complet.eq(None::<String>))
                .execute(&mut conn)
                .await?
        });

        Ok(rows > 0)
    }

    pub async fn save_controversy(
        &self,
        source: SourceTable,
        id: i32,
        result: &ControversyResult,
    ) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        with_table!(source, t => {
            diesel::update(t::table.find(id))
                .set((
                    t::est_controverse.eq(Some(result.is_controversial)),
                    t::score_controverse.eq(Some(result.score)),
                    t::extrait_controverse.eq(Some(&result.excerpt)),
                ))
                .execute(&mut conn)
                .await?;
        });

        Ok(())
    }

    /// Articles ordered by publication date, newest first.
    pub async fn list(
        &self,
        source: SourceTable,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Article>, DieselError> {
        let mut conn = self.pool.get().await?;

        let records: Vec<ArticleRecord> = with_table!(source, t => {
            t::table
                .order((t::date_publication.desc(), t::id.desc()))
                .limit(limit)
                .offset(offset)
                .load(&mut conn)
                .await?
        });

        Ok(records.into_iter().map(|r| r.into_article(source)).collect())
    }

    /// Flagged articles scoring at least `threshold`, highest score first.
    pub async fn list_controversial(
        &self,
        source: SourceTable,
        threshold: f64,
        limit: i64,
    ) -> Result<Vec<Article>, DieselError> {
        let mut conn = self.pool.get().await?;

        let records: Vec<ArticleRecord> = with_table!(source, t => {
            t::table
                .filter(t::est_controverse.eq(true))
                .filter(t::score_controverse.ge(threshold))
                .order(t::score_controverse.desc())
                .limit(limit)
                .load(&mut conn)
                .await?
        });

        Ok(records.into_iter().map(|r| r.into_article(source)).collect())
    }

    /// Articles still waiting for full text.
    pub async fn missing_text(
        &self,
        source: SourceTable,
        limit: i64,
    ) -> Result<Vec<Article>, DieselError> {
        let mut conn = self.pool.get().await?;

        let records: Vec<ArticleRecord> = with_table!(source, t => {
            t::table
                .filter(t::texte_complet.is_null())
                .order(t::id.asc())
                .limit(limit)
                .load(&mut conn)
                .await?
        });

        Ok(records.into_iter().map(|r| r.into_article(source)).collect())
    }

    /// Articles with full text, oldest first.
    pub async fn with_text(
        &self,
        source: SourceTable,
        limit: i64,
    ) -> Result<Vec<Article>, DieselError> {
        let mut conn = self.pool.get().await?;

        let records: Vec<ArticleRecord> = with_table!(source, t => {
            t::table
                .filter(t::texte_complet.is_not_null())
                .order(t::id.asc())
                .limit(limit)
                .load(&mut conn)
                .await?
        });

        Ok(records.into_iter().map(|r| r.into_article(source)).collect())
    }

    /// Articles with full text that have no structured-metadata record yet.
    pub async fn without_structured(
        &self,
        source: SourceTable,
        limit: i64,
    ) -> Result<Vec<Article>, DieselError> {
        use crate::schema::grobid_metadata;

        let mut conn = self.pool.get().await?;
        let analyzed = grobid_metadata::table
            .filter(grobid_metadata::source.eq(source.as_str()))
            .select(grobid_metadata::article_id);

        let records: Vec<ArticleRecord> = with_table!(source, t => {
            t::table
                .filter(t::texte_complet.is_not_null())
                .filter(t::id.ne_all(analyzed))
                .order(t::id.asc())
                .limit(limit)
                .load(&mut conn)
                .await?
        });

        Ok(records.into_iter().map(|r| r.into_article(source)).collect())
    }

    /// Search one source table. `page` starts at 1.
    pub async fn search(
        &self,
        source: SourceTable,
        search: &ArticleSearch,
        page: i64,
        limit: i64,
    ) -> Result<SearchPage, DieselError> {
        let page = page.max(1);
        let limit = limit.max(1);
        let offset = (page - 1) * limit;

        let mut conn = self.pool.get().await?;

        let (total, records): (i64, Vec<ArticleRecord>) = with_table!(source, t => {
            let total: i64 = search_filters!(t::table.select(count_star()).into_boxed(), t, search)
                .first(&mut conn)
                .await?;

            let mut query = search_filters!(t::table.into_boxed(), t, search);
            query = match search.order {
                DateOrder::Asc => query.order((t::date_publication.asc(), t::id.asc())),
                DateOrder::Desc => query.order((t::date_publication.desc(), t::id.desc())),
            };
            let records = query.limit(limit).offset(offset).load(&mut conn).await?;
            (total, records)
        });

        Ok(SearchPage {
            page,
            limit,
            total,
            articles: records.into_iter().map(|r| r.into_article(source)).collect(),
        })
    }

    pub async fn counts(&self, source: SourceTable) -> Result<SourceCounts, DieselError> {
        let mut conn = self.pool.get().await?;

        let counts = with_table!(source, t => {
            let total: i64 = t::table.select(count_star()).first(&mut conn).await?;
            let with_text: i64 = t::table
                .filter(t::texte_complet.is_not_null())
                .select(count_star())
                .first(&mut conn)
                .await?;
            let controversial: i64 = t::table
                .filter(t::est_controverse.eq(true))
                .select(count_star())
                .first(&mut conn)
                .await?;
            SourceCounts { total, with_text, controversial }
        });

        Ok(counts)
    }

    /// Delete every article of a source. Administrative purge only.
    pub async fn purge(&self, source: SourceTable) -> Result<usize, DieselError> {
        let mut conn = self.pool.get().await?;

        let rows = with_table!(source, t => {
            diesel::delete(t::table).execute(&mut conn).await?
        });

        Ok(rows)
    }
}
