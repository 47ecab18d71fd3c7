//! Database context: schema setup and repository construction.

use std::path::Path;

use diesel::sql_types::Text;
use diesel::QueryableByName;
use diesel_async::{RunQueryDsl, SimpleAsyncConnection};

use super::articles::ArticleRepository;
use super::meta::MetaRepository;
use super::pool::{AsyncSqlitePool, DieselError};
use super::structured::StructuredMetadataRepository;

#[derive(QueryableByName)]
struct TableName {
    #[diesel(sql_type = Text)]
    name: String,
}

#[derive(Clone)]
pub struct DbContext {
    pool: AsyncSqlitePool,
}

impl DbContext {
    pub fn new(database_url: &str) -> Self {
        Self {
            pool: AsyncSqlitePool::new(database_url),
        }
    }

    pub fn from_path(db_path: &Path) -> Self {
        Self {
            pool: AsyncSqlitePool::from_path(db_path),
        }
    }

    pub fn pool(&self) -> &AsyncSqlitePool {
        &self.pool
    }

    pub fn articles(&self) -> ArticleRepository {
        ArticleRepository::new(self.pool.clone())
    }

    pub fn structured(&self) -> StructuredMetadataRepository {
        StructuredMetadataRepository::new(self.pool.clone())
    }

    pub fn meta(&self) -> MetaRepository {
        MetaRepository::new(self.pool.clone())
    }

    /// Create all tables if they do not exist yet.
    pub async fn init_schema(&self) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        conn.batch_execute(
            r#"
            CREATE TABLE IF NOT EXISTS articles_openalex (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                titre TEXT NOT NULL,
                auteurs TEXT,
                date_publication TEXT,
                resume TEXT,
                lien_pdf TEXT NOT NULL UNIQUE,
                texte_complet TEXT,
                est_controverse BOOLEAN,
                score_controverse REAL,
                extrait_controverse TEXT
            );

            CREATE TABLE IF NOT EXISTS articles_oai (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                titre TEXT NOT NULL,
                auteurs TEXT,
                date_publication TEXT,
                resume TEXT,
                lien_pdf TEXT NOT NULL UNIQUE,
                texte_complet TEXT,
                est_controverse BOOLEAN,
                score_controverse REAL,
                extrait_controverse TEXT
            );

            CREATE TABLE IF NOT EXISTS grobid_metadata (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                article_id INTEGER NOT NULL,
                source TEXT NOT NULL,
                titre TEXT,
                resume TEXT,
                auteurs TEXT,
                citations TEXT,
                tei_xml TEXT,
                date_extraction TEXT NOT NULL,
                extrait_resume TEXT,
                est_controverse_tei BOOLEAN,
                score_controverse_tei REAL,
                extrait_controverse_tei TEXT,
                UNIQUE (article_id, source)
            );

            CREATE TABLE IF NOT EXISTS meta (
                "key" TEXT PRIMARY KEY,
                value TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_openalex_date ON articles_openalex(date_publication);
            CREATE INDEX IF NOT EXISTS idx_oai_date ON articles_oai(date_publication);
            "#,
        )
        .await
    }

    /// Names of all user tables.
    pub async fn list_tables(&self) -> Result<Vec<String>, DieselError> {
        let mut conn = self.pool.get().await?;

        let rows: Vec<TableName> = diesel::sql_query(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .load(&mut conn)
        .await?;

        Ok(rows.into_iter().map(|r| r.name).collect())
    }
}
