//! Diesel row types.

use diesel::prelude::*;

use crate::models::{Article, SourceTable};
use crate::schema::grobid_metadata;

/// A row of either article table. Both tables share the same column
/// order, so one `Queryable` struct loads from each.
#[derive(Debug, Clone, Queryable)]
pub struct ArticleRecord {
    pub id: i32,
    pub titre: String,
    pub auteurs: Option<String>,
    pub date_publication: Option<String>,
    pub resume: Option<String>,
    pub lien_pdf: String,
    pub texte_complet: Option<String>,
    pub est_controverse: Option<bool>,
    pub score_controverse: Option<f64>,
    pub extrait_controverse: Option<String>,
}

impl ArticleRecord {
    pub fn into_article(self, source: SourceTable) -> Article {
        Article {
            id: self.id,
            source,
            title: self.titre,
            authors: self.auteurs,
            publication_date: self.date_publication,
            abstract_text: self.resume,
            pdf_link: self.lien_pdf,
            full_text: self.texte_complet,
            is_controversial: self.est_controverse,
            controversy_score: self.score_controverse,
            controversy_excerpt: self.extrait_controverse,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = grobid_metadata)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct StructuredMetadataRecord {
    pub id: i32,
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
