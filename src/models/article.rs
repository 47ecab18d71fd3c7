//! Harvested article model and the source table it lives in.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the two per-source article tables.
///
/// Every storage operation that targets an article table takes this enum,
/// so a table name never travels as a free-form string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTable {
    /// Works listed by the OpenAlex API.
    OpenAlex,
    /// Records streamed from the OAI-PMH endpoint (ArXiv).
    Oai,
}

impl SourceTable {
    pub const ALL: [SourceTable; 2] = [SourceTable::OpenAlex, SourceTable::Oai];

    /// Storage table name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTable::OpenAlex => "articles_openalex",
            SourceTable::Oai => "articles_oai",
        }
    }

    /// Short name used in URLs, CLI flags and file names.
    pub fn slug(&self) -> &'static str {
        match self {
            SourceTable::OpenAlex => "openalex",
            SourceTable::Oai => "oai",
        }
    }

    /// Parse from either the slug or the table name.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openalex" | "articles_openalex" => Some(SourceTable::OpenAlex),
            "oai" | "arxiv" | "articles_oai" => Some(SourceTable::Oai),
            _ => None,
        }
    }
}

impl fmt::Display for SourceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for SourceTable {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown source '{}' (expected openalex or oai)", s))
    }
}

/// A stored article row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i32,
    pub source: SourceTable,
    pub title: String,
    pub authors: Option<String>,
    pub publication_date: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub pdf_link: String,
    pub full_text: Option<String>,
    pub is_controversial: Option<bool>,
    pub controversy_score: Option<f64>,
    pub controversy_excerpt: Option<String>,
}

impl Article {
    /// Name of the local PDF file for this article.
    pub fn file_identifier(&self) -> String {
        file_identifier(self.source, self.id)
    }

    pub fn has_text(&self) -> bool {
        self.full_text.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Identifier used to name downloaded PDFs. Prefixed with the source so
/// both tables can share one PDF directory.
pub fn file_identifier(source: SourceTable, id: i32) -> String {
    format!("{}-{}", source.slug(), id)
}

/// A record listed by a harvester, before it is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub title: String,
    pub authors: String,
    pub publication_date: Option<String>,
    pub abstract_text: String,
    pub pdf_link: String,
}
