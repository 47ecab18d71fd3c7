//! Structured document (TEI) metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ControversyResult, SourceTable};

/// A bibliography entry parsed from TEI markup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    pub author: Option<String>,
    pub date: Option<String>,
}

/// Header fields and bibliography parsed from a TEI document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeiMetadata {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub date: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub citations: Vec<Citation>,
}

impl TeiMetadata {
    /// Authors as a single display string.
    pub fn authors_joined(&self) -> String {
        self.authors.join(", ")
    }
}

/// A stored structured-metadata record, unique per (article, source).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredMetadata {
    pub id: i32,
    pub article_id: i32,
    pub source: SourceTable,
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub authors: Option<String>,
    pub citations: Vec<Citation>,
    #[serde(skip_serializing)]
    pub tei_xml: Option<String>,
    pub extracted_at: DateTime<Utc>,
    pub abstract_excerpt: Option<String>,
    pub controversy: Option<ControversyResult>,
}
