//! OpenAlex works listing.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use super::{LinkCorrector, RecordPage, RecordSource, SourceError};
use crate::config::{FetchSettings, HarvestSettings};
use crate::http_client::{build_client, USER_AGENT};
use crate::models::{CandidateRecord, SourceTable};

const UNTITLED: &str = "Sans titre";
const UNKNOWN_AUTHOR: &str = "?";

#[derive(Debug, Deserialize)]
struct WorksResponse {
    #[serde(default)]
    results: Vec<Work>,
}

#[derive(Debug, Deserialize)]
struct Work {
    title: Option<String>,
    #[serde(default)]
    authorships: Vec<Authorship>,
    publication_date: Option<String>,
    primary_location: Option<Location>,
    open_access: Option<OpenAccess>,
    abstract_inverted_index: Option<HashMap<String, Vec<usize>>>,
}

#[derive(Debug, Deserialize)]
struct Authorship {
    author: Option<AuthorRef>,
}

#[derive(Debug, Deserialize)]
struct AuthorRef {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Location {
    pdf_url: Option<String>,
    landing_page_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAccess {
    oa_url: Option<Value>,
    oa_urls: Option<Value>,
}

impl Work {
    /// Direct PDF, then landing page, then the first open-access URL.
    fn link(&self) -> Option<String> {
        let primary = self.primary_location.as_ref();
        primary
            .and_then(|l| non_empty(l.pdf_url.as_deref()))
            .or_else(|| primary.and_then(|l| non_empty(l.landing_page_url.as_deref())))
            .or_else(|| {
                let oa = self.open_access.as_ref()?;
                oa.oa_url
                    .as_ref()
                    .and_then(first_url)
                    .or_else(|| oa.oa_urls.as_ref().and_then(first_url))
            })
    }

    fn authors(&self) -> String {
        self.authorships
            .iter()
            .map(|a| {
                a.author
                    .as_ref()
                    .and_then(|r| r.display_name.as_deref())
                    .unwrap_or(UNKNOWN_AUTHOR)
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// A bare URL string, or the first entry of a list of strings or `{url}` objects.
fn first_url(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(Some(s)),
        Value::Array(items) => items.first().and_then(|entry| match entry {
            Value::String(s) => non_empty(Some(s)),
            Value::Object(obj) => obj.get("url").and_then(Value::as_str).and_then(|s| non_empty(Some(s))),
            _ => None,
        }),
        _ => None,
    }
}

/// Rebuild an abstract from OpenAlex's word → positions index.
pub fn rebuild_abstract(index: &HashMap<String, Vec<usize>>) -> String {
    let mut positioned: Vec<(usize, &str)> = index
        .iter()
        .flat_map(|(word, positions)| positions.iter().map(move |&p| (p, word.as_str())))
        .collect();
    positioned.sort_unstable_by_key(|&(p, _)| p);
    positioned
        .into_iter()
        .map(|(_, w)| w)
        .collect::<Vec<_>>()
        .join(" ")
}

pub struct OpenAlexSource {
    client: Client,
    base_url: String,
    email: Option<String>,
    page_size: usize,
    links: LinkCorrector,
}

impl OpenAlexSource {
    pub fn new(harvest: &HarvestSettings, fetch: &FetchSettings) -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client(USER_AGENT, fetch.timeout)?,
            base_url: harvest.openalex_url.clone(),
            email: harvest.openalex_email.clone(),
            page_size: harvest.page_size,
            links: LinkCorrector::new(fetch.probe_timeout)?,
        })
    }

    async fn to_candidate(&self, work: Work, since: NaiveDate) -> Option<CandidateRecord> {
        let title = non_empty(work.title.as_deref()).unwrap_or_else(|| UNTITLED.to_string());
        let Some(link) = work.link() else {
            tracing::info!("Skipping '{}': no PDF or landing page link", title);
            return None;
        };

        Some(CandidateRecord {
            authors: work.authors(),
            publication_date: Some(
                work.publication_date
                    .clone()
                    .unwrap_or_else(|| since.format("%Y-%m-%d").to_string()),
            ),
            abstract_text: work
                .abstract_inverted_index
                .as_ref()
                .map(rebuild_abstract)
                .unwrap_or_default(),
            pdf_link: self.links.correct(&link).await,
            title,
        })
    }
}

#[async_trait]
impl RecordSource for OpenAlexSource {
    fn table(&self) -> SourceTable {
        SourceTable::OpenAlex
    }

    async fn list(
        &self,
        since: NaiveDate,
        _cursor: Option<&str>,
    ) -> Result<RecordPage, SourceError> {
        let mut query = vec![
            (
                "filter",
                format!("from_publication_date:{}", since.format("%Y-%m-%d")),
            ),
            ("per-page", self.page_size.to_string()),
        ];
        if let Some(email) = &self.email {
            query.push(("mailto", email.clone()));
        }

        tracing::debug!("Listing OpenAlex works since {}", since);
        let resp = self.client.get(&self.base_url).query(&query).send().await?;
        if resp.status() != StatusCode::OK {
            return Err(SourceError::Status(resp.status().as_u16()));
        }

        let body = resp.text().await?;
        let works: WorksResponse =
            serde_json::from_str(&body).map_err(|e| SourceError::Parse(e.to_string()))?;
        tracing::info!("{} OpenAlex works listed", works.results.len());

        let mut records = Vec::with_capacity(works.results.len());
        for work in works.results {
            if let Some(record) = self.to_candidate(work, since).await {
                records.push(record);
            }
        }

        // A single page per run
        Ok(RecordPage {
            records,
            next: None,
        })
    }
}
