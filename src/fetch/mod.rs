//! PDF resolution and download.
//!
//! A link may point straight at a PDF or at a landing page. Landing pages
//! are searched for a PDF link (citation meta tag, then `.pdf` anchors, then
//! the DOI `.pdf` suffix) and followed up to a fixed number of hops.

mod resolve;

pub use resolve::pdf_candidates;

use std::collections::HashSet;
use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use url::Url;

use crate::config::FetchSettings;
use crate::http_client::{build_client, build_insecure_client, content_type_is, resolve_user_agent};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {0}")]
    Status(u16),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fetches the PDF behind a link to a local file.
#[async_trait]
pub trait PdfFetcher: Send + Sync {
    /// Download `url` as `<identifier>.pdf`. `None` means no PDF could be
    /// obtained on this attempt.
    async fn fetch(&self, url: &str, identifier: &str) -> Option<PathBuf>;

    /// Where a fetched PDF for `identifier` is stored.
    fn pdf_path(&self, identifier: &str) -> PathBuf;
}

/// What a response turned out to contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Pdf,
    Html,
    Other,
}

struct Fetched {
    final_url: Url,
    kind: BodyKind,
    body: Vec<u8>,
}

struct Hop {
    url: String,
    depth: usize,
}

/// HTTP implementation of [`PdfFetcher`].
pub struct HttpPdfFetcher {
    client: Client,
    insecure: Client,
    pdf_dir: PathBuf,
    max_hops: usize,
}

impl HttpPdfFetcher {
    pub fn new(settings: &FetchSettings, pdf_dir: impl Into<PathBuf>) -> Result<Self, FetchError> {
        let user_agent = resolve_user_agent(settings.user_agent.as_deref());
        Ok(Self {
            client: build_client(&user_agent, settings.timeout)?,
            insecure: build_insecure_client(&user_agent, settings.timeout)?,
            pdf_dir: pdf_dir.into(),
            max_hops: settings.max_hops,
        })
    }

    /// GET with `Accept: application/pdf`, retried once without certificate
    /// verification on failure or a non-200 answer.
    async fn get(&self, url: &str) -> Result<Fetched, FetchError> {
        match self.get_with(&self.client, url).await {
            Ok(fetched) => Ok(fetched),
            Err(e) => {
                tracing::debug!("GET {} failed ({}), retrying without TLS verification", url, e);
                self.get_with(&self.insecure, url).await
            }
        }
    }

    async fn get_with(&self, client: &Client, url: &str) -> Result<Fetched, FetchError> {
        let resp = client
            .get(url)
            .header(ACCEPT, "application/pdf")
            .send()
            .await?;

        if resp.status() != StatusCode::OK {
            return Err(FetchError::Status(resp.status().as_u16()));
        }

        let final_url = resp.url().clone();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.bytes().await?.to_vec();
        let kind = classify(content_type.as_deref(), &body);

        Ok(Fetched {
            final_url,
            kind,
            body,
        })
    }

    /// Walk from `url` to a PDF, following landing-page candidates
    /// depth-first in strategy order.
    pub async fn resolve(&self, url: &str, identifier: &str) -> Result<Option<PathBuf>, FetchError> {
        let mut pending = vec![Hop {
            url: url.to_string(),
            depth: 0,
        }];
        let mut seen = HashSet::new();

        while let Some(hop) = pending.pop() {
            if !seen.insert(hop.url.clone()) {
                continue;
            }

            let fetched = match self.get(&hop.url).await {
                Ok(f) => f,
                Err(e) => {
                    tracing::debug!("Fetch of {} failed: {}", hop.url, e);
                    continue;
                }
            };

            match fetched.kind {
                BodyKind::Pdf => {
                    let path = self.pdf_path(identifier);
                    tokio::fs::create_dir_all(&self.pdf_dir).await?;
                    tokio::fs::write(&path, &fetched.body).await?;
                    tracing::debug!("Saved {} ({} bytes)", path.display(), fetched.body.len());
                    return Ok(Some(path));
                }
                BodyKind::Html if hop.depth < self.max_hops => {
                    let html = String::from_utf8_lossy(&fetched.body);
                    let candidates = pdf_candidates(&hop.url, &fetched.final_url, &html);
                    tracing::debug!("{} candidate PDF links on {}", candidates.len(), hop.url);
                    // Reverse so the first strategy is popped first
                    pending.extend(candidates.into_iter().rev().map(|url| Hop {
                        url,
                        depth: hop.depth + 1,
                    }));
                }
                BodyKind::Html => {
                    tracing::debug!("Hop limit reached at {}", hop.url);
                }
                BodyKind::Other => {
                    tracing::debug!("{} is neither PDF nor HTML", hop.url);
                }
            }
        }

        Ok(None)
    }
}

#[async_trait]
impl PdfFetcher for HttpPdfFetcher {
    async fn fetch(&self, url: &str, identifier: &str) -> Option<PathBuf> {
        match self.resolve(url, identifier).await {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("Could not store PDF from {}: {}", url, e);
                None
            }
        }
    }

    fn pdf_path(&self, identifier: &str) -> PathBuf {
        self.pdf_dir.join(format!("{}.pdf", identifier))
    }
}

/// PDF by content type, HTML by content type, and PDF by signature when the
/// content type is missing or generic.
fn classify(content_type: Option<&str>, body: &[u8]) -> BodyKind {
    if content_type_is(content_type, "application/pdf") {
        return BodyKind::Pdf;
    }
    if content_type_is(content_type, "text/html") {
        return BodyKind::Html;
    }
    let generic = content_type.is_none()
        || content_type_is(content_type, "application/octet-stream")
        || content_type_is(content_type, "binary/octet-stream");
    if generic && infer::get(body).is_some_and(|t| t.mime_type() == "application/pdf") {
        return BodyKind::Pdf;
    }
    BodyKind::Other
}
