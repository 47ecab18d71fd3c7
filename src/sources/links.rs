//! Repository-specific PDF link fixes.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use url::Url;

use crate::http_client::{build_client, content_type_is, USER_AGENT};

/// Hosts whose record pages serve the PDF under a `/file` suffix.
const FILE_SUFFIX_HOSTS: &[&str] = &["hal.science"];

/// Rewrites links of known repositories to their PDF URL, keeping the
/// rewrite only when a HEAD probe confirms it serves a PDF.
#[derive(Clone)]
pub struct LinkCorrector {
    client: Client,
}

impl LinkCorrector {
    pub fn new(probe_timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            client: build_client(USER_AGENT, probe_timeout)?,
        })
    }

    pub async fn correct(&self, link: &str) -> String {
        let Some(candidate) = file_suffix_candidate(link) else {
            return link.to_string();
        };

        match self.client.head(&candidate).send().await {
            Ok(resp) => {
                let content_type = resp
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok());
                if content_type_is(content_type, "application/pdf") {
                    return candidate;
                }
                tracing::warn!(
                    "Corrected link {} is not a PDF ({:?}), keeping {}",
                    candidate,
                    content_type,
                    link
                );
            }
            Err(e) => tracing::warn!("HEAD {} failed: {}", candidate, e),
        }
        link.to_string()
    }
}

/// `https://hal.science/hal-123` → `https://hal.science/hal-123/file`.
fn file_suffix_candidate(link: &str) -> Option<String> {
    let mut url = Url::parse(link).ok()?;
    let host = url.host_str()?.to_lowercase();
    if !FILE_SUFFIX_HOSTS.iter().any(|h| host.ends_with(h)) {
        return None;
    }
    let path = url.path().trim_end_matches('/').to_string();
    if path.ends_with("/file") {
        return None;
    }
    url.set_path(&format!("{}/file", path));
    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_suffix_candidate() {
        assert_eq!(
            file_suffix_candidate("https://hal.science/hal-04123456/").as_deref(),
            Some("https://hal.science/hal-04123456/file")
        );
        assert_eq!(
            file_suffix_candidate("https://theses.hal.science/tel-1?x=1").as_deref(),
            Some("https://theses.hal.science/tel-1/file?x=1")
        );
        assert!(file_suffix_candidate("https://hal.science/hal-1/file").is_none());
        assert!(file_suffix_candidate("https://arxiv.org/pdf/1.pdf").is_none());
        assert!(file_suffix_candidate("nonsense").is_none());
    }

    #[tokio::test]
    async fn test_non_matching_host_is_untouched() {
        let corrector = LinkCorrector::new(Duration::from_secs(1)).unwrap();
        assert_eq!(
            corrector.correct("http://example.org/x.pdf").await,
            "http://example.org/x.pdf"
        );
    }
}
