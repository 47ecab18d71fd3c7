//! Client for a GROBID structured-document service.

use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::config::GrobidSettings;
use crate::http_client::{build_client, USER_AGENT};

const FULLTEXT_PATH: &str = "api/processFulltextDocument";

#[derive(Debug, Error)]
pub enum GrobidError {
    #[error("GROBID request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("GROBID returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("GROBID response has no TEI root element")]
    MissingTei,
}

#[derive(Clone)]
pub struct GrobidClient {
    client: Client,
    base_url: String,
}

impl GrobidClient {
    pub fn new(settings: &GrobidSettings) -> Result<Self, GrobidError> {
        Ok(Self {
            client: build_client(USER_AGENT, settings.timeout)?,
            base_url: settings.url.trim_end_matches('/').to_string(),
        })
    }

    /// Full-text endpoint. A configured URL that already names it is used as is.
    pub fn endpoint(&self) -> String {
        if self.base_url.ends_with("processFulltextDocument") {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, FULLTEXT_PATH)
        }
    }

    /// Send a PDF and return the TEI markup.
    pub async fn process_pdf(&self, pdf: Vec<u8>, filename: &str) -> Result<String, GrobidError> {
        let part = Part::bytes(pdf)
            .file_name(filename.to_string())
            .mime_str("application/pdf")?;
        let form = Form::new().part("input", part);

        tracing::debug!("Sending {} to GROBID", filename);
        let resp = self.client.post(self.endpoint()).multipart(form).send().await?;

        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(GrobidError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let tei = resp.text().await?;
        if !tei.contains("<TEI") {
            return Err(GrobidError::MissingTei);
        }
        Ok(tei)
    }

    /// Whether the service answers its liveness probe.
    pub async fn is_alive(&self) -> bool {
        let url = format!("{}/api/isalive", self.base_url.trim_end_matches(FULLTEXT_PATH).trim_end_matches('/'));
        match self.client.get(url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn client_for(url: String) -> GrobidClient {
        GrobidClient::new(&GrobidSettings {
            url,
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(
            client_for("http://grobid:8070/".into()).endpoint(),
            "http://grobid:8070/api/processFulltextDocument"
        );
        assert_eq!(
            client_for("http://grobid:8070/api/processFulltextDocument".into()).endpoint(),
            "http://grobid:8070/api/processFulltextDocument"
        );
    }

    #[tokio::test]
    async fn test_process_pdf_returns_tei() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/processFulltextDocument")
            .match_header(
                "content-type",
                mockito::Matcher::Regex("multipart/form-data".into()),
            )
            .match_body(mockito::Matcher::Regex(r#"name="input""#.into()))
            .with_status(200)
            .with_header("content-type", "application/xml")
            .with_body(r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><teiHeader/></TEI>"#)
            .create_async()
            .await;

        let client = client_for(server.url());
        let tei = client.process_pdf(b"%PDF-1.4".to_vec(), "paper.pdf").await.unwrap();
        assert!(tei.starts_with("<TEI"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_200_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/processFulltextDocument")
            .with_status(500)
            .with_body("[BAD_INPUT_DATA]")
            .create_async()
            .await;

        let err = client_for(server.url())
            .process_pdf(b"junk".to_vec(), "x.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, GrobidError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_missing_tei_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/processFulltextDocument")
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let err = client_for(server.url())
            .process_pdf(b"%PDF".to_vec(), "x.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, GrobidError::MissingTei));
    }

    #[tokio::test]
    async fn test_is_alive() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/isalive")
            .with_status(200)
            .with_body("true")
            .create_async()
            .await;

        assert!(client_for(server.url()).is_alive().await);
    }
}
