//! OAI-PMH `ListRecords` harvesting (ArXiv by default).

use async_trait::async_trait;
use chrono::NaiveDate;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use reqwest::{Client, StatusCode};

use super::{RecordPage, RecordSource, RetryPolicy, SourceError};
use crate::config::{FetchSettings, HarvestSettings};
use crate::http_client::{build_client, USER_AGENT};
use crate::models::{CandidateRecord, SourceTable};

const UNKNOWN_TITLE: &str = "Inconnu";
const UNKNOWN_AUTHOR: &str = "Auteur inconnu";
const ARXIV_PDF_BASE: &str = "https://arxiv.org/pdf/";

/// Error code meaning the listing is simply empty.
const NO_RECORDS_MATCH: &str = "noRecordsMatch";

/// PDF link for an OAI identifier such as `oai:arXiv.org:2401.01234`.
pub fn arxiv_pdf_link(identifier: &str) -> String {
    let id = identifier.rsplit(':').next().unwrap_or(identifier).trim();
    format!("{}{}.pdf", ARXIV_PDF_BASE, id)
}

#[derive(Debug, Default)]
struct RecordBuilder {
    identifier: Option<String>,
    deleted: bool,
    titles: Vec<String>,
    creators: Vec<String>,
    dates: Vec<String>,
}

impl RecordBuilder {
    fn build(self) -> Option<CandidateRecord> {
        if self.deleted {
            return None;
        }
        let identifier = self.identifier?;
        let authors = if self.creators.is_empty() {
            UNKNOWN_AUTHOR.to_string()
        } else {
            self.creators.join(", ")
        };
        Some(CandidateRecord {
            title: self
                .titles
                .into_iter()
                .next()
                .unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            authors,
            publication_date: self.dates.into_iter().next(),
            abstract_text: String::new(),
            pdf_link: arxiv_pdf_link(&identifier),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Identifier,
    Title,
    Creator,
    Date,
    Token,
    Error,
}

/// Parse a `ListRecords` response into records and the resumption token.
pub fn parse_list_records(xml: &str) -> Result<RecordPage, SourceError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<String> = Vec::new();
    let mut page = RecordPage::default();
    let mut record: Option<RecordBuilder> = None;
    let mut field: Option<(Field, String)> = None;
    let mut error_code: Option<String> = None;
    let mut error_message = String::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        match event {
            Event::Start(e) => {
                let name = local_name(&e);
                let in_header = stack.last().is_some_and(|p| p == "header");
                let in_dc = stack.iter().any(|n| n == "metadata");
                match name.as_str() {
                    "record" => record = Some(RecordBuilder::default()),
                    "header" => {
                        if let Some(r) = record.as_mut() {
                            r.deleted = attr(&e, "status").as_deref() == Some("deleted");
                        }
                    }
                    "identifier" if in_header => {
                        field = Some((Field::Identifier, String::new()))
                    }
                    "title" if in_dc => field = Some((Field::Title, String::new())),
                    "creator" if in_dc => field = Some((Field::Creator, String::new())),
                    "date" if in_dc => field = Some((Field::Date, String::new())),
                    "resumptionToken" => field = Some((Field::Token, String::new())),
                    "error" => {
                        error_code = Some(attr(&e, "code").unwrap_or_default());
                        field = Some((Field::Error, String::new()));
                    }
                    _ => {}
                }
                stack.push(name);
            }
            Event::Empty(e) => {
                let name = local_name(&e);
                if name == "header" {
                    if let Some(r) = record.as_mut() {
                        r.deleted = attr(&e, "status").as_deref() == Some("deleted");
                    }
                }
                if name == "error" {
                    error_code = Some(attr(&e, "code").unwrap_or_default());
                }
            }
            Event::Text(e) => {
                if let Some((_, buf)) = field.as_mut() {
                    let text = e
                        .unescape()
                        .map(|t| t.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&e).into_owned());
                    buf.push_str(&text);
                }
            }
            Event::CData(e) => {
                if let Some((_, buf)) = field.as_mut() {
                    buf.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::End(_) => {
                let name = stack.pop().unwrap_or_default();
                if let Some((kind, buf)) = field.take() {
                    let value = buf.split_whitespace().collect::<Vec<_>>().join(" ");
                    store(kind, value, record.as_mut(), &mut page, &mut error_message);
                }
                if name == "record" {
                    if let Some(built) = record.take().and_then(RecordBuilder::build) {
                        page.records.push(built);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(code) = error_code {
        if code == NO_RECORDS_MATCH {
            return Ok(RecordPage::default());
        }
        return Err(SourceError::Protocol {
            code,
            message: error_message,
        });
    }

    Ok(page)
}

fn store(
    kind: Field,
    value: String,
    record: Option<&mut RecordBuilder>,
    page: &mut RecordPage,
    error_message: &mut String,
) {
    match kind {
        Field::Token => page.next = Some(value).filter(|v| !v.is_empty()),
        Field::Error => *error_message = value,
        _ if value.is_empty() => {}
        Field::Identifier => {
            if let Some(r) = record {
                r.identifier = Some(value);
            }
        }
        Field::Title => {
            if let Some(r) = record {
                r.titles.push(value);
            }
        }
        Field::Creator => {
            if let Some(r) = record {
                r.creators.push(value);
            }
        }
        Field::Date => {
            if let Some(r) = record {
                r.dates.push(value);
            }
        }
    }
}

fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attr(e: &BytesStart, name: &str) -> Option<String> {
    e.try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

pub struct OaiPmhSource {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl OaiPmhSource {
    pub fn new(harvest: &HarvestSettings, fetch: &FetchSettings) -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client(USER_AGENT, fetch.timeout)?,
            base_url: harvest.oai_url.clone(),
            retry: RetryPolicy {
                attempts: harvest.oai_retries.max(1),
                delay: harvest.oai_retry_delay,
            },
        })
    }
}

#[async_trait]
impl RecordSource for OaiPmhSource {
    fn table(&self) -> SourceTable {
        SourceTable::Oai
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    async fn list(
        &self,
        since: NaiveDate,
        cursor: Option<&str>,
    ) -> Result<RecordPage, SourceError> {
        let query: Vec<(&str, String)> = match cursor {
            Some(token) => vec![
                ("verb", "ListRecords".to_string()),
                ("resumptionToken", token.to_string()),
            ],
            None => vec![
                ("verb", "ListRecords".to_string()),
                ("metadataPrefix", "oai_dc".to_string()),
                ("from", since.format("%Y-%m-%d").to_string()),
            ],
        };

        tracing::debug!("OAI-PMH ListRecords from {} (token: {:?})", since, cursor);
        let resp = self.client.get(&self.base_url).query(&query).send().await?;
        if resp.status() != StatusCode::OK {
            return Err(SourceError::Status(resp.status().as_u16()));
        }
        let body = resp.text().await?;
        parse_list_records(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::time::Duration;

    const PAGE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/">
  <responseDate>2024-05-03T10:00:00Z</responseDate>
  <ListRecords>
    <record>
      <header>
        <identifier>oai:arXiv.org:2405.00001</identifier>
        <datestamp>2024-05-02</datestamp>
      </header>
      <metadata>
        <oai_dc:dc xmlns:oai_dc="http://www.openarchives.org/OAI/2.0/oai_dc/" xmlns:dc="http://purl.org/dc/elements/1.1/">
          <dc:title>Quantum
            coffee &amp; sleep</dc:title>
          <dc:creator>Curie, Marie</dc:creator>
          <dc:creator>Bohr, Niels</dc:creator>
          <dc:date>2024-05-01</dc:date>
          <dc:date>2024-05-02</dc:date>
        </oai_dc:dc>
      </metadata>
    </record>
    <record>
      <header status="deleted">
        <identifier>oai:arXiv.org:2405.00002</identifier>
      </header>
    </record>
    <record>
      <header>
        <identifier>oai:arXiv.org:2405.00003</identifier>
      </header>
      <metadata>
        <oai_dc:dc xmlns:oai_dc="http://www.openarchives.org/OAI/2.0/oai_dc/" xmlns:dc="http://purl.org/dc/elements/1.1/">
        </oai_dc:dc>
      </metadata>
    </record>
    <resumptionToken cursor="0" completeListSize="40">token-1</resumptionToken>
  </ListRecords>
</OAI-PMH>"#;

    #[test]
    fn test_parse_records_and_token() {
        let page = parse_list_records(PAGE).unwrap();
        assert_eq!(page.next.as_deref(), Some("token-1"));
        assert_eq!(page.records.len(), 2);

        let first = &page.records[0];
        assert_eq!(first.title, "Quantum coffee & sleep");
        assert_eq!(first.authors, "Curie, Marie, Bohr, Niels");
        assert_eq!(first.publication_date.as_deref(), Some("2024-05-01"));
        assert_eq!(first.pdf_link, "https://arxiv.org/pdf/2405.00001.pdf");

        let bare = &page.records[1];
        assert_eq!(bare.title, "Inconnu");
        assert_eq!(bare.authors, "Auteur inconnu");
        assert!(bare.publication_date.is_none());
    }

    #[test]
    fn test_empty_token_ends_listing() {
        let xml = r#"<OAI-PMH><ListRecords><resumptionToken completeListSize="1"/></ListRecords></OAI-PMH>"#;
        let page = parse_list_records(xml).unwrap();
        assert!(page.next.is_none());
        assert!(page.records.is_empty());
    }

    #[test]
    fn test_no_records_match_is_empty() {
        let xml = r#"<OAI-PMH><error code="noRecordsMatch">No records</error></OAI-PMH>"#;
        let page = parse_list_records(xml).unwrap();
        assert!(page.records.is_empty());
        assert!(page.next.is_none());
    }

    #[test]
    fn test_other_protocol_errors() {
        let xml = r#"<OAI-PMH><error code="badArgument">Illegal from</error></OAI-PMH>"#;
        match parse_list_records(xml) {
            Err(SourceError::Protocol { code, message }) => {
                assert_eq!(code, "badArgument");
                assert_eq!(message, "Illegal from");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_is_parse_error() {
        let err = parse_list_records("<OAI-PMH><ListRecords></OAI-PMH>").unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_arxiv_pdf_link() {
        assert_eq!(
            arxiv_pdf_link("oai:arXiv.org:math/0601001"),
            "https://arxiv.org/pdf/math/0601001.pdf"
        );
        assert_eq!(arxiv_pdf_link("2401.1"), "https://arxiv.org/pdf/2401.1.pdf");
    }

    #[tokio::test]
    async fn test_list_uses_from_then_token() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/oai2")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("verb".into(), "ListRecords".into()),
                Matcher::UrlEncoded("metadataPrefix".into(), "oai_dc".into()),
                Matcher::UrlEncoded("from".into(), "2024-05-01".into()),
            ]))
            .with_status(200)
            .with_body(PAGE)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/oai2")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("verb".into(), "ListRecords".into()),
                Matcher::UrlEncoded("resumptionToken".into(), "token-1".into()),
            ]))
            .with_status(200)
            .with_body(r#"<OAI-PMH><ListRecords><resumptionToken/></ListRecords></OAI-PMH>"#)
            .create_async()
            .await;

        let harvest = HarvestSettings {
            oai_url: format!("{}/oai2", server.url()),
            oai_retries: 3,
            oai_retry_delay: Duration::from_millis(5),
            ..Default::default()
        };
        let source = OaiPmhSource::new(&harvest, &FetchSettings::default()).unwrap();
        assert_eq!(source.retry_policy().attempts, 3);

        let since = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let page = source.list(since, None).await.unwrap();
        assert_eq!(page.records.len(), 2);
        let page = source.list(since, page.next.as_deref()).await.unwrap();
        assert!(page.records.is_empty());
        assert!(page.next.is_none());

        first.assert_async().await;
        second.assert_async().await;
    }
}
