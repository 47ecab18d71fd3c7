//! Header and bibliography fields from a GROBID TEI document.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use crate::models::{Citation, TeiMetadata};

#[derive(Debug, Error)]
pub enum TeiError {
    #[error("malformed TEI: {0}")]
    Malformed(String),
    #[error("document has no TEI root element")]
    MissingRoot,
}

/// What the text currently being read belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Title,
    Abstract,
    AuthorPart,
    Date,
    CitationTitle,
    CitationSurname,
    CitationDate,
}

struct Capture {
    depth: usize,
    target: Target,
    buf: String,
}

#[derive(Default)]
struct CitationBuilder {
    title: Option<String>,
    author: Option<String>,
    date: Option<String>,
}

/// Parse title, authors, date and citations.
///
/// Authors come from the `sourceDesc` header, citations from `listBibl`
/// entries; entries without a title are skipped.
pub fn parse_tei_metadata(xml: &str) -> Result<TeiMetadata, TeiError> {
    let mut reader = Reader::from_str(xml);

    let mut stack: Vec<String> = Vec::new();
    let mut meta = TeiMetadata::default();
    let mut seen_root = false;
    let mut capture: Option<Capture> = None;
    let mut author: Option<Vec<String>> = None;
    let mut citation: Option<CitationBuilder> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| TeiError::Malformed(e.to_string()))?;

        match event {
            Event::Start(e) => {
                let name = local_name(&e);
                if name == "TEI" {
                    seen_root = true;
                }
                let parent = stack.last().map(String::as_str);
                let in_bibl = contains(&stack, "listBibl");
                let in_source = contains(&stack, "sourceDesc") && !in_bibl;

                if capture.is_none() {
                    let target = match name.as_str() {
                        "title" if contains(&stack, "titleStmt") && meta.title.is_none() => {
                            Some(Target::Title)
                        }
                        "abstract" if meta.abstract_text.is_none() => Some(Target::Abstract),
                        "date" if in_source && meta.date.is_none() => {
                            meta.date = when_attr(&e);
                            meta.date.is_none().then_some(Target::Date)
                        }
                        _ if parent == Some("persName") && author.is_some() => {
                            Some(Target::AuthorPart)
                        }
                        "title" if citation.as_ref().is_some_and(|c| c.title.is_none()) => {
                            Some(Target::CitationTitle)
                        }
                        "surname" if citation.as_ref().is_some_and(|c| c.author.is_none()) => {
                            Some(Target::CitationSurname)
                        }
                        "date" if citation.as_ref().is_some_and(|c| c.date.is_none()) => {
                            let when = when_attr(&e);
                            match (when, citation.as_mut()) {
                                (Some(w), Some(c)) => {
                                    c.date = Some(w);
                                    None
                                }
                                _ => Some(Target::CitationDate),
                            }
                        }
                        _ => None,
                    };
                    if let Some(target) = target {
                        capture = Some(Capture {
                            depth: stack.len(),
                            target,
                            buf: String::new(),
                        });
                    }
                }

                match name.as_str() {
                    "author" if in_source => author = Some(Vec::new()),
                    "biblStruct" if in_bibl => citation = Some(CitationBuilder::default()),
                    _ => {}
                }
                stack.push(name);
            }
            Event::Empty(e) => {
                let name = local_name(&e);
                if name == "TEI" {
                    seen_root = true;
                }
                if name == "date" {
                    let in_bibl = contains(&stack, "listBibl");
                    if !in_bibl && contains(&stack, "sourceDesc") && meta.date.is_none() {
                        meta.date = when_attr(&e);
                    } else if let Some(c) = citation.as_mut().filter(|c| c.date.is_none()) {
                        c.date = when_attr(&e);
                    }
                }
            }
            Event::End(_) => {
                let name = stack
                    .pop()
                    .ok_or_else(|| TeiError::Malformed("unbalanced end tag".into()))?;

                if let Some(c) = capture.as_mut().filter(|c| c.target == Target::Abstract) {
                    if name == "p" || name == "div" {
                        c.buf.push(' ');
                    }
                }
                if capture.as_ref().is_some_and(|c| c.depth == stack.len()) {
                    if let Some(done) = capture.take() {
                        finish_capture(done, &mut meta, &mut author, &mut citation);
                    }
                }

                match name.as_str() {
                    "author" => {
                        if let Some(parts) = author.take() {
                            if !parts.is_empty() {
                                meta.authors.push(parts.join(" "));
                            }
                        }
                    }
                    "biblStruct" => {
                        if let Some(c) = citation.take() {
                            if let Some(title) = c.title.filter(|t| !t.is_empty()) {
                                meta.citations.push(Citation {
                                    title,
                                    author: c.author,
                                    date: c.date,
                                });
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(e) => {
                if let Some(c) = capture.as_mut() {
                    let text = e
                        .unescape()
                        .map(|t| t.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&e).into_owned());
                    c.buf.push_str(&text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(TeiError::MissingRoot);
    }

    Ok(meta)
}

fn finish_capture(
    capture: Capture,
    meta: &mut TeiMetadata,
    author: &mut Option<Vec<String>>,
    citation: &mut Option<CitationBuilder>,
) {
    let value = normalize(&capture.buf);
    if value.is_empty() {
        return;
    }
    match capture.target {
        Target::Title => meta.title = Some(value),
        Target::Abstract => meta.abstract_text = Some(value),
        Target::Date => meta.date = Some(value),
        Target::AuthorPart => {
            if let Some(parts) = author.as_mut() {
                parts.push(value);
            }
        }
        Target::CitationTitle => {
            if let Some(c) = citation.as_mut() {
                c.title = Some(value);
            }
        }
        Target::CitationSurname => {
            if let Some(c) = citation.as_mut() {
                c.author = Some(value);
            }
        }
        Target::CitationDate => {
            if let Some(c) = citation.as_mut() {
                c.date = Some(value);
            }
        }
    }
}

fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn when_attr(e: &BytesStart) -> Option<String> {
    e.try_get_attribute("when")
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
        .filter(|v| !v.trim().is_empty())
}

fn contains(stack: &[String], name: &str) -> bool {
    stack.iter().any(|s| s == name)
}

fn normalize(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
