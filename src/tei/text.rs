//! Plain text from TEI markup: abstract plus body paragraphs.

use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;

use super::TEI_NS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Abstract,
    Body,
    Paragraph,
    Other,
}

/// Extract the abstract and every non-empty body paragraph, newline separated.
///
/// Only elements in the TEI namespace count. Malformed markup yields an
/// empty string.
pub fn extract_tei_text(xml: &str) -> String {
    match collect(xml) {
        Some((abstract_text, paragraphs)) => {
            format!("{}\n{}", abstract_text.trim(), paragraphs.join("\n"))
                .trim()
                .to_string()
        }
        None => String::new(),
    }
}

fn collect(xml: &str) -> Option<(String, Vec<String>)> {
    let mut reader = NsReader::from_str(xml);

    let mut stack: Vec<Tag> = Vec::new();
    let mut abstract_text = String::new();
    let mut abstract_done = false;
    let mut paragraphs = Vec::new();
    let mut paragraph = String::new();

    loop {
        let (ns, event) = match reader.read_resolved_event() {
            Ok(pair) => pair,
            Err(e) => {
                tracing::debug!("Malformed TEI: {}", e);
                return None;
            }
        };

        match event {
            Event::Start(e) => {
                let tag = if is_tei(&ns) {
                    match e.local_name().as_ref() {
                        b"abstract" => Tag::Abstract,
                        b"body" => Tag::Body,
                        b"p" => Tag::Paragraph,
                        _ => Tag::Other,
                    }
                } else {
                    Tag::Other
                };
                stack.push(tag);
            }
            Event::End(_) => {
                let tag = stack.pop()?;
                let in_body = stack.contains(&Tag::Body);
                let in_abstract = stack.contains(&Tag::Abstract);
                match tag {
                    Tag::Paragraph if in_body && !stack.contains(&Tag::Paragraph) => {
                        let text = paragraph.trim();
                        if !text.is_empty() {
                            paragraphs.push(text.to_string());
                        }
                        paragraph.clear();
                    }
                    Tag::Paragraph if in_abstract && !abstract_done => abstract_text.push('\n'),
                    Tag::Abstract if !in_abstract => abstract_done = true,
                    _ => {}
                }
            }
            Event::Text(e) => {
                let text = e
                    .unescape()
                    .map(|t| t.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&e).into_owned());
                push_text(&stack, &text, abstract_done, &mut abstract_text, &mut paragraph);
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                push_text(&stack, &text, abstract_done, &mut abstract_text, &mut paragraph);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        tracing::debug!("Malformed TEI: {} unclosed elements", stack.len());
        return None;
    }

    Some((abstract_text, paragraphs))
}

fn push_text(
    stack: &[Tag],
    text: &str,
    abstract_done: bool,
    abstract_text: &mut String,
    paragraph: &mut String,
) {
    if stack.contains(&Tag::Body) && stack.contains(&Tag::Paragraph) {
        paragraph.push_str(text);
    } else if stack.contains(&Tag::Abstract) && !abstract_done {
        abstract_text.push_str(text);
    }
}

fn is_tei(ns: &ResolveResult) -> bool {
    matches!(ns, ResolveResult::Bound(Namespace(uri)) if *uri == TEI_NS)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <teiHeader>
    <profileDesc>
      <abstract><div><p>We examine coffee &amp; sleep.</p></div></abstract>
    </profileDesc>
  </teiHeader>
  <text>
    <body>
      <div><head>Intro</head><p>First <hi>body</hi> paragraph.</p></div>
      <div><p>   </p><p>Second paragraph.</p></div>
    </body>
  </text>
</TEI>"#;

    #[test]
    fn test_abstract_and_body() {
        assert_eq!(
            extract_tei_text(FULL),
            "We examine coffee & sleep.\nFirst body paragraph.\nSecond paragraph."
        );
    }

    #[test]
    fn test_missing_body_returns_abstract() {
        let xml = r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><teiHeader><profileDesc>
            <abstract><p>Only the abstract.</p></abstract></profileDesc></teiHeader></TEI>"#;
        assert_eq!(extract_tei_text(xml), "Only the abstract.");
    }

    #[test]
    fn test_missing_everything_is_empty() {
        let xml = r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><teiHeader/></TEI>"#;
        assert_eq!(extract_tei_text(xml), "");
    }

    #[test]
    fn test_prefixed_namespace() {
        let xml = r#"<tei:TEI xmlns:tei="http://www.tei-c.org/ns/1.0"><tei:text><tei:body>
            <tei:p>Prefixed paragraph.</tei:p></tei:body></tei:text></tei:TEI>"#;
        assert_eq!(extract_tei_text(xml), "Prefixed paragraph.");
    }

    #[test]
    fn test_other_namespace_is_ignored() {
        let xml = r#"<TEI><text><body><p>No namespace.</p></body></text></TEI>"#;
        assert_eq!(extract_tei_text(xml), "");
    }

    #[test]
    fn test_malformed_is_empty() {
        assert_eq!(extract_tei_text("<not-xml"), "");
        assert_eq!(
            extract_tei_text(
                r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><text><body><p>x</body></text></TEI>"#
            ),
            ""
        );
        assert_eq!(
            extract_tei_text(r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><text><body><p>open"#),
            ""
        );
        assert_eq!(extract_tei_text(""), "");
    }
}
