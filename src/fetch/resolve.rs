//! Candidate PDF links found on an HTML landing page.

use scraper::{Html, Selector};
use url::Url;

/// Candidate PDF URLs in the order they should be tried:
/// 1. the `citation_pdf_url` meta tag
/// 2. the first anchor whose href ends in `.pdf`, resolved against the page
/// 3. for DOI resolver links, the requested URL with `.pdf` appended
pub fn pdf_candidates(requested: &str, page_url: &Url, html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut candidates = Vec::new();

    if let Ok(selector) = Selector::parse(r#"meta[name="citation_pdf_url"]"#) {
        let meta = document
            .select(&selector)
            .filter_map(|el| el.value().attr("content"))
            .map(str::trim)
            .find(|content| !content.is_empty());
        if let Some(link) = meta.and_then(|c| page_url.join(c).ok()) {
            candidates.push(link.to_string());
        }
    }

    if let Ok(selector) = Selector::parse("a[href]") {
        let anchor = document
            .select(&selector)
            .filter_map(|el| el.value().attr("href"))
            .map(str::trim)
            .find(|href| href.to_lowercase().ends_with(".pdf"));
        if let Some(link) = anchor.and_then(|href| page_url.join(href).ok()) {
            candidates.push(link.to_string());
        }
    }

    if let Some(doi_pdf) = doi_pdf_url(requested) {
        candidates.push(doi_pdf);
    }

    candidates.dedup();
    candidates
}

fn doi_pdf_url(requested: &str) -> Option<String> {
    let url = Url::parse(requested).ok()?;
    let host = url.host_str()?;
    if !host.contains("doi.org") || url.path().to_lowercase().ends_with(".pdf") {
        return None;
    }
    Some(format!("{}.pdf", requested.trim_end_matches('/')))
}
