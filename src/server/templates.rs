//! HTML templates for the admin page.

use chrono::NaiveDate;

use crate::models::{Article, SourceTable};
use crate::repository::SourceCounts;

/// Escape text for HTML element content and attribute values.
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

pub fn base_template(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} - sciharvest</title>
    <style>
        body {{ font-family: system-ui, sans-serif; margin: 2rem auto; max-width: 60rem; color: #222; }}
        table {{ border-collapse: collapse; width: 100%; margin-bottom: 1rem; }}
        th, td {{ text-align: left; padding: .3rem .5rem; border-bottom: 1px solid #ddd; }}
        .actions form {{ display: inline-block; margin-right: .5rem; }}
        .score {{ font-variant-numeric: tabular-nums; }}
        .muted {{ color: #777; }}
    </style>
</head>
<body>
    <header><strong>sciharvest</strong></header>
    <main>
        <h1>{title}</h1>
        {content}
    </main>
</body>
</html>"#,
        title = html_escape(title),
        content = content
    )
}

/// Counts, latest flagged articles and actions for one source.
pub fn source_section(source: SourceTable, counts: &SourceCounts, flagged: &[Article]) -> String {
    let slug = source.slug();
    let mut rows = String::new();
    for article in flagged {
        rows.push_str(&format!(
            r#"<tr><td><a href="/api/{slug}/articles/{id}">{title}</a></td><td class="score">{score:.3}</td><td>{excerpt}</td></tr>"#,
            slug = slug,
            id = article.id,
            title = html_escape(&article.title),
            score = article.controversy_score.unwrap_or_default(),
            excerpt = html_escape(article.controversy_excerpt.as_deref().unwrap_or("")),
        ));
    }
    if rows.is_empty() {
        rows.push_str(r#"<tr><td colspan="3" class="muted">No controversial articles yet.</td></tr>"#);
    }

    format!(
        r#"<section>
    <h2>{slug}</h2>
    <p>{total} articles, {with_text} with text, {controversial} controversial</p>
    <div class="actions">
        <form method="post" action="/api/{slug}/harvest"><button>Harvest</button></form>
        <form method="post" action="/api/{slug}/reanalyze"><button>Reanalyze</button></form>
    </div>
    <table>
        <thead><tr><th>Title</th><th>Score</th><th>Excerpt</th></tr></thead>
        <tbody>{rows}</tbody>
    </table>
</section>"#,
        slug = slug,
        total = counts.total,
        with_text = counts.with_text,
        controversial = counts.controversial,
        rows = rows,
    )
}

pub fn admin_content(sections: &[String], watermark: Option<NaiveDate>, running: bool) -> String {
    let watermark = watermark
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "never".to_string());
    let status = if running { "running" } else { "idle" };

    format!(
        r#"<p>Last harvest: {watermark}. Pipeline: <a href="/api/pipeline/status">{status}</a></p>
<div class="actions">
    <form method="post" action="/api/pipeline"><button>Run full pipeline</button></form>
</div>
{sections}"#,
        watermark = watermark,
        status = status,
        sections = sections.join("\n"),
    )
}
