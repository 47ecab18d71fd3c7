//! Normalization of raw text extracted from scientific PDFs.
//!
//! [`clean_text`] is total and idempotent: it never fails and cleaning an
//! already-cleaned string returns it unchanged.

use std::sync::LazyLock;

use regex::Regex;

/// Lines at or under this many characters are treated as headers, footers
/// or page numbers and dropped.
const MIN_LINE_CHARS: usize = 10;

static BOILERPLATE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)Downloaded by.*?(?:\n|$)").unwrap(),
        Regex::new(r"(?i)Page \d+ of \d+").unwrap(),
        Regex::new(r"(?i)All rights reserved.*?(?:\n|$)").unwrap(),
    ]
});

static CITATION_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\d+[^\]]*\]").unwrap());

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[\w.-]+@[\w.-]+\.\w+\b").unwrap());

static COPYRIGHT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:©|Copyright|All rights reserved).*?\.").unwrap());

static MARKUP: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // inline math
        Regex::new(r"\$.*?\$").unwrap(),
        // display math
        Regex::new(r"\\\[.*?\\\]").unwrap(),
        // LaTeX environments
        Regex::new(r"(?s)\\begin\{.*?\}.*?\\end\{.*?\}").unwrap(),
        // HTML-style tags
        Regex::new(r"<[^>]+>").unwrap(),
    ]
});

static CAPTIONS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)Figure\s?\d+\s?:.*?(?:\.|\n)").unwrap(),
        Regex::new(r"(?i)Table\s?\d+\s?:.*?(?:\.|\n)").unwrap(),
    ]
});

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());

/// Clean raw extracted text.
///
/// Passes repeat until the text stops changing. A removal can expose a new
/// match (nested captions, split markup), and every changing pass after the
/// first only shortens the text.
pub fn clean_text(raw: &str) -> String {
    let mut current = clean_pass(raw);
    loop {
        let next = clean_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_pass(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let joined = raw
        .lines()
        .map(str::trim)
        .filter(|line| line.chars().count() > MIN_LINE_CHARS)
        .collect::<Vec<_>>()
        .join(" ");

    let mut text = joined;
    for re in BOILERPLATE.iter() {
        text = re.replace_all(&text, "").into_owned();
    }
    text = CITATION_MARKER.replace_all(&text, "").into_owned();

    text = text
        .chars()
        .filter_map(|c| match c {
            '\u{2019}' | '\u{2018}' => Some('\''),
            c if is_non_printable(c) => None,
            c if is_allowed(c) => Some(c),
            _ => Some(' '),
        })
        .collect();

    text = EMAIL.replace_all(&text, "").into_owned();
    text = COPYRIGHT.replace_all(&text, "").into_owned();
    for re in MARKUP.iter().chain(CAPTIONS.iter()) {
        text = re.replace_all(&text, "").into_owned();
    }

    WHITESPACE_RUN.replace_all(&text, " ").trim().to_string()
}

/// Control, format and private-use characters. Only the plain space is
/// kept; tabs and other whitespace controls are dropped.
fn is_non_printable(c: char) -> bool {
    if c == ' ' {
        return false;
    }
    c.is_control()
        || matches!(c,
            '\u{00AD}'
            | '\u{0600}'..='\u{0605}'
            | '\u{061C}'
            | '\u{06DD}'
            | '\u{070F}'
            | '\u{180E}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{2066}'..='\u{206F}'
            | '\u{FEFF}'
            | '\u{FFF9}'..='\u{FFFB}'
            | '\u{E000}'..='\u{F8FF}'
            | '\u{F0000}'..='\u{10FFFF}'
        )
}

/// ASCII letters and digits, Latin-1 letters, whitespace and basic punctuation.
fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || ('\u{00C0}'..='\u{00FF}').contains(&c)
        || c.is_whitespace()
        || matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | '(' | ')' | '"' | '\'' | '%' | '-')
}
