//! Sentence splitting.

/// Split text after `.`, `!` or `?` when followed by whitespace.
///
/// Sentences keep their terminal punctuation and are trimmed; empty
/// fragments are dropped.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let followed_by_space = chars.peek().is_some_and(|&(_, next)| next.is_whitespace());
        if !followed_by_space {
            continue;
        }

        let sentence = text[start..i + c.len_utf8()].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        while chars.peek().is_some_and(|&(_, w)| w.is_whitespace()) {
            chars.next();
        }
        start = chars.peek().map(|&(k, _)| k).unwrap_or(text.len());
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}
