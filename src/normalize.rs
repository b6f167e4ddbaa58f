//! Text normalization and page joining.
//!
//! Within a unit, control characters become spaces, blank lines delimit
//! paragraphs, and every whitespace run inside a paragraph collapses to a
//! single space. Paragraphs and pages are both separated by one blank line
//! (`"\n\n"`). Normalizing already-normalized text returns it unchanged.

/// Paragraph and page boundary marker.
pub const BOUNDARY: &str = "\n\n";

/// Normalizes the text of one unit.
pub fn normalize_text(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c == '\n' {
                '\n'
            } else if c.is_control() || c.is_whitespace() {
                ' '
            } else {
                c
            }
        })
        .collect();

    let mut paragraphs: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in cleaned.split('\n') {
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            flush_paragraph(&mut current, &mut paragraphs);
        } else {
            current.extend(words);
        }
    }
    flush_paragraph(&mut current, &mut paragraphs);

    paragraphs.join(BOUNDARY)
}

fn flush_paragraph(words: &mut Vec<&str>, paragraphs: &mut Vec<String>) {
    if !words.is_empty() {
        paragraphs.push(words.join(" "));
        words.clear();
    }
}

/// Joins normalized unit texts in order. Empty units contribute nothing.
pub fn join_units<S: AsRef<str>>(normalized: &[S]) -> String {
    normalized
        .iter()
        .map(|s| s.as_ref())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(BOUNDARY)
}
