//! Text reconstruction for matching and for the extraction collaborator.

use crate::model::{Document, Paragraph};

/// Concatenate every run's text in order.
pub fn flatten(paragraph: &Paragraph) -> String {
    paragraph.runs().iter().map(|r| r.text.as_str()).collect()
}

/// Whole-document text in traversal order with whitespace collapsed.
///
/// Paragraphs are joined with a line break before normalizing, so a
/// placeholder split across two paragraphs reads as contiguous text with a
/// single space in between.
pub fn flatten_document(document: &Document) -> String {
    let joined = document
        .regions()
        .iter()
        .flat_map(|region| region.paragraphs.iter().map(flatten))
        .collect::<Vec<_>>()
        .join("\n");
    normalize_whitespace(&joined)
}

/// Collapse every run of ASCII whitespace to one space and trim both ends.
///
/// Non-breaking and other Unicode spaces are kept: they are part of the
/// placeholder literals the extractor copies back.
pub fn normalize_whitespace(text: &str) -> String {
    text.split(is_collapsible)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_collapsible(c: char) -> bool {
    c.is_ascii_whitespace() || c == '\u{b}'
}
