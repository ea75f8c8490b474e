//! Formatting of answers, references and sources for display.

use crate::types::{Citation, Document};
use regex::Regex;
use std::sync::OnceLock;

fn marker_regex() -> Option<&'static Regex> {
    static MARKER: OnceLock<Option<Regex>> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"\[(\d+)\]").ok()).as_ref()
}

/// Turn `[n]` markers into superscripts when the answer has citations.
pub fn format_with_citations(text: &str, citations: &[Citation]) -> String {
    match marker_regex() {
        Some(marker) if !citations.is_empty() => {
            marker.replace_all(text, "<sup>[$1]</sup>").into_owned()
        }
        _ => text.to_string(),
    }
}

/// `Fuente i: source (Pág. p)`; page omitted when absent or 0.
pub fn format_source_line(position: usize, document: &Document) -> String {
    match document.page() {
        Some(page) => format!("Fuente {}: {} (Pág. {})", position, document.source(), page),
        None => format!("Fuente {}: {}", position, document.source()),
    }
}

/// `[i] title: "cited text"`
pub fn format_reference_line(position: usize, citation: &Citation) -> String {
    if citation.cited_text.trim().is_empty() {
        format!("[{}] {}", position, citation.document_title)
    } else {
        format!(
            "[{}] {}: \"{}\"",
            position,
            citation.document_title,
            citation.cited_text.trim()
        )
    }
}
