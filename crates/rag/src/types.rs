//! Core data model: documents, citations and verification results.

use serde::{Deserialize, Deserializer, Serialize};

/// Source label shown when a document carries no `source` metadata.
pub const UNKNOWN_SOURCE: &str = "Desconocido";

/// A retrieved document. Read-only once it leaves the vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document text (the chunk content stored alongside the vector)
    pub text: String,

    /// Source metadata
    pub metadata: DocumentMetadata,
}

/// Document metadata.
///
/// `source` and `page` are the fields the assistant reads; everything else
/// the index stored is carried through untouched in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Source identifier (file name of the DIAN concept, decree, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Page number within the source, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    /// Any other metadata stored with the vector
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Document {
    /// Create a document with a source and no page.
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: DocumentMetadata {
                source: Some(source.into()),
                ..Default::default()
            },
        }
    }

    /// Set the page number.
    pub fn with_page(mut self, page: u32) -> Self {
        self.metadata.page = Some(page);
        self
    }

    /// Source identifier, or [`UNKNOWN_SOURCE`].
    pub fn source(&self) -> &str {
        self.metadata.source.as_deref().unwrap_or(UNKNOWN_SOURCE)
    }

    /// Page number, treating page 0 as absent.
    pub fn page(&self) -> Option<u32> {
        self.metadata.page.filter(|p| *p != 0)
    }
}

/// A claim-to-source link attached to a generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Title of the cited document
    pub document_title: String,

    /// Passage quoted from it
    #[serde(default)]
    pub cited_text: String,
}

/// Output of the generator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOutput {
    /// Answer text
    pub text: String,

    /// Citations backing the answer
    #[serde(default)]
    pub citations: Vec<Citation>,
}

/// Result of the VERIFY stage. Drives the conditional edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyResult {
    /// Grounded in the documents and addresses the question
    Useful,
    /// Grounded, but does not address the question
    NotUseful,
    /// Not grounded in the documents
    NotSupported,
}

impl VerifyResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Useful => "useful",
            Self::NotUseful => "not_useful",
            Self::NotSupported => "not_supported",
        }
    }
}

impl std::fmt::Display for VerifyResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of a binary grader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeScore {
    /// `true` when the graded property holds
    #[serde(deserialize_with = "bool_or_yes_no")]
    pub binary_score: bool,
}

impl GradeScore {
    pub fn yes() -> Self {
        Self { binary_score: true }
    }

    pub fn no() -> Self {
        Self { binary_score: false }
    }
}

/// Models asked for a "yes"/"no" score answer with either a JSON boolean
/// or a string.
fn bool_or_yes_no<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Bool(b) => Ok(b),
        Raw::Text(s) => match s.trim().to_lowercase().as_str() {
            "yes" | "si" | "sí" | "true" => Ok(true),
            "no" | "false" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected yes/no, got '{}'",
                other
            ))),
        },
    }
}

/// Template-facing view of a document: 1-based position plus the fields
/// the prompts print.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentContext<'a> {
    pub index: usize,
    pub source: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    pub text: &'a str,
}

/// Build prompt views for a document list.
pub fn document_contexts(documents: &[Document]) -> Vec<DocumentContext<'_>> {
    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| DocumentContext {
            index: i + 1,
            source: doc.source(),
            page: doc.page(),
            text: &doc.text,
        })
        .collect()
}
