//! Answer generation over retrieved documents.

use crate::chain::StructuredChain;
use crate::types::{document_contexts, Document, DocumentContext, GenerationOutput};
use serde::Serialize;
use tributario_core::{AppError, AppResult};

/// Answer returned when retrieval produced nothing to ground on.
pub const NO_INFORMATION_ANSWER: &str = "Lo siento, no encontré información relevante sobre tu consulta en la base de conocimiento. Por favor, intenta reformular tu pregunta o consulta otra base de conocimiento.";

/// Section markers of a well-formed answer.
pub const REFERENCE_MARKER: &str = "REFERENCIA";
pub const ANALYSIS_MARKER: &str = "ANÁLISIS";

/// Produces an answer (with citations) from a question and documents.
#[async_trait::async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, question: &str, documents: &[Document]) -> AppResult<GenerationOutput>;
}

/// Whether the answer carries both section markers (case-sensitive).
pub fn has_structure(text: &str) -> bool {
    text.contains(REFERENCE_MARKER) && text.contains(ANALYSIS_MARKER)
}

#[derive(Serialize)]
struct GenerationContext<'a> {
    question: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    topic: Option<&'a str>,
    documents: Vec<DocumentContext<'a>>,
}

/// Generator backed by the `generation.answer` prompt.
pub struct LlmGenerator {
    chain: StructuredChain,
    topic: Option<String>,
}

impl LlmGenerator {
    pub fn new(chain: StructuredChain) -> Self {
        Self { chain, topic: None }
    }

    /// Topic display name woven into the system prompt.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }
}

#[async_trait::async_trait]
impl Generator for LlmGenerator {
    async fn generate(&self, question: &str, documents: &[Document]) -> AppResult<GenerationOutput> {
        if documents.is_empty() {
            tracing::info!("No documents retrieved, returning no-information answer");
            return Ok(GenerationOutput {
                text: NO_INFORMATION_ANSWER.to_string(),
                citations: Vec::new(),
            });
        }

        let context = GenerationContext {
            question,
            topic: self.topic.as_deref(),
            documents: document_contexts(documents),
        };

        let output: GenerationOutput = self
            .chain
            .invoke(&context)
            .await
            .map_err(|e| AppError::Generation(e.to_string()))?;

        tracing::debug!(
            "Generated {} chars with {} citations",
            output.text.len(),
            output.citations.len()
        );

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_structure() {
        assert!(has_structure("REFERENCIA: Art. 383 E.T.\nANÁLISIS: aplica..."));
        assert!(!has_structure("REFERENCIA: Art. 383 E.T."));
        assert!(!has_structure("referencia: ... análisis: ..."));
        assert!(!has_structure(""));
    }

    #[test]
    fn test_generation_context_shape() {
        let docs = vec![Document::new("Tarifa del 8%", "Concepto 1.pdf").with_page(2)];
        let context = GenerationContext {
            question: "¿Cuál es la tarifa?",
            topic: None,
            documents: document_contexts(&docs),
        };
        let value = serde_json::to_value(&context).unwrap();

        assert!(value.get("topic").is_none());
        assert_eq!(value["documents"][0]["index"], 1);
        assert_eq!(value["documents"][0]["page"], 2);
    }
}
