//! Binary graders: grounding, answer relevance and retrieval relevance.

use crate::chain::StructuredChain;
use crate::types::{document_contexts, Document, DocumentContext, GradeScore};
use serde::Serialize;
use tributario_core::{AppError, AppResult};

pub const HALLUCINATION_PROMPT: &str = "grader.hallucination";
pub const ANSWER_PROMPT: &str = "grader.answer";
pub const DOCUMENTS_PROMPT: &str = "grader.documents";

/// What a grader is asked to judge.
#[derive(Debug, Clone, Copy)]
pub enum GradeInput<'a> {
    /// Is the generation supported by the documents?
    Grounding {
        documents: &'a [Document],
        generation: &'a str,
    },
    /// Does the generation address the question?
    Relevance {
        question: &'a str,
        generation: &'a str,
    },
    /// Are the documents useful for the question?
    Retrieval {
        question: &'a str,
        documents: &'a [Document],
    },
}

impl GradeInput<'_> {
    fn kind(&self) -> &'static str {
        match self {
            Self::Grounding { .. } => "grounding",
            Self::Relevance { .. } => "relevance",
            Self::Retrieval { .. } => "retrieval",
        }
    }
}

#[async_trait::async_trait]
pub trait Grader: Send + Sync {
    async fn grade(&self, input: &GradeInput<'_>) -> AppResult<GradeScore>;
}

#[derive(Serialize)]
struct GradeContext<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    question: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation: Option<&'a str>,
    documents: Vec<DocumentContext<'a>>,
}

impl<'a> From<&GradeInput<'a>> for GradeContext<'a> {
    fn from(input: &GradeInput<'a>) -> Self {
        match *input {
            GradeInput::Grounding {
                documents,
                generation,
            } => Self {
                question: None,
                generation: Some(generation),
                documents: document_contexts(documents),
            },
            GradeInput::Relevance {
                question,
                generation,
            } => Self {
                question: Some(question),
                generation: Some(generation),
                documents: Vec::new(),
            },
            GradeInput::Retrieval {
                question,
                documents,
            } => Self {
                question: Some(question),
                generation: None,
                documents: document_contexts(documents),
            },
        }
    }
}

/// Grader driven by one of the `grader.*` prompts.
pub struct LlmGrader {
    chain: StructuredChain,
}

impl LlmGrader {
    pub fn new(chain: StructuredChain) -> Self {
        Self { chain }
    }
}

#[async_trait::async_trait]
impl Grader for LlmGrader {
    async fn grade(&self, input: &GradeInput<'_>) -> AppResult<GradeScore> {
        let context = GradeContext::from(input);

        let score: GradeScore = self.chain.invoke(&context).await.map_err(|e| {
            AppError::Grading(format!(
                "{} grader ({}) failed: {}",
                input.kind(),
                self.chain.prompt_id(),
                e
            ))
        })?;

        tracing::debug!(
            "{} grade: {}",
            input.kind(),
            if score.binary_score { "yes" } else { "no" }
        );

        Ok(score)
    }
}
