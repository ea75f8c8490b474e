//! Typed workflow state.
//!
//! Each stage populates its own fields. Downstream stages read them through
//! accessors that fail with `AppError::Workflow` when an earlier stage has
//! not run, instead of silently seeing an empty value.

use crate::topic::Topic;
use crate::types::{Citation, Document, GenerationOutput, VerifyResult};
use tributario_core::{AppError, AppResult};

/// Record threaded through RETRIEVE → GENERATE → VERIFY for one question.
#[derive(Debug, Clone)]
pub struct WorkflowState {
    question: String,
    topic: Option<Topic>,
    documents: Option<Vec<Document>>,
    generation: Option<String>,
    citations: Vec<Citation>,
    verify_result: Option<VerifyResult>,

    /// Number of GENERATE calls so far
    pub generations: u32,

    /// Set when GENERATE recorded an error text instead of an answer
    pub degraded: bool,

    /// Whether the last generation carried both section markers
    pub has_structure: bool,

    /// Retrieval grade, when document grading ran
    pub documents_relevant: Option<bool>,
}

impl WorkflowState {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            topic: None,
            documents: None,
            generation: None,
            citations: Vec::new(),
            verify_result: None,
            generations: 0,
            degraded: false,
            has_structure: false,
            documents_relevant: None,
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn topic(&self) -> Option<Topic> {
        self.topic
    }

    /// RETRIEVE output.
    pub fn set_documents(&mut self, topic: Topic, documents: Vec<Document>) {
        self.topic = Some(topic);
        self.documents = Some(documents);
    }

    pub fn documents(&self) -> AppResult<&[Document]> {
        self.documents
            .as_deref()
            .ok_or_else(|| missing("documents", "RETRIEVE"))
    }

    /// GENERATE output. Clears any previous verify result.
    pub fn set_generation(&mut self, output: GenerationOutput) {
        self.generation = Some(output.text);
        self.citations = output.citations;
        self.verify_result = None;
        self.generations += 1;
    }

    /// GENERATE failure: the error text stands in for the answer.
    pub fn set_generation_error(&mut self, error: &AppError) {
        self.set_generation(GenerationOutput {
            text: format!("Error al generar respuesta: {}", error),
            citations: Vec::new(),
        });
        self.degraded = true;
        self.has_structure = false;
    }

    pub fn generation(&self) -> AppResult<&str> {
        self.generation
            .as_deref()
            .ok_or_else(|| missing("generation", "GENERATE"))
    }

    pub fn citations(&self) -> &[Citation] {
        &self.citations
    }

    /// VERIFY output. Requires a generation to exist.
    pub fn set_verify_result(&mut self, result: VerifyResult) -> AppResult<()> {
        self.generation()?;
        self.verify_result = Some(result);
        Ok(())
    }

    pub fn verify_result(&self) -> Option<VerifyResult> {
        self.verify_result
    }

    /// Split into owned parts for the final outcome.
    pub(crate) fn into_parts(self) -> StateParts {
        StateParts {
            question: self.question,
            documents: self.documents.unwrap_or_default(),
            generation: self.generation.unwrap_or_default(),
            citations: self.citations,
            verify_result: self.verify_result,
        }
    }
}

pub(crate) struct StateParts {
    pub question: String,
    pub documents: Vec<Document>,
    pub generation: String,
    pub citations: Vec<Citation>,
    pub verify_result: Option<VerifyResult>,
}

fn missing(field: &str, stage: &str) -> AppError {
    AppError::Workflow(format!(
        "'{}' read before {} populated it",
        field, stage
    ))
}
