//! Scripted stand-ins for the external services.
//!
//! Graders here are deterministic by construction; real model graders are
//! not, so idempotence only holds against these mocks.

use crate::generation::Generator;
use crate::grader::{GradeInput, Grader};
use crate::rerank::Reranker;
use crate::retrieval::VectorQueryService;
use crate::topic::{Topic, TopicProfile};
use crate::types::{Citation, Document, GenerationOutput, GradeScore};
use crate::workflow::TopicWorkflow;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tributario_core::{AppError, AppResult};
use tributario_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};

pub const QUESTION: &str = "¿tarifas de retención en la fuente para servicios?";

pub fn tax_documents() -> Vec<Document> {
    vec![
        Document::new(
            "La tarifa general de retención por servicios es del 4%.",
            "Decreto 1625 de 2016.pdf",
        )
        .with_page(12),
        Document::new(
            "Para servicios prestados por personas naturales no declarantes la tarifa es del 6%.",
            "Concepto DIAN 100208192-202.pdf",
        )
        .with_page(3),
        Document::new(
            "La base mínima para servicios es de 4 UVT.",
            "Tabla retención 2024.pdf",
        ),
    ]
}

pub fn structured_answer() -> GenerationOutput {
    GenerationOutput {
        text: "REFERENCIA: Decreto 1625 de 2016 [1].\nANÁLISIS: La tarifa general es del 4% [1]."
            .to_string(),
        citations: vec![Citation {
            document_title: "Decreto 1625 de 2016.pdf".to_string(),
            cited_text: "La tarifa general de retención por servicios es del 4%.".to_string(),
        }],
    }
}

pub struct StaticRetriever {
    pub index: String,
    pub documents: Vec<Document>,
    pub calls: AtomicUsize,
}

impl StaticRetriever {
    pub fn new(documents: Vec<Document>) -> Arc<Self> {
        Arc::new(Self {
            index: "retencion".to_string(),
            documents,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait::async_trait]
impl VectorQueryService for StaticRetriever {
    fn index_name(&self) -> &str {
        &self.index
    }

    async fn query(&self, _text: &str) -> AppResult<Vec<Document>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.documents.clone())
    }
}

/// Generator that counts calls and records how many documents it saw.
pub struct CountingGenerator {
    output: Option<GenerationOutput>,
    pub calls: AtomicUsize,
    pub seen_documents: Mutex<Vec<usize>>,
}

impl CountingGenerator {
    pub fn answering(output: GenerationOutput) -> Arc<Self> {
        Arc::new(Self {
            output: Some(output),
            calls: AtomicUsize::new(0),
            seen_documents: Mutex::new(Vec::new()),
        })
    }

    /// A generator whose every call fails.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            output: None,
            calls: AtomicUsize::new(0),
            seen_documents: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Generator for CountingGenerator {
    async fn generate(&self, _question: &str, documents: &[Document]) -> AppResult<GenerationOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_documents.lock().unwrap().push(documents.len());

        // Empty retrieval still yields a (citation-free) answer.
        if documents.is_empty() {
            return Ok(GenerationOutput {
                text: "Sin documentos".to_string(),
                citations: Vec::new(),
            });
        }

        self.output
            .clone()
            .ok_or_else(|| AppError::Generation("model timed out".to_string()))
    }
}

pub struct FixedGrader {
    score: Option<bool>,
    pub calls: AtomicUsize,
}

impl FixedGrader {
    pub fn new(score: bool) -> Arc<Self> {
        Arc::new(Self {
            score: Some(score),
            calls: AtomicUsize::new(0),
        })
    }

    /// A grader whose model call fails.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            score: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Grader for FixedGrader {
    async fn grade(&self, _input: &GradeInput<'_>) -> AppResult<GradeScore> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.score
            .map(|binary_score| GradeScore { binary_score })
            .ok_or_else(|| AppError::Grading("grader unavailable".to_string()))
    }
}

/// Scores documents in reverse input order (last document most relevant).
pub struct ReverseReranker;

#[async_trait::async_trait]
impl Reranker for ReverseReranker {
    async fn score(&self, _query: &str, documents: &[Document]) -> AppResult<Vec<f32>> {
        Ok((0..documents.len()).map(|i| i as f32).collect())
    }
}

/// LLM client replying from a script, one reply per call.
pub struct ScriptedClient {
    replies: Mutex<VecDeque<String>>,
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedClient {
    pub fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedClient {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let content = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AppError::Llm("script exhausted".to_string()))?;

        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            usage: LlmUsage::default(),
        })
    }
}

pub fn retencion_profile(rerank: bool) -> TopicProfile {
    TopicProfile {
        topic: Topic::Retencion,
        index: "retencion".to_string(),
        rerank,
        top_k: 8,
    }
}

/// Workflow over mock components for the retención topic.
pub fn workflow(
    retriever: Arc<StaticRetriever>,
    generator: Arc<CountingGenerator>,
    hallucination: Arc<FixedGrader>,
    answer: Arc<FixedGrader>,
) -> TopicWorkflow {
    TopicWorkflow::new(retencion_profile(false), retriever, generator, hallucination, answer)
}
