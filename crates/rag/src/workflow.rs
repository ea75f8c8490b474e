//! Topic workflow: RETRIEVE → GENERATE → VERIFY, with a bounded back-edge
//! from VERIFY to GENERATE.
//!
//! One parametrized workflow serves every topic; what differs per topic
//! (index, reranking, top-k) lives in its [`TopicProfile`] and in the
//! components it is built with.

use crate::generation::{has_structure, Generator};
use crate::grader::{GradeInput, Grader};
use crate::rerank::{retrieve_with_reranking, Reranker};
use crate::retrieval::VectorQueryService;
use crate::state::WorkflowState;
use crate::topic::{Topic, TopicProfile};
use crate::types::{Citation, Document, VerifyResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::Instrument;
use tributario_core::{AppConfig, AppResult};
use uuid::Uuid;

/// Per-invocation workflow options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowOptions {
    /// Maximum GENERATE calls per run (at least 1)
    pub max_generations: u32,

    /// Record a step-by-step flow trace in the outcome
    pub debug: bool,

    /// Grade retrieved documents for relevance during RETRIEVE
    pub grade_documents: bool,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            max_generations: 3,
            debug: false,
            grade_documents: false,
        }
    }
}

impl WorkflowOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_generations: config.max_generations.max(1),
            debug: config.debug,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Stage {
    Retrieve,
    Generate,
    Verify,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Retrieve => "RETRIEVE",
            Self::Generate => "GENERATE",
            Self::Verify => "VERIFY",
        })
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// VERIFY judged the answer useful
    Useful,
    /// Generation cap reached without a useful answer; best effort returned
    Exhausted,
    /// The generator failed; the answer is an error description
    Failed,
}

/// Transition out of VERIFY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    Generate,
    Finish(OutcomeKind),
}

/// VERIFY transition table with the generation cap applied.
pub fn after_verify(result: VerifyResult, generations: u32, max_generations: u32) -> Next {
    match result {
        VerifyResult::Useful => Next::Finish(OutcomeKind::Useful),
        _ if generations >= max_generations => Next::Finish(OutcomeKind::Exhausted),
        VerifyResult::NotUseful | VerifyResult::NotSupported => Next::Generate,
    }
}

/// Human-readable step log, kept only in debug runs.
#[derive(Debug, Default)]
struct FlowTrace {
    enabled: bool,
    lines: Vec<String>,
}

impl FlowTrace {
    fn new(enabled: bool) -> Self {
        Self {
            enabled,
            lines: Vec::new(),
        }
    }

    fn record(&mut self, stage: Stage, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(stage = %stage, "{}", message);
        if self.enabled {
            self.lines.push(format!("{}: {}", stage, message));
        }
    }
}

/// Result of one workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowOutcome {
    pub run_id: Uuid,
    pub topic: Topic,
    pub question: String,
    pub generation: String,
    pub citations: Vec<Citation>,
    pub documents: Vec<Document>,

    /// Last VERIFY result; absent when the run failed before VERIFY
    pub verify_result: Option<VerifyResult>,
    pub kind: OutcomeKind,

    /// False whenever the answer is not a verified useful one
    pub verified: bool,
    pub generations: u32,
    pub has_structure: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents_relevant: Option<bool>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flow: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// The state machine for one topic.
pub struct TopicWorkflow {
    profile: TopicProfile,
    retriever: Arc<dyn VectorQueryService>,
    reranker: Option<Arc<dyn Reranker>>,
    generator: Arc<dyn Generator>,
    hallucination_grader: Arc<dyn Grader>,
    answer_grader: Arc<dyn Grader>,
    document_grader: Option<Arc<dyn Grader>>,
}

impl TopicWorkflow {
    pub fn new(
        profile: TopicProfile,
        retriever: Arc<dyn VectorQueryService>,
        generator: Arc<dyn Generator>,
        hallucination_grader: Arc<dyn Grader>,
        answer_grader: Arc<dyn Grader>,
    ) -> Self {
        Self {
            profile,
            retriever,
            reranker: None,
            generator,
            hallucination_grader,
            answer_grader,
            document_grader: None,
        }
    }

    /// Reranker used when the profile enables reranking.
    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Grader used when a run asks for document grading.
    pub fn with_document_grader(mut self, grader: Arc<dyn Grader>) -> Self {
        self.document_grader = Some(grader);
        self
    }

    pub fn profile(&self) -> &TopicProfile {
        &self.profile
    }

    pub fn topic(&self) -> Topic {
        self.profile.topic
    }

    /// Name of the index this workflow actually queries.
    pub fn index_name(&self) -> &str {
        self.retriever.index_name()
    }

    /// RETRIEVE on its own: base query, reranked when the profile says so.
    pub async fn retrieve_documents(&self, question: &str) -> AppResult<Vec<Document>> {
        match (&self.reranker, self.profile.rerank) {
            (Some(reranker), true) => {
                retrieve_with_reranking(
                    question,
                    self.retriever.as_ref(),
                    reranker.as_ref(),
                    self.profile.top_k,
                )
                .await
            }
            _ => self.retriever.query(question).await,
        }
    }

    /// Run the full workflow for one question.
    pub async fn run(&self, question: &str, options: &WorkflowOptions) -> AppResult<WorkflowOutcome> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "workflow",
            topic = %self.profile.topic,
            run_id = %run_id
        );

        self.execute(run_id, question, options).instrument(span).await
    }

    async fn execute(
        &self,
        run_id: Uuid,
        question: &str,
        options: &WorkflowOptions,
    ) -> AppResult<WorkflowOutcome> {
        let started_at = Utc::now();
        let max_generations = options.max_generations.max(1);
        let mut trace = FlowTrace::new(options.debug);
        let mut state = WorkflowState::new(question);

        tracing::info!("Workflow started for topic {}", self.profile.topic);

        self.retrieve(&mut state, options, &mut trace).await?;

        let kind = loop {
            self.generate(&mut state, &mut trace).await?;
            if state.degraded {
                trace.record(Stage::Generate, "generation failed, stopping");
                break OutcomeKind::Failed;
            }

            let result = self.verify(&mut state, &mut trace).await?;
            match after_verify(result, state.generations, max_generations) {
                Next::Generate => {
                    trace.record(Stage::Verify, format!("{}, back to GENERATE", result));
                }
                Next::Finish(kind) => {
                    if kind == OutcomeKind::Exhausted {
                        tracing::warn!(
                            "Giving up after {} generations, last result {}",
                            state.generations,
                            result
                        );
                        trace.record(
                            Stage::Verify,
                            format!("{} after {} generations, giving up", result, state.generations),
                        );
                    }
                    break kind;
                }
            }
        };

        let topic = state.topic().unwrap_or(self.profile.topic);
        let generations = state.generations;
        let has_structure = state.has_structure;
        let documents_relevant = state.documents_relevant;
        let parts = state.into_parts();

        tracing::info!(
            "Workflow finished: {:?} after {} generations",
            kind,
            generations
        );

        Ok(WorkflowOutcome {
            run_id,
            topic,
            question: parts.question,
            generation: parts.generation,
            citations: parts.citations,
            documents: parts.documents,
            verify_result: parts.verify_result,
            kind,
            verified: kind == OutcomeKind::Useful,
            generations,
            has_structure,
            documents_relevant,
            flow: trace.lines,
            started_at,
            finished_at: Utc::now(),
        })
    }

    async fn retrieve(
        &self,
        state: &mut WorkflowState,
        options: &WorkflowOptions,
        trace: &mut FlowTrace,
    ) -> AppResult<()> {
        let documents = self.retrieve_documents(state.question()).await?;
        trace.record(
            Stage::Retrieve,
            format!(
                "{} documents from '{}'{}",
                documents.len(),
                self.retriever.index_name(),
                if self.profile.rerank && self.reranker.is_some() {
                    " (reranked)"
                } else {
                    ""
                }
            ),
        );
        state.set_documents(self.profile.topic, documents);

        if options.grade_documents {
            if let Some(grader) = &self.document_grader {
                let score = grader
                    .grade(&GradeInput::Retrieval {
                        question: state.question(),
                        documents: state.documents()?,
                    })
                    .await?;
                trace.record(
                    Stage::Retrieve,
                    if score.binary_score {
                        "documents graded relevant"
                    } else {
                        "documents graded not relevant"
                    },
                );
                state.documents_relevant = Some(score.binary_score);
            }
        }

        Ok(())
    }

    async fn generate(&self, state: &mut WorkflowState, trace: &mut FlowTrace) -> AppResult<()> {
        let result = self
            .generator
            .generate(state.question(), state.documents()?)
            .await;

        match result {
            Ok(output) => {
                state.set_generation(output);
                state.has_structure = has_structure(state.generation()?);
                if !state.has_structure {
                    tracing::warn!("Generated answer lacks REFERENCIA/ANÁLISIS sections");
                }
                trace.record(
                    Stage::Generate,
                    format!(
                        "attempt {} with {} citations",
                        state.generations,
                        state.citations().len()
                    ),
                );
            }
            Err(e) => {
                tracing::error!("Generation failed: {}", e);
                state.set_generation_error(&e);
            }
        }

        Ok(())
    }

    async fn verify(
        &self,
        state: &mut WorkflowState,
        trace: &mut FlowTrace,
    ) -> AppResult<VerifyResult> {
        let grounded = self
            .hallucination_grader
            .grade(&GradeInput::Grounding {
                documents: state.documents()?,
                generation: state.generation()?,
            })
            .await?;

        let result = if !grounded.binary_score {
            VerifyResult::NotSupported
        } else {
            let relevant = self
                .answer_grader
                .grade(&GradeInput::Relevance {
                    question: state.question(),
                    generation: state.generation()?,
                })
                .await?;

            if relevant.binary_score {
                VerifyResult::Useful
            } else {
                VerifyResult::NotUseful
            }
        };

        trace.record(Stage::Verify, result.as_str());
        state.set_verify_result(result)?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_after_verify_table() {
        assert_eq!(
            after_verify(VerifyResult::Useful, 1, 3),
            Next::Finish(OutcomeKind::Useful)
        );
        assert_eq!(after_verify(VerifyResult::NotUseful, 1, 3), Next::Generate);
        assert_eq!(after_verify(VerifyResult::NotSupported, 2, 3), Next::Generate);
        assert_eq!(
            after_verify(VerifyResult::NotSupported, 3, 3),
            Next::Finish(OutcomeKind::Exhausted)
        );
        assert_eq!(
            after_verify(VerifyResult::Useful, 3, 3),
            Next::Finish(OutcomeKind::Useful)
        );
    }

    #[test]
    fn test_options_from_config() {
        let mut config = AppConfig::default();
        config.max_generations = 0;
        config.debug = true;

        let options = WorkflowOptions::from_config(&config);
        assert_eq!(options.max_generations, 1);
        assert!(options.debug);
        assert!(!options.grade_documents);
    }

    #[test]
    fn test_flow_trace_only_kept_when_enabled() {
        let mut off = FlowTrace::new(false);
        off.record(Stage::Retrieve, "3 documents");
        assert!(off.lines.is_empty());

        let mut on = FlowTrace::new(true);
        on.record(Stage::Verify, "useful");
        assert_eq!(on.lines, vec!["VERIFY: useful".to_string()]);
    }
}
