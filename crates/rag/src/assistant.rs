//! Assistant dispatch: route a question to its topic workflow and run it.

use crate::chain::StructuredChain;
use crate::generation::LlmGenerator;
use crate::grader::{Grader, LlmGrader, ANSWER_PROMPT, DOCUMENTS_PROMPT, HALLUCINATION_PROMPT};
use crate::rerank::{LlmReranker, PineconeReranker, Reranker};
use crate::retrieval::{resolve_index, PineconeControl, PineconeStore};
use crate::router::{LlmRouter, RouteDecision, Router, ROUTER_PROMPT};
use crate::topic::{Topic, TopicProfile};
use crate::types::Document;
use crate::workflow::{TopicWorkflow, WorkflowOptions, WorkflowOutcome};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tributario_core::{AppConfig, AppError, AppResult};
use tributario_llm::{create_client, create_embedder};

pub const GENERATION_PROMPT: &str = "generation.answer";
pub const RERANK_PROMPT: &str = "rerank.score";

/// Router plus one workflow per topic.
pub struct Assistant {
    router: Arc<dyn Router>,
    workflows: HashMap<Topic, TopicWorkflow>,
}

impl Assistant {
    pub fn new(router: Arc<dyn Router>) -> Self {
        Self {
            router,
            workflows: HashMap::new(),
        }
    }

    /// Register a workflow under its profile's topic.
    pub fn with_workflow(mut self, workflow: TopicWorkflow) -> Self {
        self.workflows.insert(workflow.topic(), workflow);
        self
    }

    pub fn workflow(&self, topic: Topic) -> Option<&TopicWorkflow> {
        self.workflows.get(&topic)
    }

    /// Classify a question without running a workflow.
    pub async fn route(&self, question: &str) -> AppResult<RouteDecision> {
        self.router.route(validate_question(question)?).await
    }

    /// Answer a question. With `topic_override` the router is skipped.
    pub async fn ask(
        &self,
        question: &str,
        topic_override: Option<Topic>,
        options: &WorkflowOptions,
    ) -> AppResult<WorkflowOutcome> {
        let question = validate_question(question)?;
        let topic = self.resolve_topic(question, topic_override).await?;

        self.select(topic)?.run(question, options).await
    }

    /// Run RETRIEVE alone for a question, returning the workflow that served it.
    pub async fn retrieve(
        &self,
        question: &str,
        topic_override: Option<Topic>,
    ) -> AppResult<(&TopicWorkflow, Vec<Document>)> {
        let question = validate_question(question)?;
        let topic = self.resolve_topic(question, topic_override).await?;

        let workflow = self.select(topic)?;
        let documents = workflow.retrieve_documents(question).await?;
        Ok((workflow, documents))
    }

    async fn resolve_topic(&self, question: &str, topic_override: Option<Topic>) -> AppResult<Topic> {
        match topic_override {
            Some(topic) => {
                tracing::debug!("Topic forced to {}", topic);
                Ok(topic)
            }
            None => Ok(self.router.route(question).await?.destination),
        }
    }

    /// The topic's workflow, else the general one.
    pub fn select(&self, topic: Topic) -> AppResult<&TopicWorkflow> {
        if let Some(workflow) = self.workflows.get(&topic) {
            return Ok(workflow);
        }

        tracing::warn!("No workflow for topic {}, using general", topic);
        self.workflows.get(&Topic::General).ok_or_else(|| {
            AppError::Workflow(format!(
                "No workflow registered for '{}' and no general workflow",
                topic
            ))
        })
    }

    /// Wire the assistant against the configured providers and Pinecone.
    ///
    /// Lists the Pinecone project's indexes once; topics whose index is
    /// missing fall back to the default index.
    pub async fn from_config(config: &AppConfig) -> AppResult<Self> {
        let openai_key = config.require_openai_key()?;
        let pinecone_key = config.require_pinecone_key()?;
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let workspace = Some(config.workspace.as_path());

        let chat = create_client(
            &config.provider,
            config.llm_endpoint.as_deref(),
            Some(openai_key),
            timeout,
        )?;
        let embedder = create_embedder(openai_key, &config.embedding_model, timeout)?;

        let chain = |prompt_id: &str, model: &str| {
            StructuredChain::load(chat.clone(), workspace, prompt_id, model)
        };

        let router = LlmRouter::new(chain(ROUTER_PROMPT, &config.router_model)?);
        let hallucination: Arc<dyn Grader> =
            Arc::new(LlmGrader::new(chain(HALLUCINATION_PROMPT, &config.grader_model)?));
        let answer: Arc<dyn Grader> =
            Arc::new(LlmGrader::new(chain(ANSWER_PROMPT, &config.grader_model)?));
        let documents: Arc<dyn Grader> =
            Arc::new(LlmGrader::new(chain(DOCUMENTS_PROMPT, &config.grader_model)?));
        let generation = chain(GENERATION_PROMPT, &config.model)?;

        let reranker: Option<Arc<dyn Reranker>> = match config.retrieval.reranker.as_str() {
            "pinecone" => {
                let reranker =
                    PineconeReranker::new(pinecone_key, &config.retrieval.rerank_model, timeout)?;
                Some(Arc::new(reranker))
            }
            "llm" => {
                let reranker = LlmReranker::new(chain(RERANK_PROMPT, &config.grader_model)?);
                Some(Arc::new(reranker))
            }
            _ => None,
        };

        let control = PineconeControl::new(pinecone_key, timeout)?;
        let available = control.list_indexes().await?;
        tracing::debug!("Pinecone project has {} indexes", available.len());

        let mut assistant = Self::new(Arc::new(router));
        for topic in Topic::ALL {
            let profile = TopicProfile::for_topic(topic, config);
            let index = resolve_index(&available, &profile.index, &config.retrieval.default_index)?;

            // Reranked topics over-fetch candidates; the reranker trims to top_k.
            let candidates = if profile.rerank {
                config.retrieval.top_k
            } else {
                profile.top_k
            };
            let store = PineconeStore::new(index, pinecone_key, embedder.clone(), candidates, timeout)?
                .with_namespace(config.retrieval.namespace.clone());

            let mut generator = LlmGenerator::new(generation.clone());
            if topic != Topic::General {
                generator = generator.with_topic(topic.display_name());
            }

            let mut workflow = TopicWorkflow::new(
                profile,
                Arc::new(store),
                Arc::new(generator),
                hallucination.clone(),
                answer.clone(),
            )
            .with_document_grader(documents.clone());

            if let Some(reranker) = &reranker {
                workflow = workflow.with_reranker(reranker.clone());
            }

            tracing::debug!("Topic {} uses index '{}'", topic, workflow.index_name());
            assistant = assistant.with_workflow(workflow);
        }

        Ok(assistant)
    }
}

fn validate_question(question: &str) -> AppResult<&str> {
    let question = question.trim();
    if question.is_empty() {
        return Err(AppError::Workflow("Question must not be empty".to_string()));
    }
    Ok(question)
}
