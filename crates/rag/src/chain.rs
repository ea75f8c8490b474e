//! Prompt-then-model call with a typed JSON reply.
//!
//! Router, graders, generator and LLM reranker are all one rendered prompt
//! followed by one structured model call; this is that shared step.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tributario_core::AppResult;
use tributario_llm::{complete_json, LlmClient, LlmRequest};
use tributario_prompt::{build_prompt, load_prompt, PromptDefinition};

/// A loaded prompt bound to a client and model.
#[derive(Clone)]
pub struct StructuredChain {
    client: Arc<dyn LlmClient>,
    definition: PromptDefinition,
    model: String,
    temperature: f32,
}

impl StructuredChain {
    /// Load `prompt_id` (workspace override or built-in) and bind it.
    pub fn load(
        client: Arc<dyn LlmClient>,
        workspace: Option<&Path>,
        prompt_id: &str,
        model: impl Into<String>,
    ) -> AppResult<Self> {
        Ok(Self::new(client, load_prompt(workspace, prompt_id)?, model))
    }

    pub fn new(client: Arc<dyn LlmClient>, definition: PromptDefinition, model: impl Into<String>) -> Self {
        Self {
            client,
            definition,
            model: model.into(),
            temperature: 0.0,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn prompt_id(&self) -> &str {
        &self.definition.id
    }

    /// Render the prompt against `context` and parse the reply as `T`.
    pub async fn invoke<T, C>(&self, context: &C) -> AppResult<T>
    where
        T: DeserializeOwned,
        C: Serialize + Sync,
    {
        let built = build_prompt(&self.definition, context)?;

        let mut request =
            LlmRequest::new(built.user, &self.model).with_temperature(self.temperature);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        tracing::debug!(prompt = %self.definition.id, model = %self.model, "Invoking chain");
        complete_json(self.client.as_ref(), &request).await
    }
}
