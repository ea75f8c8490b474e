//! Embedding provider trait.

use tributario_core::{AppError, AppResult};

/// Turns query text into vectors compatible with the indexes being queried.
#[async_trait::async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Model identifier
    fn model_name(&self) -> &str;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text.
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Llm("No embedding returned".to_string()))
    }
}
