//! LLM integration for the tax assistant.
//!
//! Provider-agnostic chat completion and embedding clients behind
//! `LlmClient` / `EmbeddingClient`.
//!
//! # Providers
//! - **OpenAI**: chat completions and embeddings (default)
//! - **Ollama**: local chat models
//!
//! # Example
//! ```no_run
//! use std::time::Duration;
//! use tributario_llm::{LlmClient, LlmRequest, providers::OpenAiClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OpenAiClient::new("sk-...", Duration::from_secs(60))?;
//! let request = LlmRequest::new("¿Qué es el impuesto al consumo?", "gpt-4o-mini");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod embedding;
pub mod factory;
pub mod providers;

pub use client::{complete_json, extract_json_object, LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use embedding::EmbeddingClient;
pub use factory::{create_client, create_embedder, ProviderType};
pub use providers::{OllamaClient, OpenAiClient};
