//! Error types for the tax assistant.
//!
//! One enum covers every failure category the pipeline can surface:
//! configuration, I/O, model calls, retrieval, reranking, grading,
//! routing, prompts and workflow ordering.

use thiserror::Error;

/// Unified error type for the tax assistant.
///
/// Generation failures never show up here: the workflow turns them into a
/// degraded answer instead. Everything else propagates with `?`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing credentials, unknown providers, unreadable config files
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Chat-completion or embedding provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Vector store query errors
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Reranking errors
    #[error("Rerank error: {0}")]
    Rerank(String),

    /// Answer generation errors
    #[error("Generation error: {0}")]
    Generation(String),

    /// Hallucination / relevance grader errors
    #[error("Grading error: {0}")]
    Grading(String),

    /// Topic router errors
    #[error("Routing error: {0}")]
    Routing(String),

    /// Prompt loading and rendering errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// A workflow stage read a field an earlier stage never populated,
    /// or the workflow was invoked with invalid input
    #[error("Workflow error: {0}")]
    Workflow(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_category() {
        let err = AppError::Grading("timeout".to_string());
        assert_eq!(err.to_string(), "Grading error: timeout");

        let err = AppError::Config("PINECONE_API_KEY is not set".to_string());
        assert!(err.to_string().starts_with("Configuration error"));
    }

    #[test]
    fn test_from_serde_json() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: AppError = parse.unwrap_err().into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
