//! Retrieval-augmented answering for Colombian tax law.
//!
//! A question is routed to a topic, then run through that topic's
//! RETRIEVE → GENERATE → VERIFY workflow:
//!
//! - **Retrieval**: Pinecone vector query, optionally reranked
//! - **Generation**: structured answer with citations
//! - **Verification**: hallucination and answer-relevance graders, with a
//!   bounded regenerate loop

pub mod assistant;
pub mod chain;
pub mod citation;
pub mod generation;
pub mod grader;
pub mod rerank;
pub mod retrieval;
pub mod router;
pub mod state;
pub mod topic;
pub mod types;
pub mod workflow;

#[cfg(test)]
mod tests;

pub use assistant::Assistant;
pub use chain::StructuredChain;
pub use generation::{has_structure, Generator, LlmGenerator, NO_INFORMATION_ANSWER};
pub use grader::{GradeInput, Grader, LlmGrader};
pub use rerank::{retrieve_with_reranking, LlmReranker, PineconeReranker, Reranker};
pub use retrieval::{resolve_index, IndexDescription, PineconeControl, PineconeStore, VectorQueryService};
pub use router::{LlmRouter, RouteDecision, Router};
pub use state::WorkflowState;
pub use topic::{Topic, TopicProfile};
pub use types::{Citation, Document, DocumentMetadata, GenerationOutput, GradeScore, VerifyResult};
pub use workflow::{OutcomeKind, TopicWorkflow, WorkflowOptions, WorkflowOutcome};
