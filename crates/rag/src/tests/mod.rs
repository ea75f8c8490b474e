//! Cross-module tests over scripted components.

mod mocks;
mod reranking;
mod workflow_scenarios;
