//! Prompt system for the tax assistant.
//!
//! - YAML prompt definitions, built in and overridable per workspace
//! - Handlebars rendering of system and user messages

pub mod builder;
pub mod loader;
pub mod types;

pub use builder::build_prompt;
pub use loader::{list_prompts, load_prompt, load_prompt_with_origin};
pub use types::{BuiltPrompt, PromptDefinition, PromptOrigin, PromptOutputSpec};
