//! Prompt rendering.

use crate::types::{BuiltPrompt, PromptDefinition};
use handlebars::Handlebars;
use serde::Serialize;
use tributario_core::{AppError, AppResult};

/// Render a definition's system and user templates against `context`.
///
/// `context` is any serializable value; the built-in prompts expect a map
/// with keys such as `question`, `generation` and `documents`.
///
/// # Example
/// ```no_run
/// use tributario_prompt::{build_prompt, load_prompt};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = load_prompt(None, "grader.answer")?;
/// let built = build_prompt(
///     &def,
///     &serde_json::json!({"question": "¿Quién es agente retenedor?", "generation": "..."}),
/// )?;
/// println!("{}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt<C: Serialize>(definition: &PromptDefinition, context: &C) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let mut handlebars = Handlebars::new();

    // Prompts are plain text; HTML escaping would mangle quotes and accents.
    handlebars.register_escape_fn(handlebars::no_escape);

    let system = definition
        .system
        .as_deref()
        .map(|template| render(&mut handlebars, "system", template, context))
        .transpose()?;

    let user = render(&mut handlebars, "user", &definition.template, context)?;

    Ok(BuiltPrompt {
        system,
        user,
        source_prompt_id: definition.id.clone(),
        expects_json: definition.output.is_json(),
    })
}

fn render<C: Serialize>(
    handlebars: &mut Handlebars<'_>,
    name: &str,
    template: &str,
    context: &C,
) -> AppResult<String> {
    handlebars
        .register_template_string(name, template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template '{}': {}", name, e)))?;

    handlebars
        .render(name, context)
        .map_err(|e| AppError::Prompt(format!("Failed to render template '{}': {}", name, e)))
}
