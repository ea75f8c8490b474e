//! Prompt loading: built-in definitions plus workspace overrides.

use crate::types::{PromptDefinition, PromptOrigin};
use std::path::{Path, PathBuf};
use tributario_core::{AppError, AppResult};

/// Built-in prompt definitions, keyed by id.
const BUILTIN_PROMPTS: &[(&str, &str)] = &[
    ("router", include_str!("../prompts/router.yml")),
    ("grader.hallucination", include_str!("../prompts/grader.hallucination.yml")),
    ("grader.answer", include_str!("../prompts/grader.answer.yml")),
    ("grader.documents", include_str!("../prompts/grader.documents.yml")),
    ("generation.answer", include_str!("../prompts/generation.answer.yml")),
    ("rerank.score", include_str!("../prompts/rerank.score.yml")),
];

/// Directory holding workspace prompt overrides.
pub fn prompts_dir(workspace: &Path) -> PathBuf {
    workspace.join(".tributario").join("prompts")
}

/// Load a prompt definition by ID.
///
/// A workspace file `.tributario/prompts/<id>.yml` wins over the built-in
/// definition of the same id.
///
/// # Example
/// ```no_run
/// use tributario_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Some(Path::new(".")), "router")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace: Option<&Path>, prompt_id: &str) -> AppResult<PromptDefinition> {
    load_prompt_with_origin(workspace, prompt_id).map(|(definition, _)| definition)
}

/// Like [`load_prompt`], also reporting where the definition came from.
pub fn load_prompt_with_origin(
    workspace: Option<&Path>,
    prompt_id: &str,
) -> AppResult<(PromptDefinition, PromptOrigin)> {
    if let Some(workspace) = workspace {
        let prompt_file = prompts_dir(workspace).join(format!("{}.yml", prompt_id));
        if prompt_file.exists() {
            tracing::debug!("Loading prompt override from: {:?}", prompt_file);

            let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
                AppError::Prompt(format!("Failed to read prompt file {:?}: {}", prompt_file, e))
            })?;
            let definition = parse_prompt(&contents, &prompt_file.display().to_string())?;

            if definition.id != prompt_id {
                return Err(AppError::Prompt(format!(
                    "Prompt file {:?} declares id '{}', expected '{}'",
                    prompt_file, definition.id, prompt_id
                )));
            }

            tracing::info!("Using workspace prompt override: {}", prompt_id);
            return Ok((definition, PromptOrigin::Workspace));
        }
    }

    let (_, contents) = BUILTIN_PROMPTS
        .iter()
        .find(|(id, _)| *id == prompt_id)
        .ok_or_else(|| AppError::Prompt(format!("Unknown prompt: {}", prompt_id)))?;

    Ok((parse_prompt(contents, prompt_id)?, PromptOrigin::Builtin))
}

/// List prompt IDs: built-ins first, then workspace-only overrides.
pub fn list_prompts(workspace: Option<&Path>) -> AppResult<Vec<(String, PromptOrigin)>> {
    let mut prompts: Vec<(String, PromptOrigin)> = BUILTIN_PROMPTS
        .iter()
        .map(|(id, _)| (id.to_string(), PromptOrigin::Builtin))
        .collect();

    let Some(workspace) = workspace else {
        return Ok(prompts);
    };

    let dir = prompts_dir(workspace);
    if !dir.exists() {
        return Ok(prompts);
    }

    for entry in walkdir::WalkDir::new(&dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                match prompts.iter_mut().find(|(id, _)| id == stem) {
                    Some(existing) => existing.1 = PromptOrigin::Workspace,
                    None => prompts.push((stem.to_string(), PromptOrigin::Workspace)),
                }
            }
        }
    }

    Ok(prompts)
}

fn parse_prompt(contents: &str, origin: &str) -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(contents)
        .map_err(|e| AppError::Prompt(format!("Failed to parse prompt YAML {}: {}", origin, e)))?;

    validate_prompt(&definition)?;
    Ok(definition)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(format!(
            "Prompt template cannot be empty: {}",
            def.id
        )));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_override(dir: &Path, id: &str, body: &str) {
        let prompts = prompts_dir(dir);
        fs::create_dir_all(&prompts).unwrap();
        fs::write(prompts.join(format!("{}.yml", id)), body).unwrap();
    }

    #[test]
    fn test_all_builtins_parse() {
        for (id, _) in BUILTIN_PROMPTS {
            let def = load_prompt(None, id).unwrap();
            assert_eq!(def.id, *id);
            assert!(def.output.is_json(), "{} should expect JSON", id);
            assert!(def.system.is_some(), "{} should carry a system prompt", id);
        }
    }

    #[test]
    fn test_generation_prompt_names_markers() {
        let def = load_prompt(None, "generation.answer").unwrap();
        let system = def.system.unwrap();
        assert!(system.contains("REFERENCIA"));
        assert!(system.contains("ANÁLISIS"));
    }

    #[test]
    fn test_unknown_prompt() {
        assert!(matches!(load_prompt(None, "nope"), Err(AppError::Prompt(_))));
    }

    #[test]
    fn test_workspace_override_wins() {
        let temp = TempDir::new().unwrap();
        write_override(
            temp.path(),
            "router",
            r#"
id: router
title: Custom router
apiVersion: "1.1"
template: "Consulta: {{query}}"
output:
  format: json
"#,
        );

        let (def, origin) = load_prompt_with_origin(Some(temp.path()), "router").unwrap();
        assert_eq!(def.title, "Custom router");
        assert_eq!(origin, PromptOrigin::Workspace);

        let (_, origin) = load_prompt_with_origin(Some(temp.path()), "grader.answer").unwrap();
        assert_eq!(origin, PromptOrigin::Builtin);
    }

    #[test]
    fn test_override_with_mismatched_id() {
        let temp = TempDir::new().unwrap();
        write_override(
            temp.path(),
            "router",
            r#"
id: something-else
title: Wrong
apiVersion: "1.0"
template: "x"
output:
  format: json
"#,
        );

        assert!(load_prompt(Some(temp.path()), "router").is_err());
    }

    #[test]
    fn test_invalid_override() {
        let temp = TempDir::new().unwrap();
        write_override(temp.path(), "router", "invalid: yaml: content:");
        assert!(load_prompt(Some(temp.path()), "router").is_err());

        write_override(
            temp.path(),
            "router",
            r#"
id: router
title: Bad version
apiVersion: "1"
template: "x"
output:
  format: json
"#,
        );
        let err = load_prompt(Some(temp.path()), "router").unwrap_err();
        assert!(err.to_string().contains("apiVersion"));
    }

    #[test]
    fn test_list_prompts() {
        let temp = TempDir::new().unwrap();
        write_override(temp.path(), "grader.answer", "id: grader.answer");
        write_override(temp.path(), "custom.extra", "id: custom.extra");

        let prompts = list_prompts(Some(temp.path())).unwrap();
        assert_eq!(prompts.len(), BUILTIN_PROMPTS.len() + 1);
        assert!(prompts.contains(&("grader.answer".to_string(), PromptOrigin::Workspace)));
        assert!(prompts.contains(&("custom.extra".to_string(), PromptOrigin::Workspace)));
        assert!(prompts.contains(&("router".to_string(), PromptOrigin::Builtin)));
    }
}
