//! Config command handler.

use clap::Args;
use tributario_core::{config::AppConfig, AppResult};
use tributario_prompt::{list_prompts, PromptOrigin};

/// Show the effective configuration and prompts
#[derive(Args, Debug)]
pub struct ConfigCommand {
    /// Also list prompt definitions and where each comes from
    #[arg(long)]
    pub prompts: bool,
}

impl ConfigCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing config command");

        // API keys are never serialized.
        print!("{}", serde_yaml::to_string(config)?);
        println!(
            "openai_api_key: {}",
            if config.openai_api_key.is_some() { "set" } else { "missing" }
        );
        println!(
            "pinecone_api_key: {}",
            if config.pinecone_api_key.is_some() { "set" } else { "missing" }
        );

        if self.prompts {
            println!();
            println!("Prompts:");
            for (id, origin) in list_prompts(Some(&config.workspace))? {
                let origin = match origin {
                    PromptOrigin::Builtin => "built-in",
                    PromptOrigin::Workspace => "workspace",
                };
                println!("- {} ({})", id, origin);
            }
        }

        Ok(())
    }
}
