//! Route command handler.

use clap::Args;
use tributario_core::{config::AppConfig, AppResult};
use tributario_rag::Assistant;

/// Show which topic a question is routed to
#[derive(Args, Debug)]
pub struct RouteCommand {
    /// The question to classify
    pub question: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl RouteCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing route command");

        let assistant = Assistant::from_config(config).await?;
        let decision = assistant.route(&self.question).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&decision)?);
        } else {
            println!("{}", decision.destination);
        }

        Ok(())
    }
}
