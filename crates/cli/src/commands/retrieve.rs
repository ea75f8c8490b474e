//! Retrieve command handler.
//!
//! Runs RETRIEVE alone (routing, index fallback and reranking included).

use clap::Args;
use tributario_core::{config::AppConfig, AppResult};
use tributario_rag::citation::format_source_line;
use tributario_rag::{Assistant, Topic};

/// Show the documents retrieved for a question
#[derive(Args, Debug)]
pub struct RetrieveCommand {
    /// The question to retrieve documents for
    pub question: String,

    /// Skip routing and use this topic
    #[arg(short, long)]
    pub topic: Option<Topic>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl RetrieveCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing retrieve command");

        let assistant = Assistant::from_config(config).await?;
        let (workflow, documents) = assistant.retrieve(&self.question, self.topic).await?;

        if self.json {
            let output = serde_json::json!({
                "topic": workflow.topic(),
                "index": workflow.index_name(),
                "documents": documents,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        println!(
            "Tema: {} (índice '{}')",
            workflow.topic(),
            workflow.index_name()
        );

        if documents.is_empty() {
            println!("No se encontraron documentos.");
            return Ok(());
        }

        for (i, document) in documents.iter().enumerate() {
            println!();
            println!("{}", format_source_line(i + 1, document));
            println!("{}", document.text);
        }

        Ok(())
    }
}
