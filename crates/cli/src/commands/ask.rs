//! Ask command handler.
//!
//! Routes the question, runs the topic workflow and prints the answer with
//! its references and sources.

use clap::Args;
use tributario_core::{config::AppConfig, AppError, AppResult};
use tributario_rag::citation::{format_reference_line, format_source_line, format_with_citations};
use tributario_rag::{Assistant, OutcomeKind, Topic, WorkflowOptions, WorkflowOutcome};

/// Answer a tax question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Skip routing and use this topic (retencion, aduanas, cambiario, ipoconsumo, general)
    #[arg(short, long)]
    pub topic: Option<Topic>,

    /// Maximum answer generations before giving up
    #[arg(long)]
    pub max_generations: Option<u32>,

    /// Grade retrieved documents for relevance
    #[arg(long)]
    pub grade_documents: bool,

    /// Print the retrieved sources after the answer
    #[arg(long)]
    pub show_sources: bool,

    /// Output the full workflow outcome as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let mut options = WorkflowOptions::from_config(config);
        if let Some(max) = self.max_generations {
            if max == 0 {
                return Err(AppError::Config(
                    "--max-generations must be at least 1".to_string(),
                ));
            }
            options.max_generations = max;
        }
        options.grade_documents = self.grade_documents;

        let assistant = Assistant::from_config(config).await?;
        let outcome = assistant.ask(&self.question, self.topic, &options).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        } else {
            self.print_outcome(&outcome);
        }

        Ok(())
    }

    fn print_outcome(&self, outcome: &WorkflowOutcome) {
        println!("Tema: {}", outcome.topic);
        println!();
        println!("{}", format_with_citations(&outcome.generation, &outcome.citations));

        if !outcome.citations.is_empty() {
            println!();
            println!("Referencias:");
            for (i, citation) in outcome.citations.iter().enumerate() {
                println!("{}", format_reference_line(i + 1, citation));
            }
        }

        match outcome.kind {
            OutcomeKind::Useful => {}
            OutcomeKind::Exhausted => {
                println!();
                println!(
                    "Aviso: la respuesta no pudo verificarse tras {} intentos ({}).",
                    outcome.generations,
                    outcome
                        .verify_result
                        .map(|r| r.as_str())
                        .unwrap_or("sin verificar")
                );
            }
            OutcomeKind::Failed => {
                println!();
                println!("Aviso: no fue posible generar una respuesta.");
            }
        }

        if outcome.documents_relevant == Some(false) {
            println!("Aviso: los documentos recuperados no parecen relevantes para la pregunta.");
        }

        if self.show_sources {
            println!();
            if outcome.documents.is_empty() {
                println!("Fuentes: (sin documentos)");
            } else {
                println!("Fuentes:");
                for (i, document) in outcome.documents.iter().enumerate() {
                    println!("{}", format_source_line(i + 1, document));
                }
            }
        }

        if !outcome.flow.is_empty() {
            println!();
            println!("Flujo de procesamiento:");
            for line in &outcome.flow {
                println!("- {}", line);
            }
        }
    }
}
