//! Topics command handler.

use clap::Args;
use tributario_core::{config::AppConfig, AppResult};
use tributario_rag::{Topic, TopicProfile};

/// List topics and the indexes they query
#[derive(Args, Debug)]
pub struct TopicsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl TopicsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing topics command");

        let profiles: Vec<TopicProfile> = Topic::ALL
            .iter()
            .map(|topic| TopicProfile::for_topic(*topic, config))
            .collect();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&profiles)?);
            return Ok(());
        }

        // Index names are as configured; a missing topic index falls back to
        // the default index at query time.
        for profile in &profiles {
            println!(
                "{:<12} {:<24} index: {:<16} rerank: {}",
                profile.topic.label(),
                profile.topic.display_name(),
                profile.index,
                if profile.rerank {
                    format!("{} (top {})", config.retrieval.reranker, profile.top_k)
                } else {
                    "no".to_string()
                }
            );
        }

        Ok(())
    }
}
