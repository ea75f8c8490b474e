//! Topic router.

use crate::chain::StructuredChain;
use crate::topic::Topic;
use serde::{Deserialize, Serialize};
use tributario_core::{AppError, AppResult};

pub const ROUTER_PROMPT: &str = "router";

/// Where a question goes, plus the label the model actually produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDecision {
    pub destination: Topic,
    pub raw: String,
}

impl RouteDecision {
    /// Map a raw label to a topic; unknown labels go to `General`.
    pub fn from_label(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        Self {
            destination: Topic::from_route_label(&raw),
            raw,
        }
    }
}

#[async_trait::async_trait]
pub trait Router: Send + Sync {
    async fn route(&self, question: &str) -> AppResult<RouteDecision>;
}

#[derive(Deserialize)]
struct RouteReply {
    #[serde(default)]
    destination: String,
}

#[derive(Serialize)]
struct RouteContext<'a> {
    query: &'a str,
}

/// Router backed by the `router` prompt.
pub struct LlmRouter {
    chain: StructuredChain,
}

impl LlmRouter {
    pub fn new(chain: StructuredChain) -> Self {
        Self { chain }
    }
}

#[async_trait::async_trait]
impl Router for LlmRouter {
    async fn route(&self, question: &str) -> AppResult<RouteDecision> {
        let reply: RouteReply = self
            .chain
            .invoke(&RouteContext { query: question })
            .await
            .map_err(|e| AppError::Routing(e.to_string()))?;

        let decision = RouteDecision::from_label(reply.destination);
        if Topic::from_label(&decision.raw).is_none() {
            tracing::warn!(
                "Router returned unknown label '{}', using general",
                decision.raw
            );
        }
        tracing::info!("Routed to {}", decision.destination);

        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_from_label() {
        assert_eq!(
            RouteDecision::from_label("ipoconsumo").destination,
            Topic::Ipoconsumo
        );

        let unknown = RouteDecision::from_label("renta");
        assert_eq!(unknown.destination, Topic::General);
        assert_eq!(unknown.raw, "renta");
    }
}
