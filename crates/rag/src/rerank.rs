//! Reranking: rescore base retrieval results against the query and keep the
//! best `top_k`.

use crate::chain::StructuredChain;
use crate::retrieval::{pinecone_http_client, VectorQueryService, PINECONE_API_VERSION, PINECONE_CONTROL_URL};
use crate::types::{document_contexts, Document};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::Duration;
use tributario_core::{AppError, AppResult};

/// Assigns a relevance score to each document for a query.
#[async_trait::async_trait]
pub trait Reranker: Send + Sync {
    /// One score per document, in input order. Higher is more relevant.
    async fn score(&self, query: &str, documents: &[Document]) -> AppResult<Vec<f32>>;
}

/// Base retrieval followed by reranking.
///
/// Documents are moved through unchanged, so every metadata field the base
/// service returned survives. Equal scores keep base order; NaN sorts last.
pub async fn retrieve_with_reranking(
    query: &str,
    base: &dyn VectorQueryService,
    reranker: &dyn Reranker,
    top_k: usize,
) -> AppResult<Vec<Document>> {
    let documents = base.query(query).await?;
    if documents.is_empty() {
        return Ok(documents);
    }

    let candidates = documents.len();
    let scores = reranker.score(query, &documents).await?;
    let kept = rank_by_scores(documents, &scores, top_k)?;

    tracing::debug!(
        "Reranked {} candidates from '{}', kept {}",
        candidates,
        base.index_name(),
        kept.len()
    );

    Ok(kept)
}

/// Stable-sort documents by descending score and keep the first `top_k`.
pub fn rank_by_scores(
    documents: Vec<Document>,
    scores: &[f32],
    top_k: usize,
) -> AppResult<Vec<Document>> {
    if scores.len() != documents.len() {
        return Err(AppError::Rerank(format!(
            "Reranker returned {} scores for {} documents",
            scores.len(),
            documents.len()
        )));
    }

    let mut scored: Vec<(f32, Document)> = scores.iter().copied().zip(documents).collect();
    scored.sort_by(|(a, _), (b, _)| compare_desc(*a, *b));

    Ok(scored
        .into_iter()
        .take(top_k)
        .map(|(_, doc)| doc)
        .collect())
}

fn compare_desc(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

#[derive(Debug, Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: Vec<RerankDocument<'a>>,
    top_n: usize,
    return_documents: bool,
}

#[derive(Debug, Serialize)]
struct RerankDocument<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct RerankResponse {
    #[serde(default)]
    data: Vec<RerankHit>,
}

#[derive(Debug, Deserialize)]
struct RerankHit {
    index: usize,
    score: f32,
}

/// Pinecone hosted rerank inference (`POST /rerank`).
pub struct PineconeReranker {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl PineconeReranker {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        Ok(Self {
            base_url: PINECONE_CONTROL_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client: pinecone_http_client(timeout)?,
        })
    }
}

#[async_trait::async_trait]
impl Reranker for PineconeReranker {
    async fn score(&self, query: &str, documents: &[Document]) -> AppResult<Vec<f32>> {
        let body = RerankRequest {
            model: &self.model,
            query,
            documents: documents
                .iter()
                .map(|d| RerankDocument { text: &d.text })
                .collect(),
            top_n: documents.len(),
            return_documents: false,
        };

        let response = self
            .client
            .post(format!("{}/rerank", self.base_url))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", PINECONE_API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Rerank(format!("Failed to call Pinecone rerank: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Rerank(format!(
                "Pinecone rerank error ({}): {}",
                status, error_text
            )));
        }

        let response: RerankResponse = response
            .json()
            .await
            .map_err(|e| AppError::Rerank(format!("Failed to parse rerank response: {}", e)))?;

        scores_from_hits(response.data, documents.len())
    }
}

/// Hits come back sorted by score; put them back in input order. Documents
/// the service did not return score as NaN and sort last.
fn scores_from_hits(hits: Vec<RerankHit>, count: usize) -> AppResult<Vec<f32>> {
    let mut scores = vec![f32::NAN; count];
    for hit in hits {
        let slot = scores.get_mut(hit.index).ok_or_else(|| {
            AppError::Rerank(format!(
                "Rerank hit index {} out of range for {} documents",
                hit.index, count
            ))
        })?;
        *slot = hit.score;
    }
    Ok(scores)
}

#[derive(Debug, Deserialize)]
struct ScoreList {
    scores: Vec<f32>,
}

#[derive(Serialize)]
struct RerankContext<'a> {
    question: &'a str,
    documents: Vec<crate::types::DocumentContext<'a>>,
}

/// Reranker that asks the chat model for one relevance score per document.
pub struct LlmReranker {
    chain: StructuredChain,
}

impl LlmReranker {
    pub fn new(chain: StructuredChain) -> Self {
        Self { chain }
    }
}

#[async_trait::async_trait]
impl Reranker for LlmReranker {
    async fn score(&self, query: &str, documents: &[Document]) -> AppResult<Vec<f32>> {
        let context = RerankContext {
            question: query,
            documents: document_contexts(documents),
        };

        let list: ScoreList = self
            .chain
            .invoke(&context)
            .await
            .map_err(|e| AppError::Rerank(format!("LLM rerank failed: {}", e)))?;

        Ok(list.scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(sources: &[&str]) -> Vec<Document> {
        sources
            .iter()
            .map(|s| Document::new(format!("texto de {}", s), *s))
            .collect()
    }

    fn sources(docs: &[Document]) -> Vec<&str> {
        docs.iter().map(|d| d.source()).collect()
    }

    #[test]
    fn test_rank_by_scores_descending_and_truncated() {
        let ranked = rank_by_scores(docs(&["a", "b", "c", "d"]), &[0.1, 0.9, 0.5, 0.7], 3).unwrap();
        assert_eq!(sources(&ranked), vec!["b", "d", "c"]);
    }

    #[test]
    fn test_rank_by_scores_ties_keep_base_order() {
        let ranked = rank_by_scores(docs(&["a", "b", "c"]), &[0.5, 0.5, 0.8], 8).unwrap();
        assert_eq!(sources(&ranked), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_rank_by_scores_nan_last() {
        let ranked = rank_by_scores(docs(&["a", "b", "c"]), &[f32::NAN, 0.2, 0.1], 8).unwrap();
        assert_eq!(sources(&ranked), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_rank_by_scores_length_mismatch() {
        let result = rank_by_scores(docs(&["a", "b"]), &[0.5], 8);
        assert!(matches!(result, Err(AppError::Rerank(_))));
    }

    #[test]
    fn test_scores_from_hits_restores_input_order() {
        let hits = vec![
            RerankHit { index: 2, score: 0.9 },
            RerankHit { index: 0, score: 0.4 },
        ];
        let scores = scores_from_hits(hits, 3).unwrap();
        assert_eq!(scores[0], 0.4);
        assert!(scores[1].is_nan());
        assert_eq!(scores[2], 0.9);

        let bad = scores_from_hits(vec![RerankHit { index: 5, score: 1.0 }], 3);
        assert!(bad.is_err());
    }

    #[test]
    fn test_rerank_request_shape() {
        let documents = docs(&["a"]);
        let body = RerankRequest {
            model: "bge-reranker-v2-m3",
            query: "tarifa",
            documents: documents.iter().map(|d| RerankDocument { text: &d.text }).collect(),
            top_n: 1,
            return_documents: false,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["documents"][0]["text"], "texto de a");
        assert_eq!(value["top_n"], 1);
        assert_eq!(value["return_documents"], false);
    }
}
