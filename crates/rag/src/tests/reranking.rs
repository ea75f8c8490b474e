//! Reranking keeps document metadata intact.

use super::mocks::*;
use crate::chain::StructuredChain;
use crate::rerank::{retrieve_with_reranking, LlmReranker};
use crate::types::Document;
use tributario_core::AppError;
use tributario_prompt::load_prompt;

fn with_extra(mut doc: Document, key: &str, value: serde_json::Value) -> Document {
    doc.metadata.extra.insert(key.to_string(), value);
    doc
}

#[tokio::test]
async fn test_surviving_documents_keep_their_metadata() {
    let originals: Vec<Document> = tax_documents()
        .into_iter()
        .enumerate()
        .map(|(i, doc)| with_extra(doc, "chunk", serde_json::json!(i)))
        .collect();
    let retriever = StaticRetriever::new(originals.clone());

    let ranked = retrieve_with_reranking(QUESTION, retriever.as_ref(), &ReverseReranker, 8)
        .await
        .unwrap();

    assert_eq!(ranked.len(), originals.len());
    for doc in &ranked {
        let original = originals
            .iter()
            .find(|o| o.text == doc.text)
            .expect("reranked document comes from the base retrieval");
        assert_eq!(doc.metadata, original.metadata);
        assert_eq!(doc.source(), original.source());
    }
}

#[tokio::test]
async fn test_empty_base_retrieval_skips_reranker() {
    let retriever = StaticRetriever::new(Vec::new());
    let client = ScriptedClient::new(&[]);
    let reranker = LlmReranker::new(StructuredChain::new(
        client.clone(),
        load_prompt(None, "rerank.score").unwrap(),
        "gpt-3.5-turbo",
    ));

    let ranked = retrieve_with_reranking(QUESTION, retriever.as_ref(), &reranker, 8)
        .await
        .unwrap();

    assert!(ranked.is_empty());
    assert_eq!(client.request_count(), 0);
}

#[tokio::test]
async fn test_llm_reranker_orders_by_model_scores() {
    let retriever = StaticRetriever::new(tax_documents());
    let client = ScriptedClient::new(&[r#"{"scores": [2, 9, 5]}"#]);
    let reranker = LlmReranker::new(StructuredChain::new(
        client.clone(),
        load_prompt(None, "rerank.score").unwrap(),
        "gpt-3.5-turbo",
    ));

    let ranked = retrieve_with_reranking(QUESTION, retriever.as_ref(), &reranker, 2)
        .await
        .unwrap();

    let sources: Vec<&str> = ranked.iter().map(|d| d.source()).collect();
    assert_eq!(
        sources,
        vec!["Concepto DIAN 100208192-202.pdf", "Tabla retención 2024.pdf"]
    );
    assert!(client.requests.lock().unwrap()[0].prompt.contains("Document 3:"));
}

#[tokio::test]
async fn test_llm_reranker_wrong_score_count_is_rerank_error() {
    let retriever = StaticRetriever::new(tax_documents());
    let client = ScriptedClient::new(&[r#"{"scores": [2, 9]}"#]);
    let reranker = LlmReranker::new(StructuredChain::new(
        client,
        load_prompt(None, "rerank.score").unwrap(),
        "gpt-3.5-turbo",
    ));

    let result = retrieve_with_reranking(QUESTION, retriever.as_ref(), &reranker, 8).await;
    assert!(matches!(result, Err(AppError::Rerank(_))));
}
