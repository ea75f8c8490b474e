//! End-to-end workflow runs over mock components.

use super::mocks::*;
use crate::chain::StructuredChain;
use crate::generation::{LlmGenerator, NO_INFORMATION_ANSWER};
use crate::grader::LlmGrader;
use crate::types::VerifyResult;
use crate::workflow::{OutcomeKind, TopicWorkflow, WorkflowOptions};
use std::sync::Arc;
use tributario_core::AppError;
use tributario_prompt::load_prompt;

fn options(max_generations: u32) -> WorkflowOptions {
    WorkflowOptions {
        max_generations,
        ..WorkflowOptions::default()
    }
}

#[tokio::test]
async fn test_useful_answer_stops_after_one_generation() {
    let retriever = StaticRetriever::new(tax_documents());
    let generator = CountingGenerator::answering(structured_answer());
    let hallucination = FixedGrader::new(true);
    let answer = FixedGrader::new(true);

    let workflow = workflow(
        retriever.clone(),
        generator.clone(),
        hallucination.clone(),
        answer.clone(),
    );
    let outcome = workflow.run(QUESTION, &options(3)).await.unwrap();

    assert_eq!(outcome.verify_result, Some(VerifyResult::Useful));
    assert_eq!(outcome.kind, OutcomeKind::Useful);
    assert!(outcome.verified);
    assert_eq!(generator.calls(), 1);
    assert_eq!(outcome.generations, 1);
    assert_eq!(hallucination.calls(), 1);
    assert_eq!(answer.calls(), 1);
    assert_eq!(outcome.documents.len(), 3);
    assert_eq!(outcome.citations.len(), 1);
    assert!(outcome.has_structure);
    assert!(outcome.flow.is_empty());
}

#[tokio::test]
async fn test_ungrounded_answer_regenerates_until_cap() {
    let generator = CountingGenerator::answering(structured_answer());
    let answer = FixedGrader::new(true);

    let workflow = workflow(
        StaticRetriever::new(tax_documents()),
        generator.clone(),
        FixedGrader::new(false),
        answer.clone(),
    );
    let outcome = workflow.run(QUESTION, &options(2)).await.unwrap();

    assert_eq!(outcome.verify_result, Some(VerifyResult::NotSupported));
    assert_eq!(generator.calls(), 2);
    assert_eq!(outcome.kind, OutcomeKind::Exhausted);
    assert!(!outcome.verified);
    // Best-effort answer is still returned.
    assert_eq!(outcome.generation, structured_answer().text);
    // Relevance is never asked about an ungrounded answer.
    assert_eq!(answer.calls(), 0);
}

#[tokio::test]
async fn test_off_topic_answer_regenerates_until_cap() {
    let generator = CountingGenerator::answering(structured_answer());

    let workflow = workflow(
        StaticRetriever::new(tax_documents()),
        generator.clone(),
        FixedGrader::new(true),
        FixedGrader::new(false),
    );
    let outcome = workflow.run(QUESTION, &options(3)).await.unwrap();

    assert_eq!(outcome.verify_result, Some(VerifyResult::NotUseful));
    assert_eq!(outcome.kind, OutcomeKind::Exhausted);
    assert_eq!(generator.calls(), 3);
}

#[tokio::test]
async fn test_empty_retrieval_still_generates() {
    let generator = CountingGenerator::answering(structured_answer());

    let workflow = workflow(
        StaticRetriever::new(Vec::new()),
        generator.clone(),
        FixedGrader::new(true),
        FixedGrader::new(true),
    );
    let outcome = workflow.run(QUESTION, &options(3)).await.unwrap();

    assert_eq!(generator.calls(), 1);
    assert_eq!(*generator.seen_documents.lock().unwrap(), vec![0]);
    assert!(outcome.citations.is_empty());
    assert!(!outcome.generation.is_empty());
    assert!(outcome.documents.is_empty());
}

#[tokio::test]
async fn test_empty_retrieval_with_model_generator_skips_model_call() {
    let client = ScriptedClient::new(&[]);
    let definition = load_prompt(None, "generation.answer").unwrap();
    let generator = LlmGenerator::new(StructuredChain::new(client.clone(), definition, "gpt-4o-mini"));

    let workflow = TopicWorkflow::new(
        retencion_profile(false),
        StaticRetriever::new(Vec::new()),
        Arc::new(generator),
        FixedGrader::new(true),
        FixedGrader::new(true),
    );
    let outcome = workflow.run(QUESTION, &options(3)).await.unwrap();

    assert_eq!(outcome.generation, NO_INFORMATION_ANSWER);
    assert!(outcome.citations.is_empty());
    assert_eq!(client.request_count(), 0);
}

#[tokio::test]
async fn test_generation_failure_ends_run_without_verify() {
    let hallucination = FixedGrader::new(true);

    let workflow = workflow(
        StaticRetriever::new(tax_documents()),
        CountingGenerator::failing(),
        hallucination.clone(),
        FixedGrader::new(true),
    );
    let outcome = workflow.run(QUESTION, &options(3)).await.unwrap();

    assert_eq!(outcome.kind, OutcomeKind::Failed);
    assert!(!outcome.verified);
    assert_eq!(outcome.verify_result, None);
    assert!(outcome.generation.starts_with("Error al generar respuesta:"));
    assert!(outcome.generation.contains("model timed out"));
    assert_eq!(hallucination.calls(), 0);
}

#[tokio::test]
async fn test_grader_failure_propagates() {
    let workflow = workflow(
        StaticRetriever::new(tax_documents()),
        CountingGenerator::answering(structured_answer()),
        FixedGrader::failing(),
        FixedGrader::new(true),
    );
    let result = workflow.run(QUESTION, &options(3)).await;

    assert!(matches!(result, Err(AppError::Grading(_))));
}

#[tokio::test]
async fn test_identical_runs_reach_identical_results() {
    let workflow = workflow(
        StaticRetriever::new(tax_documents()),
        CountingGenerator::answering(structured_answer()),
        FixedGrader::new(true),
        FixedGrader::new(false),
    );

    let first = workflow.run(QUESTION, &options(2)).await.unwrap();
    let second = workflow.run(QUESTION, &options(2)).await.unwrap();

    assert_eq!(first.verify_result, second.verify_result);
    assert_eq!(first.kind, second.kind);
    assert_eq!(first.generation, second.generation);
    assert_ne!(first.run_id, second.run_id);
}

#[tokio::test]
async fn test_debug_run_records_flow() {
    let workflow = workflow(
        StaticRetriever::new(tax_documents()),
        CountingGenerator::answering(structured_answer()),
        FixedGrader::new(false),
        FixedGrader::new(true),
    );
    let debug = WorkflowOptions {
        max_generations: 2,
        debug: true,
        grade_documents: false,
    };
    let outcome = workflow.run(QUESTION, &debug).await.unwrap();

    assert!(outcome.flow[0].starts_with("RETRIEVE: 3 documents from 'retencion'"));
    assert!(outcome.flow.iter().any(|line| line == "VERIFY: not_supported"));
    assert!(outcome.flow.last().unwrap().contains("giving up"));
}

#[tokio::test]
async fn test_document_grading_is_recorded_without_changing_flow() {
    let document_grader = FixedGrader::new(false);
    let workflow = workflow(
        StaticRetriever::new(tax_documents()),
        CountingGenerator::answering(structured_answer()),
        FixedGrader::new(true),
        FixedGrader::new(true),
    )
    .with_document_grader(document_grader.clone());

    let graded = WorkflowOptions {
        grade_documents: true,
        ..WorkflowOptions::default()
    };
    let outcome = workflow.run(QUESTION, &graded).await.unwrap();
    assert_eq!(outcome.documents_relevant, Some(false));
    assert_eq!(outcome.kind, OutcomeKind::Useful);

    let outcome = workflow.run(QUESTION, &WorkflowOptions::default()).await.unwrap();
    assert_eq!(outcome.documents_relevant, None);
    assert_eq!(document_grader.calls(), 1);
}

#[tokio::test]
async fn test_reranked_workflow_reorders_and_truncates() {
    let mut profile = retencion_profile(true);
    profile.top_k = 2;

    let workflow = TopicWorkflow::new(
        profile,
        StaticRetriever::new(tax_documents()),
        CountingGenerator::answering(structured_answer()),
        FixedGrader::new(true),
        FixedGrader::new(true),
    )
    .with_reranker(Arc::new(ReverseReranker));

    let outcome = workflow.run(QUESTION, &options(1)).await.unwrap();
    let sources: Vec<&str> = outcome.documents.iter().map(|d| d.source()).collect();
    assert_eq!(
        sources,
        vec!["Tabla retención 2024.pdf", "Concepto DIAN 100208192-202.pdf"]
    );
}

#[tokio::test]
async fn test_model_backed_components_reach_useful() {
    let client = ScriptedClient::new(&[
        r#"{"text": "REFERENCIA: Decreto 1625 [1]\nANÁLISIS: La tarifa es del 4% [1].", "citations": [{"document_title": "Decreto 1625 de 2016.pdf", "cited_text": "4%"}]}"#,
        r#"{"binary_score": "yes"}"#,
        r#"```json
{"binary_score": true}
```"#,
    ]);
    let chain = |id: &str, model: &str| {
        StructuredChain::new(client.clone(), load_prompt(None, id).unwrap(), model)
    };

    let workflow = TopicWorkflow::new(
        retencion_profile(false),
        StaticRetriever::new(tax_documents()),
        Arc::new(LlmGenerator::new(chain("generation.answer", "gpt-4o-mini")).with_topic("Retención en la Fuente")),
        Arc::new(LlmGrader::new(chain("grader.hallucination", "gpt-3.5-turbo"))),
        Arc::new(LlmGrader::new(chain("grader.answer", "gpt-3.5-turbo"))),
    );
    let outcome = workflow.run(QUESTION, &options(3)).await.unwrap();

    assert_eq!(outcome.kind, OutcomeKind::Useful);
    assert_eq!(outcome.citations[0].cited_text, "4%");
    assert!(outcome.has_structure);

    let requests = client.requests.lock().unwrap();
    assert_eq!(requests.len(), 3);
    assert!(requests.iter().all(|r| r.json_mode));
    assert!(requests[0].prompt.contains("[1] Decreto 1625 de 2016.pdf (Pág. 12)"));
    assert!(requests[0]
        .system
        .as_deref()
        .unwrap()
        .contains("especializado en Retención en la Fuente"));
    assert_eq!(requests[1].model, "gpt-3.5-turbo");
}
