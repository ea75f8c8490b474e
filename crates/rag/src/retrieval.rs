//! Vector query service: Pinecone-backed document retrieval.
//!
//! Control plane: https://docs.pinecone.io/reference/api/control-plane
//! Data plane query: `POST https://{index-host}/query`

use crate::types::{Document, DocumentMetadata};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tributario_core::{AppError, AppResult};
use tributario_llm::EmbeddingClient;

pub const PINECONE_CONTROL_URL: &str = "https://api.pinecone.io";
pub const PINECONE_API_VERSION: &str = "2025-01";

/// Metadata keys that may hold the document text.
const TEXT_KEYS: [&str; 2] = ["text", "page_content"];

/// Given a query string, returns an ordered sequence of documents.
#[async_trait::async_trait]
pub trait VectorQueryService: Send + Sync {
    /// Name of the backing index
    fn index_name(&self) -> &str;

    /// Most similar documents first.
    async fn query(&self, text: &str) -> AppResult<Vec<Document>>;
}

/// An index as described by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescription {
    pub name: String,
    pub host: String,
}

#[derive(Debug, Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexDescription>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: Vec<f32>,
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Build the shared Pinecone HTTP client.
pub(crate) fn pinecone_http_client(timeout: Duration) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Retrieval(format!("Failed to build HTTP client: {}", e)))
}

/// Pinecone control-plane client (index listing and lookup).
pub struct PineconeControl {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl PineconeControl {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        Ok(Self {
            base_url: PINECONE_CONTROL_URL.to_string(),
            api_key: api_key.into(),
            client: pinecone_http_client(timeout)?,
        })
    }

    /// List all indexes in the project.
    pub async fn list_indexes(&self) -> AppResult<Vec<IndexDescription>> {
        let url = format!("{}/indexes", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", PINECONE_API_VERSION)
            .send()
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to list Pinecone indexes: {}", e)))?;

        let list: IndexList = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to parse index list: {}", e)))?;

        Ok(list.indexes)
    }
}

/// Choose between the wanted index and the default.
///
/// Returns the wanted name when it exists, otherwise the default.
pub fn choose_index<'a>(available: &[String], wanted: &'a str, default: &'a str) -> &'a str {
    if available.iter().any(|name| name == wanted) {
        wanted
    } else {
        default
    }
}

/// Pick `wanted` from the listed indexes, falling back to `default` when the
/// topic index does not exist. Fails if neither exists.
pub fn resolve_index(
    available: &[IndexDescription],
    wanted: &str,
    default: &str,
) -> AppResult<IndexDescription> {
    let names: Vec<String> = available.iter().map(|i| i.name.clone()).collect();

    let chosen = choose_index(&names, wanted, default);
    if chosen != wanted {
        tracing::info!(
            "Index '{}' not found, using general index '{}'",
            wanted,
            default
        );
    }

    available
        .iter()
        .find(|i| i.name == chosen)
        .cloned()
        .ok_or_else(|| {
            AppError::Retrieval(format!(
                "Neither index '{}' nor default index '{}' exists",
                wanted, default
            ))
        })
}

/// Vector query service over one Pinecone index.
pub struct PineconeStore {
    index: IndexDescription,
    api_key: String,
    namespace: Option<String>,
    top_k: usize,
    embedder: Arc<dyn EmbeddingClient>,
    client: reqwest::Client,
}

impl PineconeStore {
    pub fn new(
        index: IndexDescription,
        api_key: impl Into<String>,
        embedder: Arc<dyn EmbeddingClient>,
        top_k: usize,
        timeout: Duration,
    ) -> AppResult<Self> {
        Ok(Self {
            index,
            api_key: api_key.into(),
            namespace: None,
            top_k,
            embedder,
            client: pinecone_http_client(timeout)?,
        })
    }

    pub fn with_namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace;
        self
    }

    fn query_url(&self) -> String {
        if self.index.host.starts_with("http://") || self.index.host.starts_with("https://") {
            format!("{}/query", self.index.host.trim_end_matches('/'))
        } else {
            format!("https://{}/query", self.index.host)
        }
    }
}

#[async_trait::async_trait]
impl VectorQueryService for PineconeStore {
    fn index_name(&self) -> &str {
        &self.index.name
    }

    async fn query(&self, text: &str) -> AppResult<Vec<Document>> {
        let vector = self
            .embedder
            .embed(text)
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to embed query: {}", e)))?;

        let body = QueryRequest {
            vector,
            top_k: self.top_k,
            include_metadata: true,
            include_values: false,
            namespace: self.namespace.as_deref(),
        };

        let response = self
            .client
            .post(self.query_url())
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", PINECONE_API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to query Pinecone: {}", e)))?;

        let response: QueryResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to parse Pinecone query: {}", e)))?;

        let documents: Vec<Document> = response
            .matches
            .into_iter()
            .map(|m| match_to_document(m.id, m.metadata.unwrap_or_default()))
            .collect();

        tracing::debug!(
            "Pinecone index '{}' returned {} documents",
            self.index.name,
            documents.len()
        );

        Ok(documents)
    }
}

async fn check_status(response: reqwest::Response) -> AppResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(AppError::Retrieval(format!(
        "Pinecone API error ({}): {}",
        status, error_text
    )))
}

/// Split a match's metadata into document text, source, page and the rest.
fn match_to_document(id: String, mut metadata: serde_json::Map<String, serde_json::Value>) -> Document {
    let text = TEXT_KEYS
        .iter()
        .find_map(|key| match metadata.remove(*key) {
            Some(serde_json::Value::String(s)) => Some(s),
            _ => None,
        })
        .unwrap_or_default();

    let source = match metadata.remove("source") {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) if !other.is_null() => Some(other.to_string()),
        _ => None,
    };

    // Pinecone stores numbers as floats ("page": 3.0).
    let page = metadata
        .remove("page")
        .and_then(|v| v.as_u64().or_else(|| v.as_f64().map(|f| f as u64)))
        .and_then(|p| u32::try_from(p).ok());

    if text.is_empty() {
        tracing::warn!("Vector '{}' has no text metadata", id);
    }

    Document {
        text,
        metadata: DocumentMetadata {
            source,
            page,
            extra: metadata,
        },
    }
}
