//! Tax-law topics and their retrieval profiles.

use serde::{Deserialize, Serialize};
use tributario_core::{AppConfig, AppError, AppResult};

/// A tax-law subdomain with its own document index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    /// Retención en la fuente (withholding tax)
    Retencion,
    /// Customs
    Aduanas,
    /// Foreign exchange regime
    Cambiario,
    /// Impuesto nacional al consumo
    Ipoconsumo,
    /// Anything else, greetings and ambiguous queries
    General,
}

impl Topic {
    pub const ALL: [Topic; 5] = [
        Topic::Retencion,
        Topic::Aduanas,
        Topic::Cambiario,
        Topic::Ipoconsumo,
        Topic::General,
    ];

    /// Routing label, also the conventional index name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Retencion => "retencion",
            Self::Aduanas => "aduanas",
            Self::Cambiario => "cambiario",
            Self::Ipoconsumo => "ipoconsumo",
            Self::General => "general",
        }
    }

    /// Name shown to users.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Retencion => "Retención en la Fuente",
            Self::Aduanas => "Aduanas",
            Self::Cambiario => "Cambiario",
            Self::Ipoconsumo => "Impuesto al Consumo",
            Self::General => "General",
        }
    }

    /// Strict parse of a label or a known alias.
    pub fn from_label(label: &str) -> Option<Self> {
        match normalize(label).as_str() {
            "retencion" | "retencion en la fuente" | "retefuente" | "withholding" => {
                Some(Self::Retencion)
            }
            "aduanas" | "aduana" | "customs" => Some(Self::Aduanas),
            "cambiario" | "regimen cambiario" | "exchange" => Some(Self::Cambiario),
            "ipoconsumo" | "impuesto al consumo" | "impuesto nacional al consumo" | "consumo" => {
                Some(Self::Ipoconsumo)
            }
            "general" => Some(Self::General),
            _ => None,
        }
    }

    /// Lenient parse for router output: anything unrecognized is `General`.
    pub fn from_route_label(label: &str) -> Self {
        Self::from_label(label).unwrap_or(Self::General)
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Topic {
    type Err = AppError;

    fn from_str(s: &str) -> AppResult<Self> {
        Self::from_label(s).ok_or_else(|| {
            AppError::Other(format!(
                "Unknown topic '{}'. Expected one of: {}",
                s,
                Self::ALL.map(|t| t.label()).join(", ")
            ))
        })
    }
}

/// Lowercase, strip accents, quotes and separators.
fn normalize(label: &str) -> String {
    label
        .trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '.')
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' => 'a',
            'é' => 'e',
            'í' => 'i',
            'ó' => 'o',
            'ú' | 'ü' => 'u',
            '_' | '-' => ' ',
            other => other,
        })
        .collect()
}

/// Per-topic workflow parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicProfile {
    pub topic: Topic,

    /// Index queried for this topic (before existence fallback)
    pub index: String,

    /// Whether retrieval goes through the reranker
    pub rerank: bool,

    /// Documents kept after reranking
    pub top_k: usize,
}

impl TopicProfile {
    /// Resolve a topic's profile from configuration.
    ///
    /// Index name: configured override, else the topic label for the four
    /// specialized topics, else the default index for `General`.
    pub fn for_topic(topic: Topic, config: &AppConfig) -> Self {
        let index = match config.index_override(topic.label()) {
            Some(index) => index.to_string(),
            None if topic == Topic::General => config.retrieval.default_index.clone(),
            None => topic.label().to_string(),
        };

        Self {
            topic,
            index,
            rerank: topic != Topic::General && config.retrieval.reranker != "none",
            top_k: config.retrieval.rerank_top_k,
        }
    }
}
