//! Types exchanged with the browser UI over `/api/search`.

use serde::{Deserialize, Serialize};

/// Value used for any catalog attribute the registry could not provide.
pub const UNKNOWN: &str = "Unknown";

/// Query string accepted by the search endpoint.
#[derive(Deserialize, Debug, Default)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// Optional training metrics scraped from a model card's `model-index`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct TrainingMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loss: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perplexity: Option<f64>,
}

impl TrainingMetrics {
    pub fn is_empty(&self) -> bool {
        self.loss.is_none() && self.perplexity.is_none()
    }
}

/// One candidate model in the comparison table.
///
/// Built from a registry record, then mutated in place by the enrichment and
/// availability stages before being partitioned into the response.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// Registry-qualified identifier, e.g. `meta-llama/Meta-Llama-3-8B`.
    pub name: String,
    /// Comma-separated extracted capabilities.
    pub features: String,
    pub dataset: String,
    /// Parameter size label such as `7.0B`, or [UNKNOWN].
    pub size: String,
    pub instruct: bool,
    /// One-sentence comparative summary.
    pub details: String,
    pub featherless_available: bool,
    pub downloads: u64,
    pub likes: u64,
    /// RFC 3339 timestamp of the last registry update, empty when unknown.
    pub last_updated: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_metrics: Option<TrainingMetrics>,
}

impl ModelInfo {
    /// A bare entry with every attribute defaulted, used as the base for registry mapping.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            features: String::new(),
            dataset: UNKNOWN.to_owned(),
            size: UNKNOWN.to_owned(),
            instruct: false,
            details: String::new(),
            featherless_available: false,
            downloads: 0,
            likes: 0,
            last_updated: String::new(),
            training_metrics: None,
        }
    }
}

/// Authority metrics reported by the web search provider for a result's domain.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DomainAuthority {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backlinks: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_days: Option<u64>,
}

/// One contextual web result shown next to the comparison table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub title: String,
    pub url: String,
    pub description: String,
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    pub domain_authority: DomainAuthority,
}

/// Full reply to one search query.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub llama3_models: Vec<ModelInfo>,
    pub alternatives: Vec<ModelInfo>,
    pub search_terms: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SourceInfo>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_owned(),
        }
    }
}
