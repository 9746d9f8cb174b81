//! README feature extraction and one-line summaries.

use async_trait::async_trait;
use log::warn;
use serde::Deserialize;
use serde_json::{json, Value};

use super::decode::{decode, Decoded};
use super::{CompletionHandle, ModelEnricher, RegistryHandle};
use crate::api_types::ModelInfo;
use crate::providers::CompletionRequest;

/// Features at or below this confidence are dropped.
pub const CONFIDENCE_THRESHOLD: f64 = 0.6;

pub const FAILURE_SUMMARY: &str = "Summary unavailable.";

/// README text beyond this many characters is not sent to the completion model.
const README_CHARS: usize = 6000;

/// Result of enriching a single model.
#[derive(Debug, Clone, PartialEq)]
pub struct Enrichment {
    pub features: Vec<String>,
    pub summary: String,
}

impl Enrichment {
    pub fn failed() -> Self {
        Self {
            features: Vec::new(),
            summary: FAILURE_SUMMARY.to_owned(),
        }
    }

    /// Write the extracted text onto the model, replacing the registry tags.
    pub fn apply(self, model: &mut ModelInfo) {
        model.features = self.features.join(", ");
        model.details = self.summary;
    }
}

#[derive(Deserialize, Debug)]
struct ExtractedFeature {
    name: String,
    confidence: f64,
}

#[derive(Deserialize, Debug)]
struct ExtractionReply {
    #[serde(default)]
    features: Vec<ExtractedFeature>,
    summary: String,
}

impl From<ExtractionReply> for Enrichment {
    fn from(value: ExtractionReply) -> Self {
        let features = value
            .features
            .into_iter()
            .filter(|feature| feature.confidence > CONFIDENCE_THRESHOLD)
            .map(|feature| feature.name.trim().to_owned())
            .filter(|name| !name.is_empty())
            .collect();

        let summary = match value.summary.trim() {
            "" => FAILURE_SUMMARY.to_owned(),
            summary => summary.to_owned(),
        };

        Self { features, summary }
    }
}

fn extraction_prompt(model_id: &str, raw: &str) -> String {
    format!(
        "Below is the model card of the language model \"{model_id}\".\n\
         List its notable capabilities as short feature names, each with a confidence between 0 \
         and 1 that the card really supports it, and write one sentence summarizing what sets \
         this model apart from similar models. Answer only with JSON of the form \
         {{\"features\": [{{\"name\": \"...\", \"confidence\": 0.9}}], \"summary\": \"...\"}}.\n\n\
         ---\n{raw}\n---"
    )
}

fn extraction_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "features": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": {"type": "string"},
                        "confidence": {"type": "number", "minimum": 0, "maximum": 1}
                    },
                    "required": ["name", "confidence"]
                }
            },
            "summary": {"type": "string"}
        },
        "required": ["features", "summary"]
    })
}

/// [ModelEnricher] that reads the README from the registry and asks a completion model about it.
pub struct FeatureEnricher {
    completion: CompletionHandle,
    registry: RegistryHandle,
}

impl FeatureEnricher {
    pub fn new(completion: CompletionHandle, registry: RegistryHandle) -> Self {
        Self {
            completion,
            registry,
        }
    }

    async fn raw_text(&self, model: &ModelInfo) -> String {
        match self.registry.fetch_readme(&model.name).await {
            Ok(readme) if !readme.trim().is_empty() => readme.chars().take(README_CHARS).collect(),
            Ok(_) => model.features.clone(),
            Err(err) => {
                warn!("no README for {}: {}", model.name, err);
                model.features.clone()
            }
        }
    }
}

#[async_trait]
impl ModelEnricher for FeatureEnricher {
    async fn enrich(&self, model: &ModelInfo) -> Enrichment {
        let raw = self.raw_text(model).await;
        let request = CompletionRequest {
            prompt: extraction_prompt(&model.name, &raw),
            schema: extraction_schema(),
            max_tokens: 400,
            temperature: 0.2,
        };

        let text = match self.completion.complete(request).await {
            Ok(text) => text,
            Err(err) => {
                warn!("enrichment of {} failed: {}", model.name, err);
                return Enrichment::failed();
            }
        };

        match decode::<ExtractionReply>(&text) {
            Decoded::Valid(reply) => reply.into(),
            Decoded::Invalid(reason) => {
                warn!("enrichment of {} returned invalid JSON: {}", model.name, reason);
                Enrichment::failed()
            }
        }
    }
}
