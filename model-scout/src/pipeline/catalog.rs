//! Registry lookup: one search per keyword, mapped onto [ModelInfo].

use std::collections::HashSet;

use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use super::{ModelCatalog, RegistryHandle};
use crate::api_types::{ModelInfo, TrainingMetrics, UNKNOWN};
use crate::providers::huggingface::{HubModel, RegistrySearch};

static SIZE_IN_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[^a-z0-9.])((?:\d+x)?\d+(?:\.\d+)?)([bm])(?:$|[^a-z0-9])")
        .expect("size pattern is valid")
});

/// Format a raw parameter count as `7.0B`, `3.5M` or `12.0K`.
pub fn format_param_count(count: Option<f64>) -> String {
    let count = match count {
        Some(count) if count.is_finite() && count > 0.0 => count,
        _ => return UNKNOWN.to_owned(),
    };

    // Choose the unit after rounding to tenths, so 999.96M reads as 1.0B.
    for (scale, unit) in [(1e9, "B"), (1e6, "M"), (1e3, "K")] {
        let tenths = (count / scale * 10.0).round();
        if tenths >= 10.0 {
            return format!("{:.1}{}", tenths / 10.0, unit);
        }
    }
    format!("{}", count.round() as u64)
}

/// Guess a size label from names like `Llama-3-8B` or `Mixtral-8x7b-v0.1`.
pub fn size_from_identifier(identifier: &str) -> Option<String> {
    let captures = SIZE_IN_NAME.captures(identifier)?;
    Some(format!(
        "{}{}",
        captures[1].to_lowercase(),
        captures[2].to_uppercase()
    ))
}

fn is_instruct(identifier: &str, tags: &[String]) -> bool {
    identifier.to_lowercase().contains("instruct")
        || tags.iter().any(|tag| tag.to_lowercase().contains("instruct"))
}

fn first_dataset(card: &Value) -> Option<String> {
    match card.get("datasets")? {
        Value::String(name) if !name.is_empty() => Some(name.clone()),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .find(|name| !name.is_empty())
            .map(str::to_owned),
        _ => None,
    }
}

fn training_metrics(card: &Value) -> Option<TrainingMetrics> {
    let mut metrics = TrainingMetrics::default();
    let entries = card.get("model-index")?.as_array()?;

    let reported = entries
        .iter()
        .filter_map(|entry| entry.get("results")?.as_array())
        .flatten()
        .filter_map(|result| result.get("metrics")?.as_array())
        .flatten();

    for metric in reported {
        let Some(value) = metric.get("value").and_then(Value::as_f64) else {
            continue;
        };
        let label = ["type", "name"]
            .iter()
            .filter_map(|key| metric.get(*key).and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        if label.contains("perplexity") {
            metrics.perplexity.get_or_insert(value);
        } else if label.contains("loss") {
            metrics.loss.get_or_insert(value);
        }
    }

    (!metrics.is_empty()).then_some(metrics)
}

fn normalize_timestamp(raw: Option<&str>) -> String {
    raw.and_then(|raw| OffsetDateTime::parse(raw, &Rfc3339).ok())
        .and_then(|ts| ts.format(&Rfc3339).ok())
        .unwrap_or_default()
}

/// Map one registry record. Records without an identifier are dropped.
pub fn to_model_info(raw: HubModel) -> Option<ModelInfo> {
    let identifier = raw.identifier()?.to_owned();
    let mut model = ModelInfo::named(identifier.clone());

    let counted = raw.safetensors.as_ref().and_then(|info| info.total);
    model.size = match format_param_count(counted) {
        label if label != UNKNOWN => label,
        _ => size_from_identifier(&identifier).unwrap_or_else(|| UNKNOWN.to_owned()),
    };
    model.instruct = is_instruct(&identifier, &raw.tags);
    model.downloads = raw.downloads;
    model.likes = raw.likes;
    model.last_updated = normalize_timestamp(raw.last_modified.as_deref());
    if let Some(card) = &raw.card_data {
        if let Some(dataset) = first_dataset(card) {
            model.dataset = dataset;
        }
        model.training_metrics = training_metrics(card);
    }
    // Until enrichment replaces it, the tag list is the best feature summary we have.
    model.features = raw.tags.join(", ");

    Some(model)
}

/// Keep the first occurrence of every identifier, compared case-insensitively.
pub fn dedupe_by_identifier(models: Vec<ModelInfo>) -> Vec<ModelInfo> {
    let mut seen = HashSet::new();
    models
        .into_iter()
        .filter(|model| seen.insert(model.name.to_lowercase()))
        .collect()
}

/// [ModelCatalog] over a model registry.
pub struct HubCatalog {
    registry: RegistryHandle,
    limit: u32,
}

impl HubCatalog {
    pub fn new(registry: RegistryHandle, limit: u32) -> Self {
        Self { registry, limit }
    }
}

#[async_trait]
impl ModelCatalog for HubCatalog {
    async fn find_models(&self, keywords: &[String]) -> Vec<ModelInfo> {
        let searches = keywords.iter().map(|keyword| {
            let search = RegistrySearch {
                keyword: keyword.clone(),
                limit: self.limit,
            };
            async move {
                match self.registry.search_models(&search).await {
                    Ok(found) => {
                        debug!("keyword {:?} matched {} models", search.keyword, found.len());
                        found
                    }
                    Err(err) => {
                        warn!("registry search for {:?} failed: {}", search.keyword, err);
                        Vec::new()
                    }
                }
            }
        });

        // join_all keeps keyword order, so results stay grouped per keyword.
        let models = join_all(searches)
            .await
            .into_iter()
            .flatten()
            .filter_map(to_model_info)
            .collect();

        dedupe_by_identifier(models)
    }
}
