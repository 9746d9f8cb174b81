//! HuggingFace Hub model search and README retrieval.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::{read_json, send, with_bearer, ProviderResult, RegistryApi};

const PROVIDER: &str = "huggingface";

/// Only models that can serve text generation are candidates.
pub const TEXT_GENERATION: &str = "text-generation";

const EXPAND: [&str; 7] = [
    "downloads",
    "likes",
    "lastModified",
    "tags",
    "private",
    "safetensors",
    "cardData",
];

/// Parameters of one registry search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySearch {
    pub keyword: String,
    pub limit: u32,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SafetensorsInfo {
    #[serde(default)]
    pub total: Option<f64>,
}

/// Raw registry record, as returned by `GET /api/models`.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HubModel {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub downloads: u64,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub safetensors: Option<SafetensorsInfo>,
    #[serde(default)]
    pub card_data: Option<Value>,
}

impl HubModel {
    /// The registry sends `id`, `modelId`, or both depending on the query.
    pub fn identifier(&self) -> Option<&str> {
        self.id.as_deref().or(self.model_id.as_deref())
    }
}

pub struct HuggingFaceClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HuggingFaceClient {
    pub fn new(http: Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key,
        }
    }
}

#[async_trait]
impl RegistryApi for HuggingFaceClient {
    async fn search_models(&self, search: &RegistrySearch) -> ProviderResult<Vec<HubModel>> {
        let limit = search.limit.to_string();
        let mut query = vec![
            ("search", search.keyword.as_str()),
            ("filter", TEXT_GENERATION),
            ("sort", "downloads"),
            ("direction", "-1"),
            ("limit", limit.as_str()),
        ];
        query.extend(EXPAND.iter().map(|field| ("expand[]", *field)));

        let call = self
            .http
            .get(format!("{}/api/models", self.base_url))
            .query(&query);
        let response = send(PROVIDER, with_bearer(call, self.api_key.as_deref())).await?;
        let models: Vec<HubModel> = read_json(response).await?;

        Ok(models.into_iter().filter(|model| !model.private).collect())
    }

    async fn fetch_readme(&self, model_id: &str) -> ProviderResult<String> {
        let call = self
            .http
            .get(format!("{}/{}/raw/main/README.md", self.base_url, model_id));
        let response = send(PROVIDER, with_bearer(call, self.api_key.as_deref())).await?;
        Ok(response.text().await?)
    }
}
