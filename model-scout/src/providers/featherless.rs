//! Featherless model listing. Only the OpenAI-style `{ "data": [...] }` envelope is accepted.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::{read_json, send, with_bearer, CatalogEntry, ListingApi, ProviderError, ProviderResult};

const PROVIDER: &str = "featherless";

#[derive(Deserialize, Debug)]
struct ListedModel {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    available: Option<bool>,
    #[serde(flatten)]
    rest: serde_json::Map<String, Value>,
}

impl From<ListedModel> for CatalogEntry {
    fn from(value: ListedModel) -> Self {
        Self {
            name: value.name.unwrap_or_else(|| value.id.clone()),
            id: value.id,
            // Being listed at all means the host serves it.
            available: value.available.unwrap_or(true),
            metadata: Value::Object(value.rest),
        }
    }
}

/// Validate the listing envelope and map its entries.
pub fn parse_listing(body: Value) -> ProviderResult<Vec<CatalogEntry>> {
    let data = match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(data)) => data,
            _ => return Err(ProviderError::Shape("listing has no `data` array".to_owned())),
        },
        _ => return Err(ProviderError::Shape("listing is not an object".to_owned())),
    };

    data.into_iter()
        .map(|entry| {
            serde_json::from_value::<ListedModel>(entry)
                .map(CatalogEntry::from)
                .map_err(|err| ProviderError::Shape(err.to_string()))
        })
        .collect()
}

pub struct FeatherlessClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl FeatherlessClient {
    pub fn new(http: Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key,
        }
    }
}

#[async_trait]
impl ListingApi for FeatherlessClient {
    async fn list_models(&self) -> ProviderResult<Vec<CatalogEntry>> {
        let call = self.http.get(format!("{}/v1/models", self.base_url));
        let response = send(PROVIDER, with_bearer(call, self.api_key.as_deref())).await?;
        parse_listing(read_json(response).await?)
    }
}
