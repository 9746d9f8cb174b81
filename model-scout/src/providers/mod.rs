//! Thin HTTP clients for every upstream the search pipeline talks to.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;

use crate::api_types::SourceInfo;

pub mod brave;
pub mod featherless;
pub mod huggingface;
pub mod together;

/// Failure of a single upstream call.
#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    /// The request never produced a usable response (connect, timeout, body read).
    #[error("request failed: {0}")]
    Transport(
        #[from]
        #[source]
        reqwest::Error,
    ),

    /// The upstream answered with a non-2xx status.
    #[error("{provider} returned status {status}")]
    Status { provider: &'static str, status: u16 },

    /// The body did not match the contract we expect from this upstream.
    #[error("unexpected response shape: {0}")]
    Shape(String),
}

impl ProviderError {
    /// Network errors and 5xx answers are worth another attempt, everything else is final.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Transport(err) => !err.is_decode() && !err.is_builder(),
            ProviderError::Status { status, .. } => (500..600).contains(status),
            ProviderError::Shape(_) => false,
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Build the shared client used by every provider.
pub fn http_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("model-scout/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Attach a bearer token when one is configured. Missing credentials are not an error here,
/// the upstream rejects the call and the caller degrades.
pub(crate) fn with_bearer(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

/// Send the request and turn non-2xx answers into [ProviderError::Status].
pub(crate) async fn send(provider: &'static str, request: RequestBuilder) -> ProviderResult<Response> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::Status {
            provider,
            status: status.as_u16(),
        });
    }
    Ok(response)
}

/// Read a 2xx body as `T`. Bodies that fail to decode are shape errors, not transport errors.
pub(crate) async fn read_json<T: for<'de> Deserialize<'de>>(response: Response) -> ProviderResult<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|err| ProviderError::Shape(err.to_string()))
}

/// Request body for a schema-constrained text completion.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    /// JSON schema the completion text must satisfy.
    pub schema: serde_json::Value,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// A hosted text-completion model.
#[async_trait]
pub trait CompletionApi {
    /// Returns the raw text of the first completion choice.
    async fn complete(&self, request: CompletionRequest) -> ProviderResult<String>;
}

/// A model registry that can be searched by free text.
#[async_trait]
pub trait RegistryApi {
    async fn search_models(
        &self,
        search: &huggingface::RegistrySearch,
    ) -> ProviderResult<Vec<huggingface::HubModel>>;

    /// Raw README text of one model repository.
    async fn fetch_readme(&self, model_id: &str) -> ProviderResult<String>;
}

/// One entry of the inference host's model listing.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    pub available: bool,
    pub metadata: serde_json::Value,
}

/// The inference host's listing of servable models.
#[async_trait]
pub trait ListingApi {
    async fn list_models(&self) -> ProviderResult<Vec<CatalogEntry>>;
}

/// A web search engine used for contextual sources.
#[async_trait]
pub trait WebSearchApi {
    async fn search(&self, query: &str, count: usize) -> ProviderResult<Vec<SourceInfo>>;
}
