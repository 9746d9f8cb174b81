use async_trait::async_trait;
use log::warn;

use super::{SourceSearch, WebSearchHandle};
use crate::api_types::SourceInfo;

pub const MAX_SOURCES: usize = 5;

/// Steers generic web results toward model pages and write-ups.
const QUERY_SUFFIX: &str = " HuggingFace LLM Llama";

/// [SourceSearch] over a web search engine, capped at [MAX_SOURCES] results.
pub struct WebSources {
    api: WebSearchHandle,
}

impl WebSources {
    pub fn new(api: WebSearchHandle) -> Self {
        Self { api }
    }
}

#[async_trait]
impl SourceSearch for WebSources {
    async fn search_sources(&self, query: &str) -> Vec<SourceInfo> {
        let query = format!("{}{}", query, QUERY_SUFFIX);
        match self.api.search(&query, MAX_SOURCES).await {
            Ok(mut sources) => {
                sources.truncate(MAX_SOURCES);
                sources
            }
            Err(err) => {
                warn!("web source search failed: {}", err);
                Vec::new()
            }
        }
    }
}
