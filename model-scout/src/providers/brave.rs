//! Brave web search, used to attach contextual sources to a result.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use super::{read_json, send, ProviderResult, WebSearchApi};
use crate::api_types::{DomainAuthority, SourceInfo};

const PROVIDER: &str = "brave";

/// Descriptions are cut to this many characters.
const DESCRIPTION_CHARS: usize = 50;

#[derive(Deserialize, Debug, Default)]
struct MetaUrl {
    #[serde(default)]
    hostname: Option<String>,
}

#[derive(Deserialize, Debug)]
struct WebResult {
    title: String,
    url: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    page_age: Option<String>,
    #[serde(default)]
    meta_url: Option<MetaUrl>,
    #[serde(default)]
    rank: Option<u64>,
    #[serde(default)]
    backlinks: Option<u64>,
    #[serde(default)]
    age_days: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
struct WebResults {
    #[serde(default)]
    results: Vec<WebResult>,
}

#[derive(Deserialize, Debug)]
struct SearchReply {
    #[serde(default)]
    web: WebResults,
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

impl From<WebResult> for SourceInfo {
    fn from(value: WebResult) -> Self {
        let domain = value
            .meta_url
            .and_then(|meta| meta.hostname)
            .or_else(|| {
                Url::parse(&value.url)
                    .ok()
                    .and_then(|url| url.host_str().map(str::to_owned))
            })
            .unwrap_or_default();

        Self {
            title: value.title,
            description: truncate_chars(&value.description, DESCRIPTION_CHARS),
            url: value.url,
            domain,
            published_date: value.page_age,
            domain_authority: DomainAuthority {
                rank: value.rank,
                backlinks: value.backlinks,
                age_days: value.age_days,
            },
        }
    }
}

pub struct BraveClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl BraveClient {
    pub fn new(http: Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key,
        }
    }
}

#[async_trait]
impl WebSearchApi for BraveClient {
    async fn search(&self, query: &str, count: usize) -> ProviderResult<Vec<SourceInfo>> {
        let count_param = count.to_string();
        let mut call = self
            .http
            .get(format!("{}/res/v1/web/search", self.base_url))
            .header("Accept", "application/json")
            .query(&[
                ("q", query),
                ("count", count_param.as_str()),
                ("result_filter", "web"),
            ]);
        if let Some(key) = &self.api_key {
            call = call.header("X-Subscription-Token", key);
        }

        let response = send(PROVIDER, call).await?;
        let reply: SearchReply = read_json(response).await?;

        Ok(reply
            .web
            .results
            .into_iter()
            .take(count)
            .map(SourceInfo::from)
            .collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    pub fn maps_web_results() {
        let reply: SearchReply = serde_json::from_str(
            r#"
            {
                "web": {
                    "results": [
                        {
                            "title": "Fine-tuning Llama 3 for clinical notes",
                            "url": "https://example.org/blog/llama3-clinical",
                            "description": "A walkthrough of adapting an open model to summarize discharge letters.",
                            "page_age": "2024-06-01T00:00:00",
                            "meta_url": {"hostname": "example.org"}
                        },
                        {
                            "title": "No meta",
                            "url": "https://huggingface.co/blog/x",
                            "rank": 7
                        }
                    ]
                }
            }
        "#,
        )
        .unwrap();

        let sources: Vec<SourceInfo> = reply.web.results.into_iter().map(SourceInfo::from).collect();
        assert_eq!(sources[0].domain, "example.org");
        assert_eq!(sources[0].description.chars().count(), DESCRIPTION_CHARS);
        assert_eq!(sources[0].published_date.as_deref(), Some("2024-06-01T00:00:00"));
        assert_eq!(sources[1].domain, "huggingface.co");
        assert_eq!(sources[1].domain_authority.rank, Some(7));
        assert_eq!(sources[1].description, "");
    }

    #[test]
    pub fn missing_web_section_is_empty() {
        let reply: SearchReply = serde_json::from_str(r#"{"type": "search"}"#).unwrap();
        assert!(reply.web.results.is_empty());
    }
}
