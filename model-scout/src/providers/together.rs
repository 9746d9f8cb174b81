//! Together AI text completions.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{read_json, send, with_bearer, CompletionApi, CompletionRequest, ProviderError, ProviderResult};

const PROVIDER: &str = "together";

#[derive(Serialize, Debug)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    schema: &'a serde_json::Value,
}

#[derive(Serialize, Debug)]
struct CompletionBody<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
    response_format: ResponseFormat<'a>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize, Debug)]
struct CompletionReply {
    #[serde(default)]
    choices: Vec<Choice>,
}

pub struct TogetherClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl TogetherClient {
    pub fn new(http: Client, base_url: &str, api_key: Option<String>, model: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key,
            model: model.to_owned(),
        }
    }
}

#[async_trait]
impl CompletionApi for TogetherClient {
    async fn complete(&self, request: CompletionRequest) -> ProviderResult<String> {
        let body = CompletionBody {
            model: &self.model,
            prompt: &request.prompt,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
                schema: &request.schema,
            },
        };

        let call = self
            .http
            .post(format!("{}/v1/completions", self.base_url))
            .json(&body);
        let response = send(PROVIDER, with_bearer(call, self.api_key.as_deref())).await?;
        let reply: CompletionReply = read_json(response).await?;

        reply
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.text)
            .ok_or_else(|| ProviderError::Shape("completion has no choices".to_owned()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    pub fn completion_body_serde() {
        let schema = serde_json::json!({"type": "object"});
        let body = CompletionBody {
            model: "m",
            prompt: "p",
            max_tokens: 10,
            temperature: 0.5,
            response_format: ResponseFormat {
                kind: "json_object",
                schema: &schema,
            },
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"model":"m","prompt":"p","max_tokens":10,"temperature":0.5,"response_format":{"type":"json_object","schema":{"type":"object"}}}"#
        );
    }
}
