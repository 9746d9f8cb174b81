//! Turns a free-text use case into registry search keywords.

use async_trait::async_trait;
use log::{debug, warn};
use serde_json::{json, Value};

use super::decode::{decode, Decoded};
use super::{CompletionHandle, KeywordSource};
use crate::providers::CompletionRequest;

pub const MAX_KEYWORDS: usize = 5;

fn keyword_prompt(query: &str) -> String {
    format!(
        "You help people find open AI language models on the HuggingFace Hub.\n\
         Use case: \"{query}\"\n\
         Give 3 to 5 short search terms (one or two words each) that would find models suited to \
         this use case. Answer only with JSON of the form {{\"keyword\": [\"term\", ...]}}."
    )
}

fn keyword_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "keyword": {
                "type": "array",
                "items": {"type": "string"},
                "minItems": 1,
                "maxItems": MAX_KEYWORDS
            }
        },
        "required": ["keyword"]
    })
}

/// Pull the keyword array out of a decoded reply. A missing or mistyped field yields no terms.
pub fn extract_keywords(reply: &Value) -> Vec<String> {
    let terms = reply.get("keyword").or_else(|| reply.get("terms"));
    let Some(Value::Array(terms)) = terms else {
        return Vec::new();
    };

    terms
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(str::to_owned)
        .take(MAX_KEYWORDS)
        .collect()
}

pub struct KeywordGenerator {
    completion: CompletionHandle,
}

impl KeywordGenerator {
    pub fn new(completion: CompletionHandle) -> Self {
        Self { completion }
    }
}

#[async_trait]
impl KeywordSource for KeywordGenerator {
    async fn generate_keywords(&self, query: &str) -> Vec<String> {
        let request = CompletionRequest {
            prompt: keyword_prompt(query),
            schema: keyword_schema(),
            max_tokens: 100,
            temperature: 0.7,
        };

        let keywords = match self.completion.complete(request).await {
            Ok(text) => match decode::<Value>(&text) {
                Decoded::Valid(reply) => extract_keywords(&reply),
                Decoded::Invalid(reason) => {
                    warn!("keyword completion was not valid JSON: {}", reason);
                    Vec::new()
                }
            },
            Err(err) => {
                warn!("keyword completion failed: {}", err);
                Vec::new()
            }
        };

        if keywords.is_empty() {
            debug!("falling back to the raw query as the only keyword");
            return vec![query.to_owned()];
        }
        keywords
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::providers::{CompletionApi, ProviderError, ProviderResult};

    struct Canned(Result<&'static str, u16>);

    #[async_trait]
    impl CompletionApi for Canned {
        async fn complete(&self, _request: CompletionRequest) -> ProviderResult<String> {
            match self.0 {
                Ok(text) => Ok(text.to_owned()),
                Err(status) => Err(ProviderError::Status {
                    provider: "test",
                    status,
                }),
            }
        }
    }

    fn generator(reply: Result<&'static str, u16>) -> KeywordGenerator {
        KeywordGenerator::new(Arc::new(Canned(reply)))
    }

    #[tokio::test]
    async fn uses_keyword_array() {
        let keywords = generator(Ok(r#"{"keyword": ["medical", " summarization ", ""]}"#))
            .generate_keywords("summarize medical texts")
            .await;
        assert_eq!(keywords, vec!["medical", "summarization"]);
    }

    #[tokio::test]
    async fn accepts_terms_alias_and_caps_length() {
        let keywords = generator(Ok(r#"{"terms": ["a", "b", "c", "d", "e", "f"]}"#))
            .generate_keywords("q")
            .await;
        assert_eq!(keywords.len(), MAX_KEYWORDS);
    }

    #[tokio::test]
    async fn falls_back_to_query() {
        let query = "summarize medical texts";
        for reply in [
            Err(503),
            Ok("definitely not json"),
            Ok(r#"{"keyword": "medical"}"#),
            Ok(r#"{"other": ["medical"]}"#),
            Ok(r#"{"keyword": []}"#),
        ] {
            assert_eq!(generator(reply).generate_keywords(query).await, vec![query]);
        }
    }

    #[test]
    pub fn non_string_terms_are_skipped() {
        let reply = json!({"keyword": [1, "medical", null, {"x": 1}]});
        assert_eq!(extract_keywords(&reply), vec!["medical"]);
    }
}
