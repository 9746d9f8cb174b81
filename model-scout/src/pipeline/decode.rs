//! Validation of JSON that a completion model wrote as plain text.

use serde::de::DeserializeOwned;

/// Outcome of checking completion text against the contract we asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<T> {
    Valid(T),
    Invalid(String),
}

/// Models like to wrap JSON in markdown fences or chat around it. Keep the outermost object.
fn json_body(text: &str) -> &str {
    let text = text.trim();
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

pub fn decode<T: DeserializeOwned>(text: &str) -> Decoded<T> {
    match serde_json::from_str(json_body(text)) {
        Ok(value) => Decoded::Valid(value),
        Err(err) => Decoded::Invalid(err.to_string()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Debug, PartialEq)]
    struct Reply {
        keyword: Vec<String>,
    }

    #[test]
    pub fn decodes_plain_and_fenced_json() {
        let expected = Decoded::Valid(Reply {
            keyword: vec!["medical".to_owned()],
        });
        assert_eq!(decode::<Reply>(r#"{"keyword":["medical"]}"#), expected);
        assert_eq!(
            decode::<Reply>("```json\n{\"keyword\": [\"medical\"]}\n```"),
            expected
        );
        assert_eq!(
            decode::<Reply>("Sure! Here you go: {\"keyword\": [\"medical\"]} Hope it helps."),
            expected
        );
    }

    #[test]
    pub fn reports_invalid_text() {
        assert!(matches!(decode::<Reply>("not json"), Decoded::Invalid(_)));
        assert!(matches!(decode::<Reply>(r#"{"keyword": "medical"}"#), Decoded::Invalid(_)));
        assert!(matches!(decode::<Reply>(""), Decoded::Invalid(_)));
    }
}
