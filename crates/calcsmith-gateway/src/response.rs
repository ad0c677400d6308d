//! Provider response envelope
//!
//! Providers differ in where the model text lands: a flat `output_text`, a
//! list of output items with content fragments, or an inline parsed object
//! when structured output was honored. The envelope tolerates all three.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Token accounting from the provider `usage` block. Field aliases cover the
/// two wire spellings in circulation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default, alias = "input_tokens")]
    pub prompt_tokens: u32,
    #[serde(default, alias = "output_tokens")]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Sum usage across attempts; `None` + `None` stays `None`.
pub fn merge_usage(a: Option<TokenUsage>, b: Option<TokenUsage>) -> Option<TokenUsage> {
    match (a, b) {
        (None, None) => None,
        (Some(u), None) | (None, Some(u)) => Some(u),
        (Some(a), Some(b)) => Some(TokenUsage {
            prompt_tokens: a.prompt_tokens + b.prompt_tokens,
            completion_tokens: a.completion_tokens + b.completion_tokens,
            total_tokens: a.total_tokens + b.total_tokens,
        }),
    }
}

/// One fragment of model output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentFragment {
    #[serde(default)]
    pub text: Option<String>,
    /// Structured object returned inline when the provider honors the schema
    #[serde(default)]
    pub parsed: Option<Value>,
}

/// One output item (providers emit one per message/tool segment).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputItem {
    #[serde(default)]
    pub content: Vec<ContentFragment>,
}

/// Raw provider response, preserved on results for diagnostics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderResponse {
    #[serde(default)]
    pub output_text: Option<String>,
    #[serde(default)]
    pub output: Vec<OutputItem>,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
    #[serde(default)]
    pub model: Option<String>,
}

impl ProviderResponse {
    /// Inline structured object, if the provider returned one.
    pub fn inline_object(&self) -> Option<&Value> {
        self.output
            .iter()
            .flat_map(|item| item.content.iter())
            .find_map(|fragment| fragment.parsed.as_ref())
    }

    /// Model text: the flat field when present, else all fragments joined.
    pub fn collected_text(&self) -> Option<String> {
        if let Some(text) = &self.output_text {
            return Some(text.clone());
        }
        let joined: String = self
            .output
            .iter()
            .flat_map(|item| item.content.iter())
            .filter_map(|fragment| fragment.text.as_deref())
            .collect();
        if joined.is_empty() {
            None
        } else {
            Some(joined)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_text_wins() {
        let response: ProviderResponse = serde_json::from_value(json!({
            "output_text": "flat",
            "output": [{ "content": [{ "text": "fragment" }] }]
        }))
        .unwrap();
        assert_eq!(response.collected_text().unwrap(), "flat");
    }

    #[test]
    fn test_fragments_concatenate() {
        let response: ProviderResponse = serde_json::from_value(json!({
            "output": [
                { "content": [{ "text": "{\"a\":" }, { "text": "1}" }] },
                { "content": [] }
            ]
        }))
        .unwrap();
        assert_eq!(response.collected_text().unwrap(), "{\"a\":1}");
    }

    #[test]
    fn test_inline_object_extraction() {
        let response: ProviderResponse = serde_json::from_value(json!({
            "output": [{ "content": [{ "parsed": { "allowed": true } }] }]
        }))
        .unwrap();
        assert_eq!(response.inline_object().unwrap()["allowed"], true);
    }

    #[test]
    fn test_empty_response_has_no_text() {
        let response = ProviderResponse::default();
        assert!(response.collected_text().is_none());
        assert!(response.inline_object().is_none());
    }

    #[test]
    fn test_usage_aliases() {
        let usage: TokenUsage = serde_json::from_value(json!({
            "input_tokens": 10, "output_tokens": 5, "total_tokens": 15
        }))
        .unwrap();
        assert_eq!(usage.prompt_tokens, 10);
        assert_eq!(usage.completion_tokens, 5);
    }

    #[test]
    fn test_merge_usage_sums() {
        let merged = merge_usage(
            Some(TokenUsage { prompt_tokens: 10, completion_tokens: 2, total_tokens: 12 }),
            Some(TokenUsage { prompt_tokens: 4, completion_tokens: 1, total_tokens: 5 }),
        )
        .unwrap();
        assert_eq!(merged.total_tokens, 17);
        assert!(merge_usage(None, None).is_none());
    }
}
