//! Completion request model
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Message author role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionMessage {
    pub role: Role,
    pub content: String,
}

impl CompletionMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Requested output shape.
///
/// `JsonSchema` is the strict mode; the client downgrades it to `JsonObject`
/// once when the provider rejects it (see `client::is_schema_rejection`).
#[derive(Debug, Clone, PartialEq)]
pub enum OutputFormat {
    /// Free text, no format constraint
    Text,
    /// Any syntactically valid JSON object
    JsonObject,
    /// Named JSON schema with strict conformance
    JsonSchema { name: String, schema: Value, strict: bool },
}

impl OutputFormat {
    pub fn json_schema(name: impl Into<String>, schema: Value) -> Self {
        OutputFormat::JsonSchema { name: name.into(), schema, strict: true }
    }

    pub fn is_strict_schema(&self) -> bool {
        matches!(self, OutputFormat::JsonSchema { strict: true, .. })
    }

    /// The looser format the compatibility shim falls back to.
    pub fn downgraded(&self) -> OutputFormat {
        match self {
            OutputFormat::JsonSchema { .. } => OutputFormat::JsonObject,
            other => other.clone(),
        }
    }

    /// Provider wire descriptor, `None` for unconstrained text.
    pub fn to_wire(&self) -> Option<Value> {
        match self {
            OutputFormat::Text => None,
            OutputFormat::JsonObject => Some(json!({ "type": "json_object" })),
            OutputFormat::JsonSchema { name, schema, strict } => Some(json!({
                "type": "json_schema",
                "name": name,
                "schema": schema,
                "strict": strict,
            })),
        }
    }
}

/// Immutable per-call request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<CompletionMessage>,
    pub max_output_tokens: Option<u32>,
    pub output_format: OutputFormat,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            max_output_tokens: None,
            output_format: OutputFormat::Text,
        }
    }

    pub fn with_message(mut self, message: CompletionMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_max_output_tokens(mut self, ceiling: u32) -> Self {
        self.max_output_tokens = Some(ceiling);
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Provider payload, with `format` substituted for the request's own
    /// output format so the fallback shim can re-send the same request in
    /// JSON-object mode.
    pub fn to_payload(&self, format: &OutputFormat) -> Value {
        let mut payload = json!({
            "model": self.model,
            "input": self.messages,
        });
        if let Some(ceiling) = self.max_output_tokens {
            payload["max_output_tokens"] = json!(ceiling);
        }
        if let Some(wire) = format.to_wire() {
            payload["text"] = json!({ "format": wire });
        }
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_carries_messages_and_model() {
        let request = CompletionRequest::new("calc-gen-1")
            .with_message(CompletionMessage::system("you generate calculators"))
            .with_message(CompletionMessage::user("tip calculator"))
            .with_max_output_tokens(4096);
        let payload = request.to_payload(&request.output_format.clone());
        assert_eq!(payload["model"], "calc-gen-1");
        assert_eq!(payload["input"][0]["role"], "system");
        assert_eq!(payload["input"][1]["content"], "tip calculator");
        assert_eq!(payload["max_output_tokens"], 4096);
        assert!(payload.get("text").is_none());
    }

    #[test]
    fn test_strict_schema_wire_format() {
        let format = OutputFormat::json_schema("gen_output", serde_json::json!({"type": "object"}));
        let wire = format.to_wire().unwrap();
        assert_eq!(wire["type"], "json_schema");
        assert_eq!(wire["name"], "gen_output");
        assert_eq!(wire["strict"], true);
    }

    #[test]
    fn test_downgrade_targets_json_object() {
        let format = OutputFormat::json_schema("x", serde_json::json!({}));
        assert_eq!(format.downgraded(), OutputFormat::JsonObject);
        assert_eq!(OutputFormat::Text.downgraded(), OutputFormat::Text);
        assert!(format.is_strict_schema());
        assert!(!format.downgraded().is_strict_schema());
    }

    #[test]
    fn test_payload_with_json_object_format() {
        let request = CompletionRequest::new("m").with_output_format(OutputFormat::JsonObject);
        let payload = request.to_payload(&OutputFormat::JsonObject);
        assert_eq!(payload["text"]["format"]["type"], "json_object");
    }
}
