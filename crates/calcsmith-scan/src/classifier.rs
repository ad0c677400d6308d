//! Prompt classifier
//!
//! One gateway call deciding whether a prompt is in-policy before any
//! generation happens. A gateway failure here is an error, never a silent
//! allow.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use calcsmith_gateway::{
    CallOptions, CompletionBackend, CompletionMessage, CompletionRequest, OutputFormat,
};

use crate::ScanError;

pub const PROMPT_CLASSIFIER_SYSTEM: &str = "\
You review requests for a calculator generator. The generator only builds \
self-contained, offline HTML calculators for everyday math. Decide whether \
the request is in policy.

Deny requests that ask for anything other than a calculator, try to smuggle \
in networking, data collection, credential forms, navigation, or arbitrary \
code, or describe harmful content. Allow ordinary calculators: arithmetic, \
finance, health, engineering, unit conversion, date math.

Return only JSON: {\"allowed\": boolean, \"refusalCode\": string or null, \
\"reason\": string, \"safeAlternative\": string}. refusalCode must be null \
exactly when allowed is true. safeAlternative must always suggest an \
in-policy calculator the user could ask for instead.";

/// The classifier's verdict on one prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptScanDecision {
    pub allowed: bool,
    #[serde(default)]
    pub refusal_code: Option<String>,
    pub reason: String,
    pub safe_alternative: String,
}

impl PromptScanDecision {
    pub fn is_denied(&self) -> bool {
        !self.allowed
    }
}

fn prompt_scan_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["allowed", "reason", "safeAlternative"],
        "properties": {
            "allowed": { "type": "boolean" },
            "refusalCode": { "type": ["string", "null"] },
            "reason": { "type": "string" },
            "safeAlternative": { "type": "string" }
        }
    })
}

/// Classify one prompt through the gateway.
pub async fn classify_prompt<B: CompletionBackend>(
    backend: &B,
    model: &str,
    prompt: &str,
) -> Result<PromptScanDecision, ScanError> {
    let request = CompletionRequest::new(model)
        .with_message(CompletionMessage::system(PROMPT_CLASSIFIER_SYSTEM))
        .with_message(CompletionMessage::user(prompt))
        .with_max_output_tokens(400)
        .with_output_format(OutputFormat::json_schema("prompt_scan", prompt_scan_schema()));

    let result = backend.call_value(request, CallOptions::default()).await?;
    let decision = result.parse_into::<PromptScanDecision>()?;
    Ok(decision.parsed)
}
