//! Generation instructions and schemas
//!
//! Prompt templates follow the `{placeholder}` replacement convention; the
//! policy supplies the banner text and CSP directives so the instructions
//! can never drift from what the deterministic scanner later requires.

use serde_json::{json, Value};

use calcsmith_core::ExecutionModel;
use calcsmith_policy::ScanPolicy;

/// The call token every expression-model artifact must route evaluation
/// through. Its absence is a hard refusal: the model is not allowed to fall
/// back to eval-style computation silently.
pub const SAFE_EVALUATOR_TOKEN: &str = "safeEvaluate(";

const GENERATION_SYSTEM_TEMPLATE: &str = "\
You generate one complete, self-contained HTML calculator. Hard rules:

- One HTML document, no external resources of any kind: no remote scripts, \
styles, fonts, images, or links. No iframe, object, embed, link, or base \
elements.
- Include exactly this CSP meta tag in <head>: \
<meta http-equiv=\"Content-Security-Policy\" content=\"{csp_directives}\">
- Display this text verbatim, visible near the bottom of the page: \
\"{banner_text}\"
- All logic in inline scripts. Wire events with addEventListener. Never use \
eval, the Function constructor, string arguments to setTimeout/setInterval, \
document.write, or any network API.
- Expression calculators must compute results only through the provided \
safeEvaluate(expression) helper, which you must define as a pure \
tokenizer/parser over numbers and + - * / ( ) only.
- Form calculators use labeled inputs and a compute button.

Respond with only JSON: {\"artifactHtml\": string, \"manifest\": object, \
\"notes\": string (optional)}. The manifest is \
{\"specVersion\": \"1.0\", \"title\": string, \"executionModel\": \
\"form\"|\"expression\", \"capabilities\": {\"network\": false}}.

If the request is not a calculator you can build under these rules, respond \
with exactly {\"error\": \"REFUSE\", \"reason\": string}.";

/// Instruction appended for the single repair retry.
pub const REPAIR_INSTRUCTION: &str = "\
Your previous reply was not valid JSON in the required shape. Respond again \
with only the JSON object, no prose, no code fences.";

/// Build the generation system prompt from the active policy.
pub fn generation_system(policy: &ScanPolicy) -> String {
    GENERATION_SYSTEM_TEMPLATE
        .replace("{csp_directives}", &policy.required_csp_directives.join("; "))
        .replace("{banner_text}", &policy.required_banner_text)
}

/// Per-request execution model directive.
pub fn execution_model_directive(model: ExecutionModel) -> String {
    match model {
        ExecutionModel::Form => {
            "Build this as a form calculator: labeled inputs, a compute button, \
             a result area. Set executionModel to \"form\"."
                .to_string()
        }
        ExecutionModel::Expression => {
            "Build this as an expression calculator: one expression input whose \
             result comes from safeEvaluate(). Set executionModel to \
             \"expression\"."
                .to_string()
        }
    }
}

/// Instruction added when regenerating after a retriable banned-token match.
pub fn corrective_instruction(pattern: &str) -> String {
    format!(
        "Your previous attempt contained the banned construct `{}`. Regenerate \
         the calculator without it; compute everything with plain functions \
         and the safeEvaluate helper only.",
        pattern
    )
}

/// Strict output schema for the generation call.
pub fn generation_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["artifactHtml", "manifest"],
        "properties": {
            "artifactHtml": { "type": "string" },
            "manifest": {
                "type": "object",
                "required": ["specVersion", "title", "executionModel", "capabilities"],
                "properties": {
                    "specVersion": { "type": "string" },
                    "title": { "type": "string" },
                    "executionModel": { "type": "string", "enum": ["form", "expression"] },
                    "capabilities": {
                        "type": "object",
                        "required": ["network"],
                        "properties": { "network": { "type": "boolean" } }
                    }
                }
            },
            "notes": { "type": "string" }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_system_carries_policy_markers() {
        let policy = ScanPolicy::builtin();
        let system = generation_system(&policy);
        assert!(system.contains(&policy.required_banner_text));
        for directive in &policy.required_csp_directives {
            assert!(system.contains(directive.as_str()), "missing {}", directive);
        }
        assert!(!system.contains("{banner_text}"));
        assert!(!system.contains("{csp_directives}"));
    }

    #[test]
    fn test_directives_mention_their_model() {
        assert!(execution_model_directive(ExecutionModel::Form).contains("\"form\""));
        assert!(
            execution_model_directive(ExecutionModel::Expression).contains(SAFE_EVALUATOR_TOKEN.trim_end_matches('('))
        );
    }

    #[test]
    fn test_corrective_instruction_names_pattern() {
        assert!(corrective_instruction("new Function").contains("`new Function`"));
    }

    #[test]
    fn test_generation_schema_required_fields() {
        let schema = generation_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(required, vec!["artifactHtml", "manifest"]);
    }
}
