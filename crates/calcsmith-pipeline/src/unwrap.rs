//! Wrapper-object unwrapping
//!
//! Models sometimes nest the payload under `result`/`data`/`output` or a
//! single enclosing key of their own invention. Unwrapping is an explicit
//! ordered strategy list; the first strategy that yields a recognizable
//! payload (generation output or the refusal sentinel) wins.

use serde_json::Value;

const WRAPPER_KEYS: [&str; 3] = ["result", "data", "output"];

/// Does this value have the generation output shape: non-empty string
/// `artifactHtml` plus an object `manifest`.
pub fn looks_like_generation(value: &Value) -> bool {
    let html_ok = value
        .get("artifactHtml")
        .and_then(Value::as_str)
        .map(|s| !s.trim().is_empty())
        .unwrap_or(false);
    let manifest_ok = value.get("manifest").map(Value::is_object).unwrap_or(false);
    html_ok && manifest_ok
}

/// The sentinel refusal payload `{"error": "REFUSE", ...}`; returns the
/// optional reason text.
pub fn refusal_sentinel(value: &Value) -> Option<String> {
    if value.get("error").and_then(Value::as_str) == Some("REFUSE") {
        Some(
            value
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or("the model declined to generate this calculator")
                .to_string(),
        )
    } else {
        None
    }
}

fn recognizable(value: &Value) -> bool {
    looks_like_generation(value) || refusal_sentinel(value).is_some()
}

fn unwrap_direct(value: &Value) -> Option<&Value> {
    recognizable(value).then_some(value)
}

fn unwrap_known_key(value: &Value) -> Option<&Value> {
    WRAPPER_KEYS
        .iter()
        .filter_map(|key| value.get(key))
        .find(|inner| recognizable(inner))
}

fn unwrap_single_key(value: &Value) -> Option<&Value> {
    let obj = value.as_object()?;
    if obj.len() != 1 {
        return None;
    }
    obj.values().next().filter(|inner| recognizable(inner))
}

const UNWRAP_STRATEGIES: [fn(&Value) -> Option<&Value>; 3] =
    [unwrap_direct, unwrap_known_key, unwrap_single_key];

/// Unwrap a model payload; returns the input unchanged when no strategy
/// recognizes anything (the caller then treats it as a shape failure).
pub fn unwrap_generation_value(value: &Value) -> &Value {
    UNWRAP_STRATEGIES
        .iter()
        .find_map(|strategy| strategy(value))
        .unwrap_or(value)
}
