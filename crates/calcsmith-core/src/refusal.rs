//! Refusal payloads
//!
//! Refusals are expected, well-formed terminal outcomes, not errors. Callers
//! machine-parse them for UI display, so the shape is stable: a code, a
//! human-readable message, a safe alternative suggestion, and optional match
//! diagnostics from the deterministic scanner.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Why the pipeline refused to produce an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefusalCode {
    /// Prompt classifier denied the request
    PromptRejected,
    /// The model emitted the sentinel refusal payload
    ModelRefused,
    /// Manifest failed the shape invariant
    InvalidManifest,
    /// Artifact exceeded the byte ceiling (pre- or post-embedding)
    ArtifactTooLarge,
    /// Expression-model artifact without a safe-evaluator call
    MissingSafeEvaluator,
    /// Required CSP directive marker absent
    MissingCsp,
    /// Required safety banner text absent
    MissingBanner,
    /// Deterministic scanner matched a banned pattern
    BannedPattern,
    /// Deterministic scanner matched a banned tag
    BannedTag,
    /// AI code scan produced a disallowed finding
    UnsafeContent,
    /// AI code scan unavailable and the deployment fails closed
    ScanUnavailable,
}

impl RefusalCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefusalCode::PromptRejected => "PROMPT_REJECTED",
            RefusalCode::ModelRefused => "MODEL_REFUSED",
            RefusalCode::InvalidManifest => "INVALID_MANIFEST",
            RefusalCode::ArtifactTooLarge => "ARTIFACT_TOO_LARGE",
            RefusalCode::MissingSafeEvaluator => "MISSING_SAFE_EVALUATOR",
            RefusalCode::MissingCsp => "MISSING_CSP",
            RefusalCode::MissingBanner => "MISSING_BANNER",
            RefusalCode::BannedPattern => "BANNED_PATTERN",
            RefusalCode::BannedTag => "BANNED_TAG",
            RefusalCode::UnsafeContent => "UNSAFE_CONTENT",
            RefusalCode::ScanUnavailable => "SCAN_UNAVAILABLE",
        }
    }
}

impl fmt::Display for RefusalCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A structured refusal returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefusalReason {
    pub code: RefusalCode,
    pub message: String,
    pub safe_alternative: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl RefusalReason {
    pub fn new(code: RefusalCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            safe_alternative: default_safe_alternative(code).to_string(),
            match_index: None,
            context_snippet: None,
            details: None,
        }
    }

    pub fn with_safe_alternative(mut self, suggestion: impl Into<String>) -> Self {
        self.safe_alternative = suggestion.into();
        self
    }

    pub fn with_match(mut self, index: usize, snippet: impl Into<String>) -> Self {
        self.match_index = Some(index);
        self.context_snippet = Some(snippet.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl fmt::Display for RefusalReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

fn default_safe_alternative(code: RefusalCode) -> &'static str {
    match code {
        RefusalCode::PromptRejected => {
            "Try describing a calculator for everyday math, like a tip splitter or unit converter."
        }
        RefusalCode::ModelRefused => {
            "Rephrase the request as a concrete calculator, for example a loan payment estimator."
        }
        RefusalCode::ArtifactTooLarge => {
            "Ask for a simpler calculator with fewer inputs or less styling."
        }
        _ => "Try a simpler calculator description and submit again.",
    }
}
