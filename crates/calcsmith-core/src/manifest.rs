//! Manifest validation
//!
//! The manifest arrives from an untrusted model inside the generation
//! payload. Nothing downstream (embedding, hashing, persistence) may touch a
//! manifest that has not passed `validate_manifest`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The only manifest spec version this engine accepts.
pub const SUPPORTED_SPEC_VERSION: &str = "1.0";

/// How the generated calculator computes results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionModel {
    /// Field-based calculators: typed inputs, a compute button, typed outputs
    Form,
    /// Free-form expression entry routed through the safe evaluator
    Expression,
}

impl ExecutionModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionModel::Form => "form",
            ExecutionModel::Expression => "expression",
        }
    }

    /// Parse the wire value. Anything but the two literal strings is invalid.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "form" => Some(ExecutionModel::Form),
            "expression" => Some(ExecutionModel::Expression),
            _ => None,
        }
    }
}

impl fmt::Display for ExecutionModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A specific way the manifest failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ManifestViolation {
    NotAnObject,
    SpecVersionMismatch { found: String },
    MissingTitle,
    InvalidExecutionModel { found: String },
    NetworkCapabilityNotFalse,
}

impl fmt::Display for ManifestViolation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ManifestViolation::NotAnObject => write!(f, "manifest is not a JSON object"),
            ManifestViolation::SpecVersionMismatch { found } => {
                write!(
                    f,
                    "specVersion must be \"{}\", got \"{}\"",
                    SUPPORTED_SPEC_VERSION, found
                )
            }
            ManifestViolation::MissingTitle => write!(f, "title must be a non-empty string"),
            ManifestViolation::InvalidExecutionModel { found } => {
                write!(f, "executionModel must be form or expression, got \"{}\"", found)
            }
            ManifestViolation::NetworkCapabilityNotFalse => {
                write!(f, "capabilities.network must be the literal boolean false")
            }
        }
    }
}

/// Validate the manifest shape invariant.
///
/// Checks, in order: object shape, exact `specVersion` match, non-empty
/// `title`, `executionModel` in the closed set, and `capabilities.network`
/// equal to the literal JSON `false`. A truthy-but-not-boolean value (the
/// string `"false"`, `0`, `null`) is a violation, not a warning.
pub fn validate_manifest(manifest: &Value) -> Result<(), ManifestViolation> {
    let obj = match manifest.as_object() {
        Some(obj) => obj,
        None => return Err(ManifestViolation::NotAnObject),
    };

    match obj.get("specVersion").and_then(Value::as_str) {
        Some(v) if v == SUPPORTED_SPEC_VERSION => {}
        other => {
            return Err(ManifestViolation::SpecVersionMismatch {
                found: other.unwrap_or("<missing>").to_string(),
            })
        }
    }

    match obj.get("title").and_then(Value::as_str) {
        Some(title) if !title.trim().is_empty() => {}
        _ => return Err(ManifestViolation::MissingTitle),
    }

    match obj.get("executionModel").and_then(Value::as_str) {
        Some(raw) if ExecutionModel::parse(raw).is_some() => {}
        other => {
            return Err(ManifestViolation::InvalidExecutionModel {
                found: other.unwrap_or("<missing>").to_string(),
            })
        }
    }

    match obj.get("capabilities").and_then(|c| c.get("network")) {
        Some(Value::Bool(false)) => {}
        _ => return Err(ManifestViolation::NetworkCapabilityNotFalse),
    }

    Ok(())
}

pub fn is_valid_manifest(manifest: &Value) -> bool {
    validate_manifest(manifest).is_ok()
}

/// Execution model declared by an already-validated manifest.
pub fn execution_model_of(manifest: &Value) -> Option<ExecutionModel> {
    manifest
        .get("executionModel")
        .and_then(Value::as_str)
        .and_then(ExecutionModel::parse)
}
