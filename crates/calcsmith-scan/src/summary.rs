//! Issue normalization
//!
//! The code scanner is allowed to answer with plain strings, structured
//! objects, or anything in between. Everything is flattened into one bounded
//! summary shape before triage so logs stay bounded no matter what the model
//! sends back.

use serde::Serialize;
use serde_json::Value;

/// Ceiling on every normalized field, in characters.
pub const SUMMARY_FIELD_MAX: usize = 240;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanIssueSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed: Option<bool>,
}

/// Aliases accepted per field, first hit wins.
const CATEGORY_KEYS: [&str; 3] = ["category", "type", "kind"];
const CODE_KEYS: [&str; 3] = ["code", "id", "rule"];
const SEVERITY_KEYS: [&str; 2] = ["severity", "level"];
const MESSAGE_KEYS: [&str; 4] = ["message", "msg", "description", "detail"];
const SUMMARY_KEYS: [&str; 2] = ["summary", "title"];
const EVIDENCE_KEYS: [&str; 4] = ["evidence", "snippet", "quote", "codeExcerpt"];
const ALLOWED_KEYS: [&str; 3] = ["allowed", "isAllowed", "safe"];

impl ScanIssueSummary {
    /// Normalize one raw issue of any shape.
    pub fn from_value(raw: &Value) -> ScanIssueSummary {
        match raw {
            Value::String(text) => ScanIssueSummary {
                message: Some(clip(text)),
                ..Default::default()
            },
            Value::Object(map) => {
                let summary = ScanIssueSummary {
                    category: first_string(map, &CATEGORY_KEYS),
                    code: first_string(map, &CODE_KEYS),
                    severity: first_string(map, &SEVERITY_KEYS),
                    message: first_string(map, &MESSAGE_KEYS),
                    summary: first_string(map, &SUMMARY_KEYS),
                    evidence: first_string(map, &EVIDENCE_KEYS),
                    allowed: ALLOWED_KEYS.iter().find_map(|k| map.get(*k)?.as_bool()),
                };
                if summary == ScanIssueSummary::default() {
                    // Nothing recognizable: keep a bounded dump instead of
                    // losing the issue.
                    ScanIssueSummary { message: Some(clip(&raw.to_string())), ..Default::default() }
                } else {
                    summary
                }
            }
            other => ScanIssueSummary {
                message: Some(clip(&other.to_string())),
                ..Default::default()
            },
        }
    }

    /// All text fields concatenated, for category inference and validation.
    pub fn combined_text(&self) -> String {
        [&self.message, &self.summary, &self.evidence, &self.code]
            .into_iter()
            .flatten()
            .cloned()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Evidence if present, else the combined text.
    pub fn evidence_text(&self) -> String {
        match &self.evidence {
            Some(evidence) => evidence.clone(),
            None => self.combined_text(),
        }
    }
}

fn first_string(map: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        map.get(*key)
            .and_then(Value::as_str)
            .map(|s| clip(s))
    })
}

fn clip(text: &str) -> String {
    if text.chars().count() <= SUMMARY_FIELD_MAX {
        text.to_string()
    } else {
        text.chars().take(SUMMARY_FIELD_MAX).collect()
    }
}
