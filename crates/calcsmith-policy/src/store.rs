//! Scan policy store
//!
//! Rules the deterministic scanner enforces over final artifact HTML. The
//! built-in policy is the production default; deployments load overrides
//! through external configuration and hand the parsed policy in read-only.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// A list of banned substrings under one rule id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BannedPatternRule {
    pub id: String,
    pub patterns: Vec<String>,
    /// Match case-sensitively. Needed for tokens like `Function(` that
    /// collide with legitimate lowercase usages.
    #[serde(default)]
    pub case_sensitive: bool,
    /// A first-generation match on this rule triggers one corrective retry
    #[serde(default)]
    pub retriable: bool,
}

/// A list of banned element tags under one rule id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BannedTagRule {
    pub id: String,
    pub tags: Vec<String>,
}

/// The full scan policy consumed by the deterministic scanner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanPolicy {
    /// Literal banner text every artifact must display
    pub required_banner_text: String,
    /// CSP directive markers every artifact must carry
    pub required_csp_directives: Vec<String>,
    pub banned_pattern_rules: Vec<BannedPatternRule>,
    pub banned_tag_rules: Vec<BannedTagRule>,
    /// UTF-8 byte ceiling for the final artifact
    pub max_artifact_bytes: usize,
}

/// Rule id of the retriable constructor rule; the generator keys its one
/// corrective regeneration off this id.
pub const FUNCTION_CONSTRUCTOR_RULE: &str = "function-constructor";

static BUILTIN_POLICY: Lazy<ScanPolicy> = Lazy::new(ScanPolicy::builtin);

impl ScanPolicy {
    /// Process-wide policy, initialized once.
    pub fn current() -> &'static ScanPolicy {
        &BUILTIN_POLICY
    }

    pub fn from_json(raw: &str) -> Result<ScanPolicy, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Production default rule set.
    pub fn builtin() -> ScanPolicy {
        ScanPolicy {
            required_banner_text:
                "This calculator runs locally in your browser and never sends data anywhere."
                    .to_string(),
            required_csp_directives: vec![
                "default-src 'none'".to_string(),
                "script-src 'unsafe-inline'".to_string(),
                "style-src 'unsafe-inline'".to_string(),
            ],
            banned_pattern_rules: vec![
                BannedPatternRule {
                    id: "dynamic-eval".to_string(),
                    patterns: vec!["eval(".to_string()],
                    case_sensitive: false,
                    retriable: false,
                },
                BannedPatternRule {
                    id: FUNCTION_CONSTRUCTOR_RULE.to_string(),
                    // Case-sensitive: `function(` is everywhere in
                    // legitimate JS, the constructor spelling is not.
                    patterns: vec!["new Function".to_string(), "Function(".to_string()],
                    case_sensitive: true,
                    retriable: true,
                },
                BannedPatternRule {
                    id: "network-calls".to_string(),
                    patterns: vec![
                        "fetch(".to_string(),
                        "xmlhttprequest".to_string(),
                        "websocket".to_string(),
                        "sendbeacon".to_string(),
                        "eventsource".to_string(),
                    ],
                    case_sensitive: false,
                    retriable: false,
                },
                BannedPatternRule {
                    id: "document-write".to_string(),
                    patterns: vec!["document.write".to_string()],
                    case_sensitive: false,
                    retriable: false,
                },
                BannedPatternRule {
                    id: "string-timers".to_string(),
                    patterns: vec![
                        "settimeout(\"".to_string(),
                        "settimeout('".to_string(),
                        "setinterval(\"".to_string(),
                        "setinterval('".to_string(),
                    ],
                    case_sensitive: false,
                    retriable: false,
                },
                BannedPatternRule {
                    id: "worker-imports".to_string(),
                    patterns: vec!["importscripts(".to_string()],
                    case_sensitive: false,
                    retriable: false,
                },
            ],
            banned_tag_rules: vec![BannedTagRule {
                id: "external-content-tags".to_string(),
                tags: vec![
                    "iframe".to_string(),
                    "object".to_string(),
                    "embed".to_string(),
                    "link".to_string(),
                    "base".to_string(),
                ],
            }],
            max_artifact_bytes: 192 * 1024,
        }
    }

    /// The retriable-rule lookup used by the generator.
    pub fn is_retriable_rule(&self, rule_id: &str) -> bool {
        self.banned_pattern_rules
            .iter()
            .any(|rule| rule.id == rule_id && rule.retriable)
    }
}
