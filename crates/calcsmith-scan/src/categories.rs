//! Issue categories and their evidence heuristics
//!
//! The closed category set the code scanner reports against, with two regex
//! layers: inference (assign a category to an uncategorized issue from its
//! text) and validation (does the evidence actually look like this category).
//! Validation is what keeps an overzealous classifier from blocking a
//! legitimate artifact on a mislabeled claim.

use lazy_static::lazy_static;
use regex::Regex;

/// The closed category enum for scanner findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueCategory {
    // Disallowed: a validated finding blocks the artifact
    Networking,
    ExternalResource,
    DynamicCode,
    Navigation,
    CredentialCapture,
    DataExfiltration,
    // Allow-listed: deliberately required by the generation instructions
    InlineScript,
    InlineHandler,
    UnsafeInlineCsp,
    PostMessage,
}

lazy_static! {
    static ref NETWORKING: Regex =
        Regex::new(r"(?i)\bfetch\s*\(|XMLHttpRequest|WebSocket|sendBeacon|EventSource|\baxios\b")
            .unwrap();
    static ref EXTERNAL_RESOURCE: Regex =
        Regex::new(r#"(?i)(?:src|href)\s*=\s*["']?https?://|@import\s|<link\b|loads?\s+external"#)
            .unwrap();
    // The constructor spelling stays case-sensitive; `function(` is
    // everywhere in legitimate JS.
    static ref DYNAMIC_CODE: Regex = Regex::new(
        r#"(?i:\beval\s*\(|set(?:timeout|interval)\s*\(\s*["']|document\.write|createelement\s*\(\s*["']script)|new\s+Function|\bFunction\s*\("#
    )
    .unwrap();
    static ref NAVIGATION: Regex = Regex::new(
        r#"(?i)window\.open\s*\(|location\.(?:href|assign|replace)|target\s*=\s*["']?_blank|\bpopup\b"#
    )
    .unwrap();
    static ref CREDENTIAL_CAPTURE: Regex = Regex::new(
        r#"(?i)type\s*=\s*["']?password|\bpassword\b|\bpasswd\b|\blogin\b|\bcredential|\bsign[\s-]?in\b"#
    )
    .unwrap();
    static ref DATA_EXFILTRATION: Regex = Regex::new(
        r"(?i)document\.cookie|localStorage|sessionStorage|indexedDB|\bexfiltrat|sends?\s+(?:user\s+)?data"
    )
    .unwrap();
    static ref INLINE_SCRIPT: Regex = Regex::new(r"(?i)<script\b|inline\s+script").unwrap();
    static ref INLINE_HANDLER: Regex =
        Regex::new(r"(?i)\bon(?:click|input|change|submit|load|keyup|keydown)\s*=|inline\s+event\s+handler")
            .unwrap();
    static ref UNSAFE_INLINE_CSP: Regex = Regex::new(r"(?i)unsafe-inline").unwrap();
    static ref POST_MESSAGE: Regex = Regex::new(r"(?i)postMessage").unwrap();

    /// DOM wiring APIs a confused classifier mislabels as dynamic execution.
    pub static ref DOM_WIRING: Regex =
        Regex::new(r"(?i)addEventListener|getElementById|querySelector").unwrap();
}

/// Inference order for uncategorized issues: disallowed categories first so
/// validation gets a chance to confirm real risk, allow-listed last.
const INFERENCE_ORDER: [IssueCategory; 10] = [
    IssueCategory::Networking,
    IssueCategory::ExternalResource,
    IssueCategory::DynamicCode,
    IssueCategory::Navigation,
    IssueCategory::CredentialCapture,
    IssueCategory::DataExfiltration,
    IssueCategory::InlineScript,
    IssueCategory::InlineHandler,
    IssueCategory::UnsafeInlineCsp,
    IssueCategory::PostMessage,
];

/// Disallowed categories in revalidation order.
pub const DISALLOWED: [IssueCategory; 6] = [
    IssueCategory::Networking,
    IssueCategory::ExternalResource,
    IssueCategory::DynamicCode,
    IssueCategory::Navigation,
    IssueCategory::CredentialCapture,
    IssueCategory::DataExfiltration,
];

impl IssueCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCategory::Networking => "networking",
            IssueCategory::ExternalResource => "external_resource",
            IssueCategory::DynamicCode => "dynamic_code",
            IssueCategory::Navigation => "navigation",
            IssueCategory::CredentialCapture => "credential_capture",
            IssueCategory::DataExfiltration => "data_exfiltration",
            IssueCategory::InlineScript => "inline_script",
            IssueCategory::InlineHandler => "inline_handler",
            IssueCategory::UnsafeInlineCsp => "unsafe_inline_csp",
            IssueCategory::PostMessage => "post_message",
        }
    }

    /// Normalize a model-supplied category label: lowercase, whitespace and
    /// hyphens to underscores, then match known spellings.
    pub fn normalize(raw: &str) -> Option<IssueCategory> {
        let canonical: String = raw
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c.is_whitespace() || c == '-' { '_' } else { c })
            .collect();
        match canonical.as_str() {
            "networking" | "network" | "network_call" | "network_access" => {
                Some(IssueCategory::Networking)
            }
            "external_resource" | "external_resources" | "external_load" | "remote_resource" => {
                Some(IssueCategory::ExternalResource)
            }
            "dynamic_code" | "dynamic_execution" | "code_execution" | "dynamic_eval" => {
                Some(IssueCategory::DynamicCode)
            }
            "navigation" | "popup" | "navigation_popup" | "redirect" => {
                Some(IssueCategory::Navigation)
            }
            "credential_capture" | "credentials" | "phishing" => {
                Some(IssueCategory::CredentialCapture)
            }
            "data_exfiltration" | "exfiltration" | "data_leak" => {
                Some(IssueCategory::DataExfiltration)
            }
            "inline_script" | "inline_scripts" => Some(IssueCategory::InlineScript),
            "inline_handler" | "inline_event_handler" | "inline_event_handlers" => {
                Some(IssueCategory::InlineHandler)
            }
            "unsafe_inline_csp" | "unsafe_inline" | "csp_unsafe_inline" => {
                Some(IssueCategory::UnsafeInlineCsp)
            }
            "post_message" | "postmessage" => Some(IssueCategory::PostMessage),
            _ => None,
        }
    }

    /// Infer a category from issue text when the model supplied none.
    pub fn infer(text: &str) -> Option<IssueCategory> {
        INFERENCE_ORDER
            .iter()
            .copied()
            .find(|category| category.evidence_matches(text))
    }

    pub fn is_allow_listed(&self) -> bool {
        matches!(
            self,
            IssueCategory::InlineScript
                | IssueCategory::InlineHandler
                | IssueCategory::UnsafeInlineCsp
                | IssueCategory::PostMessage
        )
    }

    pub fn is_disallowed(&self) -> bool {
        !self.is_allow_listed()
    }

    /// Does this text actually look like evidence for this category?
    pub fn evidence_matches(&self, text: &str) -> bool {
        match self {
            IssueCategory::Networking => NETWORKING.is_match(text),
            IssueCategory::ExternalResource => EXTERNAL_RESOURCE.is_match(text),
            IssueCategory::DynamicCode => DYNAMIC_CODE.is_match(text),
            IssueCategory::Navigation => NAVIGATION.is_match(text),
            IssueCategory::CredentialCapture => CREDENTIAL_CAPTURE.is_match(text),
            IssueCategory::DataExfiltration => DATA_EXFILTRATION.is_match(text),
            IssueCategory::InlineScript => INLINE_SCRIPT.is_match(text),
            IssueCategory::InlineHandler => INLINE_HANDLER.is_match(text),
            IssueCategory::UnsafeInlineCsp => UNSAFE_INLINE_CSP.is_match(text),
            IssueCategory::PostMessage => POST_MESSAGE.is_match(text),
        }
    }
}

/// The disallowed predicate: which disallowed category, if any, does this
/// evidence text validate against, independent of whatever the model
/// claimed.
pub fn revalidate_disallowed(text: &str) -> Option<IssueCategory> {
    DISALLOWED
        .iter()
        .copied()
        .find(|category| category.evidence_matches(text))
}
