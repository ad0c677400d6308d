//! Code-scan triage
//!
//! Sorts the scanner's raw issue list into four buckets. Only `disallowed`
//! blocks an artifact, and an issue lands there only when its evidence text
//! independently validates as a disallowed category; the model's claim
//! alone is never enough. The never-fail exceptions exist because the
//! generation instructions deliberately require constructs (inline scripts,
//! postMessage, unsafe-inline) that naive classifiers flag.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::categories::{revalidate_disallowed, IssueCategory, DOM_WIRING};
use crate::summary::ScanIssueSummary;

/// One issue after triage.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriagedIssue {
    pub summary: ScanIssueSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Why the issue landed in its bucket
    pub disposition: String,
}

/// The four triage buckets.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeScanTriage {
    /// Validated findings; any entry here is a terminal refusal
    pub disallowed: Vec<TriagedIssue>,
    /// Allow-listed categories the instructions require
    pub allowed: Vec<TriagedIssue>,
    /// Never-fail exceptions
    pub ignored: Vec<TriagedIssue>,
    /// Nothing validated; logged, non-blocking
    pub uncategorized: Vec<TriagedIssue>,
}

impl CodeScanTriage {
    pub fn blocks(&self) -> bool {
        !self.disallowed.is_empty()
    }
}

/// Triage a raw issue list against the required banner text.
pub fn triage_issues(
    issues: &[Value],
    model_safe_flag: Option<bool>,
    banner_text: &str,
) -> CodeScanTriage {
    let mut triage = CodeScanTriage::default();
    let banner = banner_text.trim().to_ascii_lowercase();

    for raw in issues {
        let summary = ScanIssueSummary::from_value(raw);
        let combined = summary.combined_text();
        let evidence = summary.evidence_text();

        let claimed = summary
            .category
            .as_deref()
            .and_then(IssueCategory::normalize);
        let category = claimed.or_else(|| IssueCategory::infer(&combined));

        // Never-fail: the scanner quoting our own safety banner back as
        // "evidence" of data handling.
        if !banner.is_empty() && evidence.trim().to_ascii_lowercase().contains(&banner) {
            triage.ignored.push(issue(summary, category, "evidence is the required safety banner"));
            continue;
        }

        // Never-fail: DOM event wiring mislabeled as dynamic execution.
        if claimed == Some(IssueCategory::DynamicCode)
            && DOM_WIRING.is_match(&evidence)
            && !IssueCategory::DynamicCode.evidence_matches(&evidence)
        {
            triage.ignored.push(issue(summary, category, "DOM wiring mislabeled as dynamic code"));
            continue;
        }

        if let Some(cat) = category {
            if cat.is_allow_listed() {
                triage.allowed.push(issue(summary, Some(cat), "allow-listed by generation policy"));
                continue;
            }
        }

        // Disallowed only if the evidence validates, regardless of claim.
        if let Some(validated) = revalidate_disallowed(&evidence) {
            triage.disallowed.push(issue(summary, Some(validated), "evidence validated"));
            continue;
        }

        if claimed.is_some() {
            debug!(
                category = claimed.map(|c| c.as_str()),
                "claimed category not supported by evidence"
            );
        }
        triage.uncategorized.push(issue(summary, category, "no validated category"));
    }

    if model_safe_flag == Some(false) && triage.disallowed.is_empty() {
        // The model said unsafe but nothing validated. Anomalous, logged,
        // and deliberately non-blocking.
        warn!(
            uncategorized = triage.uncategorized.len(),
            "scanner flagged unsafe without a validated finding"
        );
    }

    triage
}

fn issue(
    summary: ScanIssueSummary,
    category: Option<IssueCategory>,
    disposition: &str,
) -> TriagedIssue {
    TriagedIssue {
        summary,
        category: category.map(|c| c.as_str().to_string()),
        disposition: disposition.to_string(),
    }
}
