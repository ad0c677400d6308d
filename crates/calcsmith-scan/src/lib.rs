//! Calcsmith Scan: AI-facing classification of prompts and generated code
//!
//! Two model calls live here, the prompt classifier and the code scanner,
//! plus the triage logic that decides how much of the scanner's opinion to
//! believe. The model's own safety claims are never trusted in isolation:
//! category claims are re-validated against the evidence text before they
//! can block anything.

pub mod categories;
pub mod classifier;
pub mod code_scan;
pub mod summary;
#[cfg(test)]
mod testutil;
pub mod triage;

pub use categories::{revalidate_disallowed, IssueCategory};
pub use classifier::{classify_prompt, PromptScanDecision};
pub use code_scan::{scan_generated_code, CodeScanReport};
pub use summary::{ScanIssueSummary, SUMMARY_FIELD_MAX};
pub use triage::{triage_issues, CodeScanTriage, TriagedIssue};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("SCAN/GATEWAY: {0}")]
    Gateway(#[from] calcsmith_gateway::GatewayError),

    #[error("SCAN/SHAPE: {0}")]
    Shape(String),
}
