//! Calcsmith Policy: Scan Rules, Deterministic Scanning, and Override Arbitration
//!
//! Everything here is synchronous and pure. The policy store and runtime
//! config are read-only singletons initialized once; the arbiter is a total
//! function over its inputs so every branch is table-testable.

pub mod arbiter;
pub mod audit;
pub mod config;
pub mod scanner;
pub mod store;

pub use arbiter::{
    classifier_required, effective_mode, evaluate_scan_policy, ScanOutcomeTag, ScanOverrideDecision,
    ScanPolicyMode,
};
pub use audit::{ArbiterAuditEntry, ArbiterAuditLog, ArbiterAuditStats};
pub use config::RuntimeConfig;
pub use scanner::{scan_artifact, ScanCode, ScanReport, ScanViolation};
pub use store::{BannedPatternRule, BannedTagRule, ScanPolicy, FUNCTION_CONSTRUCTOR_RULE};

/// Quick check: would these request flags reach generation at all?
///
/// Convenience wrapper over [`evaluate_scan_policy`] for callers that only
/// need the yes/no, not the full decision.
pub fn would_continue(
    mode: ScanPolicyMode,
    capability: bool,
    armed: bool,
    proceed: bool,
    prompt_denied: bool,
) -> bool {
    matches!(
        evaluate_scan_policy(mode, capability, armed, proceed, prompt_denied),
        ScanOverrideDecision::Continue { .. }
    )
}
