//! Scan-policy arbiter
//!
//! The single most safety-critical decision in the system. A pure, total
//! function: configured mode + capability flag + per-request flags +
//! classifier outcome in, one decision out. The per-request flags are
//! untrusted; without the environment capability they are ignored entirely,
//! which makes `enforce` unreachable from request input alone.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Configured scan policy mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanPolicyMode {
    Enforce,
    Warn,
    Off,
}

impl ScanPolicyMode {
    /// Parse a config string; anything unrecognized is `None` so callers
    /// fall back to enforce explicitly.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "enforce" => Some(ScanPolicyMode::Enforce),
            "warn" => Some(ScanPolicyMode::Warn),
            "off" => Some(ScanPolicyMode::Off),
            _ => None,
        }
    }
}

impl fmt::Display for ScanPolicyMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScanPolicyMode::Enforce => write!(f, "enforce"),
            ScanPolicyMode::Warn => write!(f, "warn"),
            ScanPolicyMode::Off => write!(f, "off"),
        }
    }
}

/// How the prompt scan concluded for a request that continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanOutcomeTag {
    Allow,
    Deny,
    Skipped,
}

/// The arbiter's decision for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ScanOverrideDecision {
    /// Proceed to generation
    Continue {
        outcome: ScanOutcomeTag,
        override_used: bool,
    },
    /// Terminal refusal
    ScanBlock,
    /// Denied under warn mode; caller must resubmit with proceed=true
    ScanWarn,
    /// Scanning disabled; caller must resubmit with proceed=true
    ScanSkipped,
}

/// The runtime mode after capability gating. Request flags cannot move this:
/// only the environment capability unlocks anything but enforce.
pub fn effective_mode(configured: ScanPolicyMode, capability: bool) -> ScanPolicyMode {
    if capability {
        configured
    } else {
        ScanPolicyMode::Enforce
    }
}

/// Whether the prompt classifier must run for these inputs. Only the
/// off+armed shortcut skips it: "off" means skip scanning, not "scan then
/// ignore".
pub fn classifier_required(mode: ScanPolicyMode, capability: bool, armed: bool) -> bool {
    !(effective_mode(mode, capability) == ScanPolicyMode::Off && armed && capability)
}

/// Decide what happens to a request.
///
/// `prompt_denied` is ignored on the off+armed shortcut branches, where the
/// classifier never ran.
pub fn evaluate_scan_policy(
    mode: ScanPolicyMode,
    capability: bool,
    armed: bool,
    proceed: bool,
    prompt_denied: bool,
) -> ScanOverrideDecision {
    let mode = effective_mode(mode, capability);
    let armed = armed && capability;

    if mode == ScanPolicyMode::Off && armed {
        if proceed {
            return ScanOverrideDecision::Continue {
                outcome: ScanOutcomeTag::Skipped,
                override_used: true,
            };
        }
        return ScanOverrideDecision::ScanSkipped;
    }

    if !prompt_denied {
        return ScanOverrideDecision::Continue {
            outcome: ScanOutcomeTag::Allow,
            override_used: false,
        };
    }

    if mode == ScanPolicyMode::Warn && armed {
        if proceed {
            return ScanOverrideDecision::Continue {
                outcome: ScanOutcomeTag::Deny,
                override_used: true,
            };
        }
        return ScanOverrideDecision::ScanWarn;
    }

    ScanOverrideDecision::ScanBlock
}
