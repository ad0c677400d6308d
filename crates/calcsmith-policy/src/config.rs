//! Runtime capability flags
//!
//! Environment-derived switches, read once at startup. The red-team
//! capability is the trust boundary for every per-request override flag: if
//! the environment does not grant it, the arbiter forces enforce mode no
//! matter what a request claims.

use once_cell::sync::Lazy;

use crate::arbiter::ScanPolicyMode;

static RUNTIME_CONFIG: Lazy<RuntimeConfig> = Lazy::new(RuntimeConfig::from_env);

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Dev-only override capability; false in production deployments
    pub red_team_capability: bool,
    /// Configured scan policy mode (meaningless without the capability)
    pub scan_policy_mode: ScanPolicyMode,
    /// Proceed when the AI code scan itself fails (availability over safety)
    pub ai_scan_fail_open: bool,
    /// Optional override of the policy's artifact byte ceiling
    pub max_artifact_bytes: Option<usize>,
}

impl RuntimeConfig {
    /// Process-wide config, initialized once.
    pub fn current() -> &'static RuntimeConfig {
        &RUNTIME_CONFIG
    }

    pub fn from_env() -> Self {
        Self {
            red_team_capability: env_flag("CALCSMITH_REDTEAM_CAPABILITY"),
            scan_policy_mode: std::env::var("CALCSMITH_SCAN_POLICY_MODE")
                .ok()
                .and_then(|raw| ScanPolicyMode::parse(&raw))
                .unwrap_or(ScanPolicyMode::Enforce),
            ai_scan_fail_open: env_flag("CALCSMITH_AI_SCAN_FAIL_OPEN"),
            max_artifact_bytes: std::env::var("CALCSMITH_MAX_ARTIFACT_BYTES")
                .ok()
                .and_then(|raw| raw.trim().parse().ok()),
        }
    }

    /// Production posture: enforce, fail closed, no overrides.
    pub fn locked_down() -> Self {
        Self {
            red_team_capability: false,
            scan_policy_mode: ScanPolicyMode::Enforce,
            ai_scan_fail_open: false,
            max_artifact_bytes: None,
        }
    }
}

fn env_flag(name: &str) -> bool {
    matches!(
        std::env::var(name).unwrap_or_default().trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locked_down_defaults() {
        let config = RuntimeConfig::locked_down();
        assert!(!config.red_team_capability);
        assert_eq!(config.scan_policy_mode, ScanPolicyMode::Enforce);
        assert!(!config.ai_scan_fail_open);
        assert!(config.max_artifact_bytes.is_none());
    }

    #[test]
    fn test_env_flag_spellings() {
        std::env::set_var("CALCSMITH_TEST_FLAG_A", "TRUE");
        std::env::set_var("CALCSMITH_TEST_FLAG_B", "0");
        assert!(env_flag("CALCSMITH_TEST_FLAG_A"));
        assert!(!env_flag("CALCSMITH_TEST_FLAG_B"));
        assert!(!env_flag("CALCSMITH_TEST_FLAG_MISSING"));
    }
}
