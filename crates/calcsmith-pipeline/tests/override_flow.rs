//! Submission scenarios: the arbiter in front of the classifier and
//! generator, with capability gating and the warn/skip resubmission states.

mod common;

use common::*;

use calcsmith_gateway::GatewayError;
use calcsmith_pipeline::{GenerationRequest, Pipeline, RefusalCode, SubmitOutcome};
use calcsmith_policy::{RuntimeConfig, ScanOutcomeTag, ScanPolicy, ScanPolicyMode};

fn pipeline_with(
    backend: ScriptedBackend,
    capability: bool,
    mode: ScanPolicyMode,
) -> Pipeline<ScriptedBackend> {
    let config = RuntimeConfig {
        red_team_capability: capability,
        scan_policy_mode: mode,
        ai_scan_fail_open: false,
        max_artifact_bytes: None,
    };
    Pipeline::new(backend, "test-model")
        .with_policy(ScanPolicy::builtin())
        .with_config(config)
}

fn good_generation_replies() -> Vec<Result<serde_json::Value, GatewayError>> {
    vec![
        Ok(generation_reply(&expression_html(), manifest("Calc", "expression"))),
        Ok(code_scan_clean()),
    ]
}

// =============================================================================
// Enforce mode
// =============================================================================

#[tokio::test]
async fn test_enforce_allowed_prompt_completes() {
    let mut replies = vec![Ok(classifier_allow())];
    replies.extend(good_generation_replies());
    let backend = ScriptedBackend::new(replies);
    let handle = backend.clone();
    let pipeline = pipeline_with(backend, false, ScanPolicyMode::Enforce);

    let outcome = pipeline.submit(&GenerationRequest::new("basic calculator")).await.unwrap();
    match outcome {
        SubmitOutcome::Completed { scan_outcome, override_used, .. } => {
            assert_eq!(scan_outcome, ScanOutcomeTag::Allow);
            assert!(!override_used);
        }
        other => panic!("expected completion, got {:?}", other),
    }
    // classifier + generation + code scan
    assert_eq!(handle.call_count(), 3);
}

#[tokio::test]
async fn test_enforce_denied_prompt_is_blocked() {
    let backend = ScriptedBackend::new(vec![Ok(classifier_deny())]);
    let handle = backend.clone();
    let pipeline = pipeline_with(backend, false, ScanPolicyMode::Enforce);

    let outcome = pipeline.submit(&GenerationRequest::new("track my visitors")).await.unwrap();
    match outcome {
        SubmitOutcome::Refused(refusal) => {
            assert_eq!(refusal.code, RefusalCode::PromptRejected);
            assert_eq!(refusal.safe_alternative, "Try a percentage calculator instead.");
        }
        other => panic!("expected refusal, got {:?}", other),
    }
    // Generation never ran.
    assert_eq!(handle.call_count(), 1);
}

#[tokio::test]
async fn test_enforce_ignores_armed_and_proceed() {
    let backend = ScriptedBackend::new(vec![Ok(classifier_deny())]);
    let pipeline = pipeline_with(backend, true, ScanPolicyMode::Enforce);

    let request = GenerationRequest::new("x").with_armed(true).with_proceed(true);
    let outcome = pipeline.submit(&request).await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Refused(_)));
}

// =============================================================================
// Capability gating
// =============================================================================

#[tokio::test]
async fn test_armed_without_capability_is_forced_enforce() {
    // Off mode configured, request fully armed, but no capability: the
    // classifier still runs and a denial still blocks.
    let backend = ScriptedBackend::new(vec![Ok(classifier_deny())]);
    let handle = backend.clone();
    let pipeline = pipeline_with(backend, false, ScanPolicyMode::Off);

    let request = GenerationRequest::new("x").with_armed(true).with_proceed(true);
    let outcome = pipeline.submit(&request).await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Refused(_)));
    assert_eq!(handle.call_count(), 1);
}

// =============================================================================
// Off mode
// =============================================================================

#[tokio::test]
async fn test_off_armed_without_proceed_requires_confirmation() {
    let backend = ScriptedBackend::new(vec![]);
    let handle = backend.clone();
    let pipeline = pipeline_with(backend, true, ScanPolicyMode::Off);

    let request = GenerationRequest::new("basic calculator").with_armed(true);
    let outcome = pipeline.submit(&request).await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::SkipRequiresProceed));
    // The classifier never even ran.
    assert_eq!(handle.call_count(), 0);
}

#[tokio::test]
async fn test_off_armed_with_proceed_skips_classifier_entirely() {
    let backend = ScriptedBackend::new(good_generation_replies());
    let handle = backend.clone();
    let pipeline = pipeline_with(backend, true, ScanPolicyMode::Off);

    let request = GenerationRequest::new("basic calculator").with_armed(true).with_proceed(true);
    let outcome = pipeline.submit(&request).await.unwrap();
    match outcome {
        SubmitOutcome::Completed { scan_outcome, override_used, .. } => {
            assert_eq!(scan_outcome, ScanOutcomeTag::Skipped);
            assert!(override_used);
        }
        other => panic!("expected completion, got {:?}", other),
    }
    // generation + code scan only, no classifier
    assert_eq!(handle.call_count(), 2);
}

#[tokio::test]
async fn test_off_unarmed_still_classifies() {
    let mut replies = vec![Ok(classifier_allow())];
    replies.extend(good_generation_replies());
    let backend = ScriptedBackend::new(replies);
    let handle = backend.clone();
    let pipeline = pipeline_with(backend, true, ScanPolicyMode::Off);

    let outcome = pipeline.submit(&GenerationRequest::new("basic calculator")).await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Completed { .. }));
    assert_eq!(handle.call_count(), 3);
}

// =============================================================================
// Warn mode
// =============================================================================

#[tokio::test]
async fn test_warn_denied_armed_returns_warning_with_details() {
    let backend = ScriptedBackend::new(vec![Ok(classifier_deny())]);
    let pipeline = pipeline_with(backend, true, ScanPolicyMode::Warn);

    let request = GenerationRequest::new("x").with_armed(true);
    let outcome = pipeline.submit(&request).await.unwrap();
    match outcome {
        SubmitOutcome::WarnRequiresProceed { decision } => {
            assert!(!decision.allowed);
            assert_eq!(decision.refusal_code.as_deref(), Some("OFF_TOPIC"));
        }
        other => panic!("expected warn, got {:?}", other),
    }
}

#[tokio::test]
async fn test_warn_denied_armed_proceed_generates_anyway() {
    let mut replies = vec![Ok(classifier_deny())];
    replies.extend(good_generation_replies());
    let backend = ScriptedBackend::new(replies);
    let pipeline = pipeline_with(backend, true, ScanPolicyMode::Warn);

    let request = GenerationRequest::new("x").with_armed(true).with_proceed(true);
    let outcome = pipeline.submit(&request).await.unwrap();
    match outcome {
        SubmitOutcome::Completed { scan_outcome, override_used, .. } => {
            assert_eq!(scan_outcome, ScanOutcomeTag::Deny);
            assert!(override_used);
        }
        other => panic!("expected completion, got {:?}", other),
    }
}

#[tokio::test]
async fn test_warn_denied_unarmed_blocks() {
    let backend = ScriptedBackend::new(vec![Ok(classifier_deny())]);
    let pipeline = pipeline_with(backend, true, ScanPolicyMode::Warn);

    let outcome = pipeline.submit(&GenerationRequest::new("x")).await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Refused(_)));
}

// =============================================================================
// Failure and audit behavior
// =============================================================================

#[tokio::test]
async fn test_classifier_failure_is_an_error_not_an_allow() {
    let backend =
        ScriptedBackend::new(vec![Err(GatewayError::Transport("provider down".into()))]);
    let pipeline = pipeline_with(backend, false, ScanPolicyMode::Enforce);

    assert!(pipeline.submit(&GenerationRequest::new("basic calculator")).await.is_err());
}

#[tokio::test]
async fn test_audit_log_records_decisions() {
    let mut replies = vec![Ok(classifier_deny()), Ok(classifier_deny())];
    replies.extend(good_generation_replies());
    let backend = ScriptedBackend::new(replies);
    let pipeline = pipeline_with(backend, true, ScanPolicyMode::Warn);

    // One warn, then one override continue.
    let armed = GenerationRequest::new("x").with_armed(true);
    pipeline.submit(&armed).await.unwrap();
    let proceed = GenerationRequest::new("x").with_armed(true).with_proceed(true);
    pipeline.submit(&proceed).await.unwrap();

    let stats = pipeline.audit_stats();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.warns, 1);
    assert_eq!(stats.overrides_used, 1);
}
