//! End-to-end artifact generation
//!
//! One request runs sequentially: arbiter → classifier → generation (with at
//! most one repair call and one corrective regeneration) → deterministic
//! scan → AI code scan. Policy refusals are values; errors are reserved for
//! transport, parse, and internal failures.

use std::sync::Mutex;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use calcsmith_core::{
    ensure_form_safety, ensure_ready_bootstrap, seal_manifest, validate_manifest, CoreError,
    ExecutionModel, RefusalCode, RefusalReason, RequestContext, SealedArtifact,
};
use calcsmith_gateway::{
    merge_usage, CallOptions, CompletionBackend, CompletionMessage, CompletionRequest,
    GatewayError, OutputFormat, TokenUsage,
};
use calcsmith_policy::{
    classifier_required, evaluate_scan_policy, scan_artifact, ArbiterAuditLog, ArbiterAuditStats,
    RuntimeConfig, ScanCode, ScanOutcomeTag, ScanOverrideDecision, ScanPolicy, ScanReport,
    ScanViolation,
};
use calcsmith_scan::{classify_prompt, scan_generated_code, PromptScanDecision, ScanError};

use crate::execution_model::execution_model_hint;
use crate::prompts::{
    corrective_instruction, execution_model_directive, generation_schema, generation_system,
    REPAIR_INSTRUCTION, SAFE_EVALUATOR_TOKEN,
};
use crate::unwrap::{looks_like_generation, refusal_sentinel, unwrap_generation_value};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("PIPELINE/GATEWAY: {0}")]
    Gateway(#[from] GatewayError),

    #[error("PIPELINE/SCAN: {0}")]
    Scan(#[from] ScanError),

    #[error("PIPELINE/INTERNAL: {0}")]
    Internal(#[from] CoreError),
}

/// One caller request, with the untrusted override flags.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Dev-override armed flag; ignored without the environment capability
    pub armed: bool,
    /// Explicit confirmation for warn/skip resubmission
    pub proceed: bool,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self { prompt: prompt.into(), armed: false, proceed: false }
    }

    pub fn with_armed(mut self, armed: bool) -> Self {
        self.armed = armed;
        self
    }

    pub fn with_proceed(mut self, proceed: bool) -> Self {
        self.proceed = proceed;
        self
    }
}

/// A persist-ready artifact.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedArtifact {
    pub manifest: Value,
    pub artifact_html: String,
    pub content_hash: String,
    pub execution_model: ExecutionModel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

/// Generation endpoint outcome: either a complete artifact or a refusal.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GenerateOutcome {
    Completed(GeneratedArtifact),
    Refused(RefusalReason),
}

/// Full submission outcome, including the arbiter's resubmission states.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    Completed {
        artifact: GeneratedArtifact,
        scan_outcome: ScanOutcomeTag,
        override_used: bool,
    },
    Refused(RefusalReason),
    /// Denied under warn mode; resubmit with proceed=true to continue
    WarnRequiresProceed { decision: PromptScanDecision },
    /// Scanning disabled; resubmit with proceed=true to continue
    SkipRequiresProceed,
}

enum GenStep {
    Refused(RefusalReason),
    Clean { sealed: SealedArtifact, usage: Option<TokenUsage> },
    Retriable { violation: ScanViolation, usage: Option<TokenUsage> },
}

/// The generation safety pipeline.
pub struct Pipeline<B: CompletionBackend> {
    backend: B,
    model: String,
    policy: ScanPolicy,
    config: RuntimeConfig,
    audit: Mutex<ArbiterAuditLog>,
}

impl<B: CompletionBackend> Pipeline<B> {
    /// Pipeline over the process-wide policy and config singletons.
    pub fn new(backend: B, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            policy: ScanPolicy::current().clone(),
            config: RuntimeConfig::current().clone(),
            audit: Mutex::new(ArbiterAuditLog::new()),
        }
    }

    pub fn with_policy(mut self, policy: ScanPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn audit_stats(&self) -> ArbiterAuditStats {
        self.audit.lock().expect("audit lock").stats()
    }

    /// Classify a prompt without generating.
    pub async fn classify(&self, prompt: &str) -> Result<PromptScanDecision, PipelineError> {
        Ok(classify_prompt(&self.backend, &self.model, prompt).await?)
    }

    /// Full submission: arbiter, classifier, generation, both scans.
    pub async fn submit(&self, request: &GenerationRequest) -> Result<SubmitOutcome, PipelineError> {
        let ctx = RequestContext::new();
        let mode = self.config.scan_policy_mode;
        let capability = self.config.red_team_capability;

        let mut classifier_decision: Option<PromptScanDecision> = None;
        let prompt_denied = if classifier_required(mode, capability, request.armed) {
            let decision = self.classify(&request.prompt).await?;
            let denied = decision.is_denied();
            classifier_decision = Some(decision);
            denied
        } else {
            debug!(trace_id = %ctx.trace_id, "scan disabled and armed, classifier skipped");
            false
        };

        let decision =
            evaluate_scan_policy(mode, capability, request.armed, request.proceed, prompt_denied);
        self.audit.lock().expect("audit lock").record(
            ctx.trace_id.clone(),
            mode,
            capability,
            request.armed,
            request.proceed,
            prompt_denied,
            decision,
        );
        info!(trace_id = %ctx.trace_id, ?decision, "scan policy decision");

        match decision {
            ScanOverrideDecision::ScanBlock => {
                Ok(SubmitOutcome::Refused(prompt_refusal(classifier_decision)))
            }
            ScanOverrideDecision::ScanWarn => match classifier_decision {
                Some(decision) => Ok(SubmitOutcome::WarnRequiresProceed { decision }),
                None => Ok(SubmitOutcome::Refused(prompt_refusal(None))),
            },
            ScanOverrideDecision::ScanSkipped => Ok(SubmitOutcome::SkipRequiresProceed),
            ScanOverrideDecision::Continue { outcome, override_used } => {
                match self.generate(&request.prompt).await? {
                    GenerateOutcome::Completed(artifact) => Ok(SubmitOutcome::Completed {
                        artifact,
                        scan_outcome: outcome,
                        override_used,
                    }),
                    GenerateOutcome::Refused(refusal) => Ok(SubmitOutcome::Refused(refusal)),
                }
            }
        }
    }

    /// Generation only: no arbiter, no prompt classifier.
    pub async fn generate(&self, prompt: &str) -> Result<GenerateOutcome, PipelineError> {
        let hint = execution_model_hint(prompt);
        let mut corrective: Option<String> = None;
        let mut usage: Option<TokenUsage> = None;
        let mut attempt = 0u32;

        loop {
            match self.generate_once(prompt, hint, corrective.as_deref()).await? {
                GenStep::Refused(refusal) => return Ok(GenerateOutcome::Refused(refusal)),
                GenStep::Retriable { violation, usage: step_usage } => {
                    usage = merge_usage(usage, step_usage);
                    if attempt == 0 {
                        let pattern = violation
                            .matched_pattern
                            .clone()
                            .unwrap_or_else(|| "new Function".to_string());
                        warn!(
                            rule = violation.rule_id.as_deref(),
                            "retriable banned token in generation, regenerating once"
                        );
                        corrective = Some(corrective_instruction(&pattern));
                        attempt += 1;
                        continue;
                    }
                    return Ok(GenerateOutcome::Refused(refusal_from_violation(&violation)));
                }
                GenStep::Clean { sealed, usage: step_usage } => {
                    usage = merge_usage(usage, step_usage);
                    return self.run_code_scan(sealed, hint, usage).await;
                }
            }
        }
    }

    /// One generation attempt through the deterministic scan.
    async fn generate_once(
        &self,
        prompt: &str,
        hint: ExecutionModel,
        corrective: Option<&str>,
    ) -> Result<GenStep, PipelineError> {
        let mut messages = vec![
            CompletionMessage::system(generation_system(&self.policy)),
            CompletionMessage::system(execution_model_directive(hint)),
        ];
        if let Some(instruction) = corrective {
            messages.push(CompletionMessage::system(instruction));
        }
        messages.push(CompletionMessage::user(prompt));

        let (payload, usage) = self.call_generation(messages).await?;

        if let Some(reason) = refusal_sentinel(&payload) {
            info!("model emitted the refusal sentinel");
            return Ok(GenStep::Refused(RefusalReason::new(RefusalCode::ModelRefused, reason)));
        }

        let artifact_html = match payload.get("artifactHtml").and_then(Value::as_str) {
            Some(html) => html.to_string(),
            None => {
                return Err(GatewayError::Parse("generation payload lost artifactHtml".into()).into())
            }
        };
        let manifest = payload.get("manifest").cloned().unwrap_or(Value::Null);

        if let Err(violation) = validate_manifest(&manifest) {
            return Ok(GenStep::Refused(
                RefusalReason::new(RefusalCode::InvalidManifest, violation.to_string())
                    .with_details(serde_json::to_value(&violation).unwrap_or(Value::Null)),
            ));
        }

        let max_bytes = self.config.max_artifact_bytes.unwrap_or(self.policy.max_artifact_bytes);
        // UTF-8 byte length, not chars: the persistence ceiling is in bytes.
        if artifact_html.len() > max_bytes {
            return Ok(GenStep::Refused(too_large(artifact_html.len(), max_bytes, "pre-embed")));
        }

        let processed = ensure_ready_bootstrap(&ensure_form_safety(&artifact_html));
        let sealed = seal_manifest(&processed, &manifest)?;

        if sealed.artifact_html.len() > max_bytes {
            return Ok(GenStep::Refused(too_large(
                sealed.artifact_html.len(),
                max_bytes,
                "post-embed",
            )));
        }

        if hint == ExecutionModel::Expression
            && !sealed.artifact_html.contains(SAFE_EVALUATOR_TOKEN)
        {
            return Ok(GenStep::Refused(RefusalReason::new(
                RefusalCode::MissingSafeEvaluator,
                "expression calculator does not call the safe evaluator",
            )));
        }

        match scan_artifact(&sealed.artifact_html, &self.policy) {
            ScanReport::Clean => Ok(GenStep::Clean { sealed, usage }),
            ScanReport::Failed(violation) => {
                let retriable = violation
                    .rule_id
                    .as_deref()
                    .map(|rule| self.policy.is_retriable_rule(rule))
                    .unwrap_or(false);
                if retriable {
                    Ok(GenStep::Retriable { violation, usage })
                } else {
                    Ok(GenStep::Refused(refusal_from_violation(&violation)))
                }
            }
        }
    }

    /// The generation call with its single repair retry.
    async fn call_generation(
        &self,
        messages: Vec<CompletionMessage>,
    ) -> Result<(Value, Option<TokenUsage>), PipelineError> {
        let mut usage: Option<TokenUsage> = None;

        match self
            .backend
            .call_value(self.generation_request(messages.clone()), CallOptions::default())
            .await
        {
            Ok(result) => {
                usage = merge_usage(usage, result.usage.clone());
                let unwrapped = unwrap_generation_value(&result.parsed);
                if looks_like_generation(unwrapped) || refusal_sentinel(unwrapped).is_some() {
                    return Ok((unwrapped.clone(), usage));
                }
                debug!("generation payload unrecognized, issuing repair call");
            }
            Err(err) if err.is_parse() => {
                debug!("generation output unparseable, issuing repair call");
            }
            Err(err) => return Err(err.into()),
        }

        // Exactly one repair attempt, then surface the failure.
        let mut repair_messages = messages;
        repair_messages.push(CompletionMessage::system(REPAIR_INSTRUCTION));
        let result = self
            .backend
            .call_value(self.generation_request(repair_messages), CallOptions::default())
            .await?;
        usage = merge_usage(usage, result.usage.clone());

        let unwrapped = unwrap_generation_value(&result.parsed);
        if looks_like_generation(unwrapped) || refusal_sentinel(unwrapped).is_some() {
            return Ok((unwrapped.clone(), usage));
        }
        Err(GatewayError::Parse(
            "generation output did not match the expected shape after repair".to_string(),
        )
        .into())
    }

    fn generation_request(&self, messages: Vec<CompletionMessage>) -> CompletionRequest {
        let mut request = CompletionRequest::new(&self.model)
            .with_max_output_tokens(8192)
            .with_output_format(OutputFormat::json_schema("calculator_artifact", generation_schema()));
        request.messages = messages;
        request
    }

    /// AI code scan over a deterministically-clean artifact.
    async fn run_code_scan(
        &self,
        sealed: SealedArtifact,
        hint: ExecutionModel,
        usage: Option<TokenUsage>,
    ) -> Result<GenerateOutcome, PipelineError> {
        match scan_generated_code(
            &self.backend,
            &self.model,
            &sealed.artifact_html,
            &self.policy.required_banner_text,
        )
        .await
        {
            Ok(report) => {
                let usage = merge_usage(usage, report.usage.clone());
                if report.is_disallowed() {
                    let details =
                        serde_json::to_value(&report.triage.disallowed).unwrap_or(Value::Null);
                    return Ok(GenerateOutcome::Refused(
                        RefusalReason::new(
                            RefusalCode::UnsafeContent,
                            "AI code scan flagged disallowed content",
                        )
                        .with_details(details),
                    ));
                }
                debug!(
                    allowed = report.triage.allowed.len(),
                    ignored = report.triage.ignored.len(),
                    uncategorized = report.triage.uncategorized.len(),
                    "code scan passed"
                );
                Ok(GenerateOutcome::Completed(completed(sealed, hint, usage)))
            }
            Err(err) => {
                if self.config.ai_scan_fail_open {
                    warn!(error = %err, "AI code scan unavailable, failing open");
                    return Ok(GenerateOutcome::Completed(completed(sealed, hint, usage)));
                }
                warn!(error = %err, "AI code scan unavailable, failing closed");
                Ok(GenerateOutcome::Refused(RefusalReason::new(
                    RefusalCode::ScanUnavailable,
                    format!("code scan unavailable: {}", err),
                )))
            }
        }
    }
}

fn completed(
    sealed: SealedArtifact,
    hint: ExecutionModel,
    usage: Option<TokenUsage>,
) -> GeneratedArtifact {
    GeneratedArtifact {
        manifest: sealed.manifest,
        artifact_html: sealed.artifact_html,
        content_hash: sealed.content_hash,
        execution_model: hint,
        usage,
    }
}

fn too_large(actual: usize, ceiling: usize, phase: &str) -> RefusalReason {
    RefusalReason::new(
        RefusalCode::ArtifactTooLarge,
        format!("artifact is {} bytes ({}), ceiling is {}", actual, phase, ceiling),
    )
    .with_details(serde_json::json!({ "bytes": actual, "maxBytes": ceiling, "phase": phase }))
}

fn prompt_refusal(decision: Option<PromptScanDecision>) -> RefusalReason {
    match decision {
        Some(decision) => {
            let mut refusal = RefusalReason::new(RefusalCode::PromptRejected, decision.reason.clone());
            if !decision.safe_alternative.trim().is_empty() {
                refusal = refusal.with_safe_alternative(decision.safe_alternative.clone());
            }
            refusal.with_details(serde_json::json!({
                "refusalCode": decision.refusal_code,
            }))
        }
        None => RefusalReason::new(RefusalCode::PromptRejected, "prompt rejected by policy"),
    }
}

fn refusal_from_violation(violation: &ScanViolation) -> RefusalReason {
    let code = match violation.code {
        ScanCode::MissingCsp => RefusalCode::MissingCsp,
        ScanCode::MissingBanner => RefusalCode::MissingBanner,
        ScanCode::BannedPattern => RefusalCode::BannedPattern,
        ScanCode::BannedTag => RefusalCode::BannedTag,
    };
    let mut refusal = RefusalReason::new(code, violation.message.clone());
    if let (Some(index), Some(snippet)) = (violation.match_index, violation.context_snippet.clone())
    {
        refusal = refusal.with_match(index, snippet);
    }
    if let Some(rule_id) = &violation.rule_id {
        refusal = refusal.with_details(serde_json::json!({ "ruleId": rule_id }));
    }
    refusal
}
