//! Calcsmith Pipeline: generation with the safety gates in front
//!
//! The public surface of the workspace. A [`Pipeline`] owns a completion
//! backend plus the active policy and runtime config, and exposes the four
//! operations callers use:
//!
//! - [`Pipeline::classify`]: prompt classification only
//! - [`Pipeline::generate`]: generation plus both scans, no arbiter
//! - [`Pipeline::submit`]: the full arbiter-gated flow
//! - [`calcsmith_policy::evaluate_scan_policy`] / [`calcsmith_policy::scan_artifact`]:
//!   re-exported pure functions
//!
//! ```no_run
//! use calcsmith_gateway::{CompletionClient, GatewayConfig};
//! use calcsmith_pipeline::{GenerationRequest, Pipeline, SubmitOutcome};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConfig::from_env();
//! let model = config.default_model.clone();
//! let pipeline = Pipeline::new(CompletionClient::new(config)?, model);
//!
//! match pipeline.submit(&GenerationRequest::new("tip calculator")).await? {
//!     SubmitOutcome::Completed { artifact, .. } => println!("{}", artifact.content_hash),
//!     SubmitOutcome::Refused(refusal) => println!("refused: {}", refusal),
//!     _ => println!("resubmit with proceed=true"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod execution_model;
pub mod generator;
pub mod prompts;
pub mod unwrap;

pub use execution_model::execution_model_hint;
pub use generator::{
    GeneratedArtifact, GenerateOutcome, GenerationRequest, Pipeline, PipelineError, SubmitOutcome,
};
pub use prompts::SAFE_EVALUATOR_TOKEN;

// The pure decision functions are part of the exposed surface.
pub use calcsmith_core::{is_valid_manifest, ExecutionModel, RefusalCode, RefusalReason};
pub use calcsmith_policy::{evaluate_scan_policy, scan_artifact, ScanPolicyMode, ScanReport};
pub use calcsmith_scan::PromptScanDecision;
