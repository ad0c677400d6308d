//! Calcsmith Core: Manifest, Artifact Sealing, and Refusals
//!
//! Shared data model for the generation safety pipeline. Everything in this
//! crate is a synchronous pure function over in-memory data.

pub mod artifact;
pub mod context;
pub mod error;
pub mod manifest;
pub mod postprocess;
pub mod refusal;

pub use artifact::{
    content_hash, embed_manifest, extract_manifest, seal_manifest, SealedArtifact,
    MANIFEST_ELEMENT_ID,
};
pub use context::RequestContext;
pub use error::CoreError;
pub use manifest::{
    is_valid_manifest, validate_manifest, ExecutionModel, ManifestViolation,
    SUPPORTED_SPEC_VERSION,
};
pub use postprocess::{ensure_form_safety, ensure_ready_bootstrap};
pub use refusal::{RefusalCode, RefusalReason};

/// Engine version reported in diagnostics
pub const CALCSMITH_VERSION: &str = "0.1.0";
