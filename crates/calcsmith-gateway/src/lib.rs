//! Calcsmith Gateway: the one component that talks to the model provider
//!
//! Everything untrusted enters the system through here. The gateway owns
//! retry/backoff, the structured-output compatibility shim, and lenient JSON
//! extraction from model text. Callers never see raw provider errors, only
//! the three-way taxonomy in [`GatewayError`].

pub mod client;
pub mod error;
pub mod extract;
pub mod request;
pub mod response;

pub use client::{
    backoff_delay_ms, CallOptions, CompletionBackend, CompletionClient, CompletionResult,
    GatewayConfig,
};
pub use error::GatewayError;
pub use extract::{balanced_object_candidates, bounded_snippet, extract_json, strip_code_fences};
pub use request::{CompletionMessage, CompletionRequest, OutputFormat, Role};
pub use response::{merge_usage, ContentFragment, OutputItem, ProviderResponse, TokenUsage};
