//! Request Context: per-request identity for tracing
use std::collections::HashMap;

use serde_json::Value;

/// Carried through one pipeline run; never persisted.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub trace_id: String,
    pub metadata: HashMap<String, Value>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            trace_id: uuid::Uuid::new_v4().to_string(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_trace_id(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            metadata: HashMap::new(),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
