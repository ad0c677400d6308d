//! Scripted completion backend for tests.
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;

use serde_json::Value;

use calcsmith_gateway::{
    CallOptions, CompletionBackend, CompletionRequest, CompletionResult, GatewayError,
    ProviderResponse,
};

pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<Value, GatewayError>>>,
    calls: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<Result<Value, GatewayError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().unwrap().clone()
    }
}

impl CompletionBackend for ScriptedBackend {
    fn call_value(
        &self,
        request: CompletionRequest,
        _options: CallOptions,
    ) -> impl Future<Output = Result<CompletionResult<Value>, GatewayError>> + Send {
        self.calls.lock().unwrap().push(request);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("scripted backend exhausted");
        async move {
            reply.map(|parsed| CompletionResult {
                parsed,
                raw: ProviderResponse::default(),
                usage: None,
                downgraded: false,
            })
        }
    }
}
