//! Shared fixtures: a scripted completion backend and compliant artifacts.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use calcsmith_gateway::{
    CallOptions, CompletionBackend, CompletionRequest, CompletionResult, GatewayError,
    ProviderResponse,
};
use calcsmith_policy::ScanPolicy;

/// Scripted backend; clones share the reply queue and call record, so a test
/// can keep a handle while the pipeline owns the other.
#[derive(Clone)]
pub struct ScriptedBackend {
    inner: Arc<Inner>,
}

struct Inner {
    replies: Mutex<VecDeque<Result<Value, GatewayError>>>,
    calls: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<Result<Value, GatewayError>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.inner.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.calls.lock().unwrap().len()
    }
}

impl CompletionBackend for ScriptedBackend {
    fn call_value(
        &self,
        request: CompletionRequest,
        _options: CallOptions,
    ) -> impl Future<Output = Result<CompletionResult<Value>, GatewayError>> + Send {
        self.inner.calls.lock().unwrap().push(request);
        let reply = self
            .inner
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

pub fn banner() -> String {
    ScanPolicy::builtin().required_banner_text
}

const EXPRESSION_SCRIPT: &str = "\
function safeEvaluate(expr){var total=Number(expr);return isNaN(total)?0:total;}\
document.getElementById('go').addEventListener('click',function(){\
document.getElementById('out').textContent=String(safeEvaluate(document.getElementById('expr').value));});";

const FORM_SCRIPT: &str = "\
document.getElementById('go').addEventListener('click',function(){\
var rpm=Number(document.getElementById('rpm').value);\
var chip=Number(document.getElementById('chip').value);\
document.getElementById('out').textContent=String(rpm*chip);});";

fn page(body: &str, script: &str) -> String {
    format!(
        concat!(
            "<!DOCTYPE html><html><head>",
            "<meta http-equiv=\"Content-Security-Policy\" content=\"default-src 'none'; ",
            "script-src 'unsafe-inline'; style-src 'unsafe-inline'\">",
            "<title>Calculator</title></head><body>",
            "{}",
            "<p class=\"banner\">{}</p>",
            "<script>{}</script>",
            "</body></html>"
        ),
        body,
        banner(),
        script
    )
}

/// Compliant expression-model artifact HTML.
pub fn expression_html() -> String {
    page(
        "<div><input id=\"expr\" aria-label=\"expression\"><button id=\"go\">=</button><div id=\"out\"></div></div>",
        EXPRESSION_SCRIPT,
    )
}

/// Compliant form-model artifact HTML, with a bare button for the
/// postprocessor to fix.
pub fn form_html() -> String {
    page(
        concat!(
            "<form><label>RPM <input id=\"rpm\"></label>",
            "<label>Chip load <input id=\"chip\"></label>",
            "<button id=\"go\">Compute</button></form><div id=\"out\"></div>"
        ),
        FORM_SCRIPT,
    )
}

/// Expression artifact with a custom script body.
pub fn expression_html_with_script(script: &str) -> String {
    page(
        "<div><input id=\"expr\"><button id=\"go\">=</button><div id=\"out\"></div></div>",
        script,
    )
}

pub fn manifest(title: &str, execution_model: &str) -> Value {
    json!({
        "specVersion": "1.0",
        "title": title,
        "executionModel": execution_model,
        "capabilities": { "network": false }
    })
}

pub fn generation_reply(html: &str, manifest: Value) -> Value {
    json!({ "artifactHtml": html, "manifest": manifest })
}

pub fn code_scan_clean() -> Value {
    json!({ "isSafe": true, "issues": [] })
}

pub fn classifier_allow() -> Value {
    json!({
        "allowed": true,
        "refusalCode": null,
        "reason": "in-policy calculator request",
        "safeAlternative": ""
    })
}

pub fn classifier_deny() -> Value {
    json!({
        "allowed": false,
        "refusalCode": "OFF_TOPIC",
        "reason": "not a calculator request",
        "safeAlternative": "Try a percentage calculator instead."
    })
}
