//! HTML postprocessing applied before final scanning
//!
//! Two idempotent rewrites over the generated document:
//! - form safety: neutralize default form submission so a stray Enter key
//!   cannot navigate the sandbox frame
//! - ready bootstrap: a fixed handshake script so the host page knows the
//!   artifact loaded

use once_cell::sync::Lazy;
use regex::Regex;

/// Element id of the injected submit-preventer script.
pub const SUBMIT_GUARD_ID: &str = "calc-submit-guard";

/// Element id of the injected ready-handshake script.
pub const READY_BOOTSTRAP_ID: &str = "calc-ready-bootstrap";

static BUTTON_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<button\b[^>]*>").expect("button regex"));

static HAS_FORM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<form\b").expect("form regex"));

static CSP_META: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta[^>]*\bhttp-equiv\s*=\s*["']content-security-policy["'][^>]*>"#)
        .expect("csp meta regex")
});

static HEAD_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<head\b[^>]*>").expect("head regex"));

static BODY_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<body\b[^>]*>").expect("body regex"));

const SUBMIT_GUARD_SCRIPT: &str = concat!(
    "<script id=\"calc-submit-guard\">",
    "document.addEventListener('submit',function(e){e.preventDefault();},true);",
    "</script>"
);

const READY_BOOTSTRAP_SCRIPT: &str = concat!(
    "<script id=\"calc-ready-bootstrap\">(function(){",
    "function post(m){if(window.parent&&window.parent!==window){window.parent.postMessage(m,'*');}}",
    "window.addEventListener('message',function(e){",
    "if(e.data&&e.data.type==='ping'){post({type:'pong'});}});",
    "post({type:'ready'});",
    "})();</script>"
);

/// Force every bare `<button>` to `type="button"` and install a capture-phase
/// submit preventer, when the document contains a `<form>`.
///
/// Browsers default button type to `submit`, so a generated form calculator
/// would reload the frame on click. Idempotent: buttons that already carry a
/// type attribute are left alone and the guard script is keyed by element id.
pub fn ensure_form_safety(html: &str) -> String {
    if !HAS_FORM.is_match(html) {
        return html.to_string();
    }

    let mut out = BUTTON_TAG
        .replace_all(html, |caps: &regex::Captures| {
            let tag = &caps[0];
            if tag.to_ascii_lowercase().contains("type=") {
                tag.to_string()
            } else {
                format!("<button type=\"button\"{}", &tag["<button".len()..])
            }
        })
        .into_owned();

    if !out.contains(SUBMIT_GUARD_ID) {
        out = insert_before_body_close(&out, SUBMIT_GUARD_SCRIPT);
    }
    out
}

/// Inject the ready/ping handshake bootstrap.
///
/// Insertion point, in preference order: directly after the CSP meta tag,
/// else after `<head>`, else after `<body>`, else prepended. Idempotent by
/// element id.
pub fn ensure_ready_bootstrap(html: &str) -> String {
    if html.contains(READY_BOOTSTRAP_ID) {
        return html.to_string();
    }

    if let Some(m) = CSP_META.find(html) {
        return splice(html, m.end(), READY_BOOTSTRAP_SCRIPT);
    }
    if let Some(m) = HEAD_OPEN.find(html) {
        return splice(html, m.end(), READY_BOOTSTRAP_SCRIPT);
    }
    if let Some(m) = BODY_OPEN.find(html) {
        return splice(html, m.end(), READY_BOOTSTRAP_SCRIPT);
    }
    format!("{}{}", READY_BOOTSTRAP_SCRIPT, html)
}

fn insert_before_body_close(html: &str, fragment: &str) -> String {
    match html.to_ascii_lowercase().find("</body>") {
        Some(idx) => splice(html, idx, fragment),
        None => format!("{}{}", html, fragment),
    }
}

fn splice(html: &str, at: usize, fragment: &str) -> String {
    let mut out = String::with_capacity(html.len() + fragment.len());
    out.push_str(&html[..at]);
    out.push_str(fragment);
    out.push_str(&html[at..]);
    out
}
