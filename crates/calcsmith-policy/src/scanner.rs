//! Deterministic artifact scanner
//!
//! Substring/tag matching over final HTML against the scan policy. Required
//! markers are checked before banned content, and the first banned match
//! wins. No I/O, no regex backtracking surprises: plain substring search
//! over an ASCII-lowercased copy, with case-sensitive rules matched against
//! the original text.

use serde::Serialize;

use crate::store::{ScanPolicy, BannedPatternRule};

/// Characters of context on each side of a reported match.
const SNIPPET_RADIUS: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanCode {
    MissingCsp,
    MissingBanner,
    BannedPattern,
    BannedTag,
}

/// A failed scan, with enough context to debug without dumping the artifact.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanViolation {
    pub code: ScanCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_snippet: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ScanReport {
    Clean,
    Failed(ScanViolation),
}

impl ScanReport {
    pub fn is_clean(&self) -> bool {
        matches!(self, ScanReport::Clean)
    }

    pub fn violation(&self) -> Option<&ScanViolation> {
        match self {
            ScanReport::Clean => None,
            ScanReport::Failed(violation) => Some(violation),
        }
    }
}

/// Scan artifact HTML against the policy.
pub fn scan_artifact(html: &str, policy: &ScanPolicy) -> ScanReport {
    let lowered = html.to_ascii_lowercase();

    for directive in &policy.required_csp_directives {
        if !lowered.contains(&directive.to_ascii_lowercase()) {
            return ScanReport::Failed(ScanViolation {
                code: ScanCode::MissingCsp,
                rule_id: None,
                message: format!("required CSP directive marker absent: {}", directive),
                matched_pattern: None,
                match_index: None,
                context_snippet: None,
            });
        }
    }

    if !lowered.contains(&policy.required_banner_text.to_ascii_lowercase()) {
        return ScanReport::Failed(ScanViolation {
            code: ScanCode::MissingBanner,
            rule_id: None,
            message: "required safety banner text absent".to_string(),
            matched_pattern: None,
            match_index: None,
            context_snippet: None,
        });
    }

    for rule in &policy.banned_pattern_rules {
        if let Some((index, pattern)) = match_pattern_rule(html, &lowered, rule) {
            return ScanReport::Failed(ScanViolation {
                code: ScanCode::BannedPattern,
                rule_id: Some(rule.id.clone()),
                message: format!("banned pattern \"{}\" (rule {})", pattern, rule.id),
                matched_pattern: Some(pattern.to_string()),
                match_index: Some(index),
                context_snippet: Some(context_snippet(html, index, pattern.len())),
            });
        }
    }

    for rule in &policy.banned_tag_rules {
        for tag in &rule.tags {
            if let Some(index) = find_tag(&lowered, tag) {
                return ScanReport::Failed(ScanViolation {
                    code: ScanCode::BannedTag,
                    rule_id: Some(rule.id.clone()),
                    message: format!("banned element <{}> (rule {})", tag, rule.id),
                    matched_pattern: Some(format!("<{}", tag)),
                    match_index: Some(index),
                    context_snippet: Some(context_snippet(html, index, tag.len() + 1)),
                });
            }
        }
    }

    ScanReport::Clean
}

fn match_pattern_rule<'a>(
    html: &str,
    lowered: &str,
    rule: &'a BannedPatternRule,
) -> Option<(usize, &'a str)> {
    for pattern in &rule.patterns {
        let index = if rule.case_sensitive {
            html.find(pattern.as_str())
        } else {
            lowered.find(&pattern.to_ascii_lowercase())
        };
        if let Some(index) = index {
            return Some((index, pattern.as_str()));
        }
    }
    None
}

/// Find `<tag` followed by a tag-boundary character, so `<link` does not
/// match inside `<linkage>`-style text.
fn find_tag(lowered: &str, tag: &str) -> Option<usize> {
    let needle = format!("<{}", tag.to_ascii_lowercase());
    let mut from = 0;
    while let Some(rel) = lowered[from..].find(&needle) {
        let index = from + rel;
        let after = index + needle.len();
        match lowered.as_bytes().get(after) {
            None | Some(b'>') | Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r')
            | Some(b'/') => return Some(index),
            _ => from = after,
        }
    }
    None
}

/// Bounded window around a match, clamped to char boundaries. ASCII
/// lowercasing preserves byte offsets, so indices map back to the original.
fn context_snippet(html: &str, index: usize, match_len: usize) -> String {
    let mut start = index.saturating_sub(SNIPPET_RADIUS);
    let mut end = (index + match_len + SNIPPET_RADIUS).min(html.len());
    while start > 0 && !html.is_char_boundary(start) {
        start -= 1;
    }
    while end < html.len() && !html.is_char_boundary(end) {
        end += 1;
    }
    html[start..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ScanPolicy;

    fn policy() -> ScanPolicy {
        ScanPolicy::builtin()
    }

    fn compliant_html() -> String {
        format!(
            concat!(
                "<html><head>",
                "<meta http-equiv=\"Content-Security-Policy\" content=\"default-src 'none'; ",
                "script-src 'unsafe-inline'; style-src 'unsafe-inline'\">",
                "</head><body>",
                "<p>{}</p>",
                "<script>var x = 1 + 2;</script>",
                "</body></html>"
            ),
            policy().required_banner_text
        )
    }

    #[test]
    fn test_compliant_html_is_clean() {
        assert!(scan_artifact(&compliant_html(), &policy()).is_clean());
    }

    #[test]
    fn test_missing_csp_reported_first() {
        // Strip the CSP meta and plant a banned pattern: the marker check
        // must win.
        let html = compliant_html()
            .replace("default-src 'none'; ", "")
            .replace("var x = 1 + 2;", "eval('1+2');");
        let report = scan_artifact(&html, &policy());
        assert_eq!(report.violation().unwrap().code, ScanCode::MissingCsp);
    }

    #[test]
    fn test_each_missing_directive_detected() {
        let policy = policy();
        for directive in &policy.required_csp_directives {
            let html = compliant_html().replace(directive.as_str(), "");
            let report = scan_artifact(&html, &policy);
            assert_eq!(
                report.violation().unwrap().code,
                ScanCode::MissingCsp,
                "directive not detected: {}",
                directive
            );
        }
    }

    #[test]
    fn test_missing_banner() {
        let html = compliant_html().replace(&policy().required_banner_text, "no banner here");
        let report = scan_artifact(&html, &policy());
        assert_eq!(report.violation().unwrap().code, ScanCode::MissingBanner);
    }

    #[test]
    fn test_banned_pattern_case_insensitive() {
        let html = compliant_html().replace("var x = 1 + 2;", "window.Fetch('https://x')");
        let report = scan_artifact(&html, &policy());
        let violation = report.violation().unwrap();
        assert_eq!(violation.code, ScanCode::BannedPattern);
        assert_eq!(violation.rule_id.as_deref(), Some("network-calls"));
    }

    #[test]
    fn test_constructor_rule_is_case_sensitive() {
        // Lowercase `function(` is ordinary JS and must pass.
        let ok = compliant_html().replace("var x = 1 + 2;", "var f = function(a) { return a; };");
        assert!(scan_artifact(&ok, &policy()).is_clean());

        let bad = compliant_html().replace("var x = 1 + 2;", "var f = new Function('return 1');");
        let report = scan_artifact(&bad, &policy());
        assert_eq!(
            report.violation().unwrap().rule_id.as_deref(),
            Some("function-constructor")
        );
    }

    #[test]
    fn test_string_timer_banned_but_callback_timer_fine() {
        let ok = compliant_html().replace("var x = 1 + 2;", "setTimeout(update, 100);");
        assert!(scan_artifact(&ok, &policy()).is_clean());

        let bad = compliant_html().replace("var x = 1 + 2;", "setTimeout(\"update()\", 100);");
        let report = scan_artifact(&bad, &policy());
        assert_eq!(report.violation().unwrap().rule_id.as_deref(), Some("string-timers"));
    }

    #[test]
    fn test_banned_tag_with_boundary() {
        let bad = compliant_html().replace("<p>", "<iframe src=\"x\"></iframe><p>");
        let report = scan_artifact(&bad, &policy());
        let violation = report.violation().unwrap();
        assert_eq!(violation.code, ScanCode::BannedTag);
        assert!(violation.match_index.is_some());
    }

    #[test]
    fn test_tag_prefix_does_not_false_positive() {
        // <basefont> must not trip the <base> rule.
        let html = compliant_html().replace("<p>", "<basefont size=\"2\"><p>");
        assert!(scan_artifact(&html, &policy()).is_clean());
    }

    #[test]
    fn test_first_match_wins_with_offset_and_snippet() {
        let bad = compliant_html()
            .replace("var x = 1 + 2;", "eval('a'); document.write('b');");
        let report = scan_artifact(&bad, &policy());
        let violation = report.violation().unwrap();
        assert_eq!(violation.rule_id.as_deref(), Some("dynamic-eval"));
        let snippet = violation.context_snippet.as_deref().unwrap();
        assert!(snippet.contains("eval('a')"));
        assert!(snippet.len() <= 2 * 60 + "eval(".len() + 8);
    }
}
