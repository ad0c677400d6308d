//! Lenient JSON extraction from model text
//!
//! Models wrap JSON in prose and code fences despite instructions. Extraction
//! runs three stages: direct parse, fence stripping, then a string/escape
//! aware scan for balanced `{...}` candidates. The scanner is an explicit
//! state machine, not a regex.

use serde_json::Value;

/// Strip a surrounding Markdown code fence (```json ... ``` or ``` ... ```).
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    let after_open = match trimmed.find('\n') {
        Some(idx) => &trimmed[idx + 1..],
        None => return trimmed,
    };
    match after_open.rfind("```") {
        Some(idx) => after_open[..idx].trim(),
        None => after_open.trim(),
    }
}

/// All balanced top-level `{...}` substrings, in order of appearance.
///
/// Brace depth is tracked outside of JSON strings only; `\"` inside a string
/// does not terminate it and `{`/`}` inside a string do not count.
pub fn balanced_object_candidates(text: &str) -> Vec<&str> {
    let mut candidates = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(idx);
                }
                depth += 1;
            }
            '}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        if let Some(s) = start.take() {
                            candidates.push(&text[s..idx + ch.len_utf8()]);
                        }
                    }
                }
            }
            _ => {}
        }
    }
    candidates
}

/// Extract a JSON object from model text: direct parse, then fence strip,
/// then the first balanced candidate that parses.
pub fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    let unfenced = strip_code_fences(trimmed);
    if unfenced != trimmed {
        if let Ok(value) = serde_json::from_str::<Value>(unfenced) {
            return Some(value);
        }
    }

    for candidate in balanced_object_candidates(unfenced) {
        if let Ok(value) = serde_json::from_str::<Value>(candidate) {
            return Some(value);
        }
    }
    None
}

/// Bounded prefix/suffix view of raw text for parse-failure logs.
pub fn bounded_snippet(text: &str, max: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max {
        return text.to_string();
    }
    let half = max / 2;
    let prefix: String = chars[..half].iter().collect();
    let suffix: String = chars[chars.len() - half..].iter().collect();
    format!("{}…{}", prefix, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_direct_parse() {
        assert_eq!(extract_json(r#"{"a": 1}"#).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_fenced_json() {
        let text = "```json\n{\"a\": 1}\n```";
        assert_eq!(extract_json(text).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_fence_without_language_tag() {
        let text = "```\n{\"b\": true}\n```";
        assert_eq!(extract_json(text).unwrap(), json!({"b": true}));
    }

    #[test]
    fn test_json_wrapped_in_prose() {
        let text = "Here is the result you asked for:\n{\"ok\": true}\nLet me know!";
        assert_eq!(extract_json(text).unwrap(), json!({"ok": true}));
    }

    #[test]
    fn test_braces_inside_strings_ignored() {
        let text = r#"noise {"html": "<div>{}</div>", "n": 1} trailing"#;
        assert_eq!(
            extract_json(text).unwrap(),
            json!({"html": "<div>{}</div>", "n": 1})
        );
    }

    #[test]
    fn test_escaped_quotes_inside_strings() {
        let text = r#"x {"s": "he said \"hi\" {"} y"#;
        assert_eq!(extract_json(text).unwrap(), json!({"s": "he said \"hi\" {"}));
    }

    #[test]
    fn test_first_parseable_candidate_wins() {
        let text = r#"{broken} {"good": 1}"#;
        assert_eq!(extract_json(text).unwrap(), json!({"good": 1}));
    }

    #[test]
    fn test_nested_objects_are_one_candidate() {
        let text = r#"{"outer": {"inner": 2}}"#;
        let candidates = balanced_object_candidates(text);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0], text);
    }

    #[test]
    fn test_no_json_at_all() {
        assert!(extract_json("the model apologizes instead").is_none());
    }

    #[test]
    fn test_unterminated_object_yields_nothing() {
        assert!(extract_json(r#"{"open": true"#).is_none());
    }

    #[test]
    fn test_bounded_snippet_short_text_unchanged() {
        assert_eq!(bounded_snippet("tiny", 40), "tiny");
    }

    #[test]
    fn test_bounded_snippet_truncates_middle() {
        let long = "a".repeat(50) + &"b".repeat(50);
        let snippet = bounded_snippet(&long, 20);
        assert!(snippet.starts_with("aaaaaaaaaa"));
        assert!(snippet.ends_with("bbbbbbbbbb"));
        assert!(snippet.contains('…'));
    }
}
