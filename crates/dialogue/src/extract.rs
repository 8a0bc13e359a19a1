//! JSON recovery from free-form model output.
//!
//! The model is instructed to answer with a single JSON object, but the
//! reassembled stream routinely carries prose around it, code fences,
//! or minor syntax damage. Recovery is two passes:
//!
//! 1. Scan for the first *balanced* `{...}` region, tracking nesting
//!    depth and string-escape state so braces inside string values and
//!    nested objects do not fool the scanner, and parse it strictly.
//! 2. On failure, run a lenient rewrite over the candidate (single
//!    quotes, bare keys, trailing commas, unterminated tails) and parse
//!    again, tagging the result as repaired.
//!
//! When both passes fail the result is an empty mapping — a signal to
//! the caller, not an error.

use serde_json::{Map, Value};

/// Outcome of one extraction attempt.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// The recovered object; empty when nothing could be recovered.
    pub object: Map<String, Value>,
    /// True when the lenient pass had to rewrite the text.
    pub repaired: bool,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.object.is_empty()
    }
}

/// Recover the first JSON object from an arbitrary text blob.
pub fn extract_json(text: &str) -> Extraction {
    let candidate = match find_balanced_object(text) {
        Some(slice) => slice,
        // No balanced region: the object may have been truncated
        // mid-stream. Hand everything from the first brace to the
        // repair pass, which closes unterminated scopes.
        None => match text.find('{') {
            Some(pos) => &text[pos..],
            None => return Extraction::default(),
        },
    };

    if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(candidate) {
        return Extraction {
            object,
            repaired: false,
        };
    }

    match repair_json(candidate) {
        Some(Value::Object(object)) => {
            tracing::debug!("recovered JSON object via lenient repair");
            Extraction {
                object,
                repaired: true,
            }
        }
        _ => {
            tracing::debug!(len = text.len(), "no JSON object recoverable from model output");
            Extraction::default()
        }
    }
}

/// Find the first balanced `{...}` slice.
///
/// Tracks double-quoted strings and backslash escapes so `{` / `}`
/// inside string values do not affect the depth count. Returns `None`
/// when no opening brace exists or the object never closes.
fn find_balanced_object(text: &str) -> Option<&str> {
    let mut start = None;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if start.is_none() {
            if c == '{' {
                start = Some(i);
                depth = 1;
            }
            continue;
        }

        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start.unwrap()..=i]);
                }
            }
            _ => {}
        }
    }

    None
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Lenient repair
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Rewrite near-JSON into strict JSON and parse it.
///
/// Handles the deviations models actually produce: single-quoted
/// strings, unquoted keys and scalar values, trailing commas, and
/// objects truncated mid-stream (unclosed strings/scopes are closed).
fn repair_json(input: &str) -> Option<Value> {
    let mut out = String::with_capacity(input.len() + 8);
    let mut closers: Vec<char> = Vec::new();
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut delim = '"';
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            if escaped {
                if c == '\'' {
                    // `\'` is not a valid JSON escape; the quote needs none.
                    out.pop();
                    out.push('\'');
                } else {
                    out.push(c);
                }
                escaped = false;
            } else if c == '\\' {
                out.push('\\');
                escaped = true;
            } else if c == delim {
                out.push('"');
                in_string = false;
            } else if c == '"' {
                // A raw double quote inside a single-quoted string.
                out.push_str("\\\"");
            } else {
                out.push(c);
            }
            continue;
        }

        match c {
            '"' | '\'' => {
                in_string = true;
                delim = c;
                out.push('"');
            }
            '{' => {
                closers.push('}');
                out.push('{');
            }
            '[' => {
                closers.push(']');
                out.push('[');
            }
            '}' | ']' => {
                trim_trailing_comma(&mut out);
                closers.pop();
                out.push(c);
            }
            ':' | ',' => out.push(c),
            c if c.is_whitespace() => out.push(c),
            _ => {
                // Bare token: collect until a structural delimiter.
                let mut token = String::new();
                token.push(c);
                while let Some(&n) = chars.peek() {
                    if matches!(n, ',' | ':' | '}' | ']' | '\n') {
                        break;
                    }
                    token.push(n);
                    chars.next();
                }
                let token = token.trim_end();

                // A token followed by ':' is an unquoted key.
                let mut look = chars.clone();
                let is_key = loop {
                    match look.next() {
                        Some(w) if w.is_whitespace() => continue,
                        Some(':') => break true,
                        _ => break false,
                    }
                };

                if is_key {
                    push_quoted(&mut out, token);
                } else {
                    match token {
                        "true" | "false" | "null" => out.push_str(token),
                        "True" => out.push_str("true"),
                        "False" => out.push_str("false"),
                        "None" => out.push_str("null"),
                        t if t.parse::<f64>().is_ok() => out.push_str(t),
                        t => push_quoted(&mut out, t),
                    }
                }
            }
        }
    }

    // Close whatever the truncated stream left open.
    if in_string {
        out.push('"');
    }
    while let Some(closer) = closers.pop() {
        trim_trailing_comma(&mut out);
        out.push(closer);
    }

    serde_json::from_str(&out).ok()
}

fn push_quoted(out: &mut String, token: &str) {
    out.push('"');
    for c in token.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out.push('"');
}

fn trim_trailing_comma(out: &mut String) {
    loop {
        let trimmed = out.trim_end();
        if trimmed.ends_with(',') {
            let keep = trimmed.len() - 1;
            out.truncate(keep);
        } else {
            break;
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_object_surrounded_by_prose() {
        let text = r#"here you go: {"message":"ok","context":{"dataset_purpose":"orders"}} thanks"#;
        let ex = extract_json(text);
        assert!(!ex.repaired);
        assert_eq!(
            Value::Object(ex.object),
            json!({"message":"ok","context":{"dataset_purpose":"orders"}})
        );
    }

    #[test]
    fn no_braces_yields_empty_mapping() {
        let ex = extract_json("I could not produce a configuration this time.");
        assert!(ex.is_empty());
        assert!(!ex.repaired);
    }

    #[test]
    fn braces_inside_string_values_do_not_end_the_scan() {
        let text = r#"{"message":"use {uuid} as the key","context":{}}"#;
        let ex = extract_json(text);
        assert_eq!(
            ex.object.get("message").and_then(|v| v.as_str()),
            Some("use {uuid} as the key")
        );
    }

    #[test]
    fn nested_objects_are_kept_whole() {
        let text = r#"noise {"a":{"b":{"c":1}}} trailing {"second":true}"#;
        let ex = extract_json(text);
        assert_eq!(Value::Object(ex.object), json!({"a":{"b":{"c":1}}}));
    }

    #[test]
    fn escaped_quotes_inside_strings_are_handled() {
        let text = r#"{"message":"she said \"hi\" {","context":{}}"#;
        let ex = extract_json(text);
        assert!(!ex.is_empty());
        assert!(!ex.repaired);
    }

    #[test]
    fn trailing_comma_is_repaired_and_flagged() {
        let ex = extract_json(r#"{"message":"ok","context":{"dedup_key":"uuid",},}"#);
        assert!(ex.repaired);
        assert_eq!(
            ex.object["context"]["dedup_key"],
            json!("uuid")
        );
    }

    #[test]
    fn single_quotes_are_repaired() {
        let ex = extract_json(r#"{'message': 'ok', 'context': {'dataset_name': 'orders_v1'}}"#);
        assert!(ex.repaired);
        assert_eq!(ex.object["context"]["dataset_name"], json!("orders_v1"));
    }

    #[test]
    fn unquoted_keys_and_values_are_repaired() {
        let ex = extract_json(r#"{message: ok, context: {dedup_key: uuid}}"#);
        assert!(ex.repaired);
        assert_eq!(ex.object["message"], json!("ok"));
        assert_eq!(ex.object["context"]["dedup_key"], json!("uuid"));
    }

    #[test]
    fn truncated_object_is_closed_by_repair() {
        let ex = extract_json(r#"{"message":"ok","context":{"dataset_purpose":"orders""#);
        assert!(ex.repaired);
        assert_eq!(ex.object["context"]["dataset_purpose"], json!("orders"));
    }

    #[test]
    fn truncated_mid_string_is_closed_by_repair() {
        let ex = extract_json(r#"{"message":"partial answ"#);
        assert!(ex.repaired);
        assert_eq!(ex.object["message"], json!("partial answ"));
    }

    #[test]
    fn python_style_literals_are_mapped() {
        let ex = extract_json(r#"{"context": {"pii_fields": None, "enabled": True}}"#);
        assert!(ex.repaired);
        assert_eq!(ex.object["context"]["pii_fields"], Value::Null);
        assert_eq!(ex.object["context"]["enabled"], json!(true));
    }

    #[test]
    fn garbage_between_braces_yields_empty_mapping() {
        let ex = extract_json("{;;; ===}");
        assert!(ex.is_empty());
    }

    #[test]
    fn top_level_array_is_not_an_object() {
        let ex = extract_json(r#"[{"message":"ok"}]"#);
        // The scanner finds the inner object; arrays never become the result.
        assert_eq!(ex.object["message"], json!("ok"));
    }
}
