//! Candidate-context normalization.
//!
//! Guarantees the merge always sees every configuration key (missing
//! ones defaulted to null), coerces a stringified sample schema back
//! into structure, and canonicalizes PII treatment labels. Extra keys
//! the model volunteered are preserved as-is.

use serde_json::{Map, Value};

use crate::fields::{PiiTreatment, PII_FIELDS, REQUIRED_KEYS, SAMPLE_EVENT};

/// Normalize a candidate context in place.
///
/// Returns `true` when the sample schema arrived as an escaped string
/// and was re-parsed into structure — the caller surfaces that to the
/// user as an auto-correction notice.
pub fn normalize_context(context: &mut Map<String, Value>) -> bool {
    for key in REQUIRED_KEYS {
        context.entry(key.to_string()).or_insert(Value::Null);
    }

    canonicalize_pii(context);
    coerce_sample_event(context)
}

/// If the sample schema is a string, try to parse it as embedded JSON
/// and replace it with the parsed structure. A string that does not
/// parse to an object stays untouched — the sample is allowed to remain
/// opaque text.
fn coerce_sample_event(context: &mut Map<String, Value>) -> bool {
    let raw = match context.get(SAMPLE_EVENT) {
        Some(Value::String(s)) => s.clone(),
        _ => return false,
    };

    match serde_json::from_str::<Value>(&raw) {
        Ok(parsed @ Value::Object(_)) => {
            tracing::debug!("re-parsed stringified sample schema");
            context.insert(SAMPLE_EVENT.to_string(), parsed);
            true
        }
        _ => false,
    }
}

/// Canonicalize the `pii_fields` list: accept the key/label aliases the
/// model produces (`field_name`, `pii_type`, "encryption", "ignore")
/// and rewrite each entry to `{"field": ..., "treatment": ...}`.
/// Entries that cannot be understood are left as they arrived.
fn canonicalize_pii(context: &mut Map<String, Value>) {
    let Some(Value::Array(entries)) = context.get_mut(PII_FIELDS) else {
        return;
    };

    for entry in entries {
        let Value::Object(obj) = entry else { continue };

        if let Some(name) = obj.remove("field_name") {
            obj.entry("field".to_string()).or_insert(name);
        }
        if let Some(label) = obj.remove("pii_type") {
            obj.entry("treatment".to_string()).or_insert(label);
        }
        if let Some(Value::String(label)) = obj.get("treatment") {
            if let Some(treatment) = PiiTreatment::parse(label) {
                obj.insert(
                    "treatment".to_string(),
                    Value::String(treatment.as_str().to_string()),
                );
            }
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

    fn ctx(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn missing_keys_default_to_null() {
        let mut context = ctx(json!({"dataset_purpose": "orders"}));
        let repaired = normalize_context(&mut context);
        assert!(!repaired);
        assert_eq!(context.len(), 8);
        assert_eq!(context["dataset_purpose"], json!("orders"));
        let nulls = REQUIRED_KEYS
            .iter()
            .filter(|k| context[**k].is_null())
            .count();
        assert_eq!(nulls, 7);
    }

    #[test]
    fn extra_keys_are_preserved() {
        let mut context = ctx(json!({"notes": "keep me"}));
        normalize_context(&mut context);
        assert_eq!(context["notes"], json!("keep me"));
        assert_eq!(context.len(), 9);
    }

    #[test]
    fn stringified_sample_is_reparsed_and_flagged() {
        let mut context = ctx(json!({"sample_event": "{\"a\":1}"}));
        let repaired = normalize_context(&mut context);
        assert!(repaired);
        assert_eq!(context["sample_event"], json!({"a": 1}));
    }

    #[test]
    fn opaque_sample_string_stays_untouched() {
        let mut context = ctx(json!({"sample_event": "not json at all"}));
        let repaired = normalize_context(&mut context);
        assert!(!repaired);
        assert_eq!(context["sample_event"], json!("not json at all"));
    }

    #[test]
    fn sample_already_structured_is_not_flagged() {
        let mut context = ctx(json!({"sample_event": {"a": 1}}));
        let repaired = normalize_context(&mut context);
        assert!(!repaired);
        assert_eq!(context["sample_event"], json!({"a": 1}));
    }

    #[test]
    fn scalar_sample_string_is_not_replaced() {
        // "123" parses as a number, not an object; the sample stays text.
        let mut context = ctx(json!({"sample_event": "123"}));
        let repaired = normalize_context(&mut context);
        assert!(!repaired);
        assert_eq!(context["sample_event"], json!("123"));
    }

    #[test]
    fn pii_aliases_are_canonicalized() {
        let mut context = ctx(json!({
            "pii_fields": [
                {"field_name": "email", "pii_type": "encryption"},
                {"field": "name", "treatment": "Mask"},
                {"field": "age", "treatment": "ignore"}
            ]
        }));
        normalize_context(&mut context);
        assert_eq!(
            context["pii_fields"],
            json!([
                {"field": "email", "treatment": "encrypt"},
                {"field": "name", "treatment": "mask"},
                {"field": "age", "treatment": "none"}
            ])
        );
    }

    #[test]
    fn unknown_pii_labels_are_left_alone() {
        let mut context = ctx(json!({
            "pii_fields": [{"field": "ssn", "treatment": "shred"}]
        }));
        normalize_context(&mut context);
        assert_eq!(
            context["pii_fields"],
            json!([{"field": "ssn", "treatment": "shred"}])
        );
    }
}
