//! The fixed configuration field set and per-field value state.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Every key the dialogue must fill before it is complete, in
/// solicitation order.
pub const REQUIRED_KEYS: [&str; 8] = [
    "dataset_purpose",
    "data_location",
    "storage_option",
    "dataset_name",
    "sample_event",
    "pii_fields",
    "dedup_key",
    "timestamp_key",
];

/// Key of the sample-schema field, which gets string-coercion treatment
/// in the normalizer.
pub const SAMPLE_EVENT: &str = "sample_event";

/// Key of the PII-treatments field.
pub const PII_FIELDS: &str = "pii_fields";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Field state
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Explicit per-field state. A field that was answered holds its value;
/// a field that was never answered is `Unset`. There is no path from
/// `Set` back to `Unset`: the merge adopts each field at most once.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldState {
    Unset,
    Set(Value),
}

impl FieldState {
    pub fn is_set(&self) -> bool {
        matches!(self, FieldState::Set(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            FieldState::Set(v) => Some(v),
            FieldState::Unset => None,
        }
    }
}

/// Whether a value offered by the model counts as an answer.
///
/// `null` and empty/whitespace strings are placeholders the model echoes
/// for fields it has not filled. An empty list is a real answer ("no PII
/// fields found"), so it is not excluded here.
pub fn is_answer(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PII treatments
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// How one PII field is handled downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PiiTreatment {
    /// Replace the value with a masked version.
    Mask,
    /// Encrypt the value for privacy.
    Encrypt,
    /// Leave the field unchanged.
    None,
}

impl PiiTreatment {
    /// Parse a treatment label leniently, accepting the aliases models
    /// tend to produce ("encryption", "ignore", ...).
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "mask" | "masked" | "masking" => Some(PiiTreatment::Mask),
            "encrypt" | "encrypted" | "encryption" => Some(PiiTreatment::Encrypt),
            "none" | "ignore" | "keep" => Some(PiiTreatment::None),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PiiTreatment::Mask => "mask",
            PiiTreatment::Encrypt => "encrypt",
            PiiTreatment::None => "none",
        }
    }
}

/// One entry of the `pii_fields` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiiField {
    pub field: String,
    pub treatment: PiiTreatment,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_is_not_an_answer() {
        assert!(!is_answer(&Value::Null));
    }

    #[test]
    fn empty_and_whitespace_strings_are_not_answers() {
        assert!(!is_answer(&json!("")));
        assert!(!is_answer(&json!("   ")));
        assert!(is_answer(&json!("orders")));
    }

    #[test]
    fn empty_list_is_an_answer() {
        assert!(is_answer(&json!([])));
    }

    #[test]
    fn objects_and_numbers_are_answers() {
        assert!(is_answer(&json!({"a": 1})));
        assert!(is_answer(&json!(0)));
        assert!(is_answer(&json!(false)));
    }

    #[test]
    fn treatment_parses_aliases() {
        assert_eq!(PiiTreatment::parse("mask"), Some(PiiTreatment::Mask));
        assert_eq!(PiiTreatment::parse("Encryption"), Some(PiiTreatment::Encrypt));
        assert_eq!(PiiTreatment::parse("ignore"), Some(PiiTreatment::None));
        assert_eq!(PiiTreatment::parse("shred"), None);
    }

    #[test]
    fn treatment_serializes_lowercase() {
        let f = PiiField {
            field: "email".into(),
            treatment: PiiTreatment::Encrypt,
        };
        let v = serde_json::to_value(&f).unwrap();
        assert_eq!(v, json!({"field": "email", "treatment": "encrypt"}));
    }
}
