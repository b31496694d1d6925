//! Submission payload parsing and value normalization

use serde_json::{Map, Value};
use tracing::debug;

/// Submission answers keyed by field name
pub type Payload = Map<String, Value>;

/// Parse a stored payload.
///
/// Anything that is not a JSON object, including text that does not parse at
/// all, becomes an empty payload.
pub fn parse_payload(raw: &str) -> Payload {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => payload_from_value(value),
        Err(e) => {
            debug!(error = %e, "Unreadable submission payload treated as empty");
            Map::new()
        }
    }
}

pub fn payload_from_value(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Canonical text form of a single answer, used for unique keys and
/// histograms. `None` means the answer is absent.
pub fn normalize_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string().trim().to_string()),
    }
}

/// Normalized value of `field`, or `None` when it is absent or blank
pub fn normalized_answer(payload: &Payload, field: &str) -> Option<String> {
    payload
        .get(field)
        .and_then(normalize_value)
        .filter(|v| !v.is_empty())
}

/// Whether an answer counts as filled for completion statistics
pub fn is_filled(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(obj)) => !obj.is_empty(),
        Some(other) => normalize_value(other).is_some_and(|v| !v.is_empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_valid_object() {
        let payload = parse_payload(r#"{"mrn": "123", "age": 54}"#);
        assert_eq!(payload.len(), 2);
        assert_eq!(payload.get("age"), Some(&json!(54)));
    }

    #[test]
    fn test_malformed_payload_degrades_to_empty() {
        assert!(parse_payload("{not json").is_empty());
        assert!(parse_payload("").is_empty());
        assert!(parse_payload("[1, 2, 3]").is_empty());
        assert!(parse_payload("\"just a string\"").is_empty());
        assert!(parse_payload("gAAAAABlegacyciphertext==").is_empty());
    }

    #[test]
    fn test_normalize_scalars() {
        assert_eq!(normalize_value(&json!("  A-12 \n")), Some("A-12".to_string()));
        assert_eq!(normalize_value(&json!(12)), Some("12".to_string()));
        assert_eq!(normalize_value(&json!(12.5)), Some("12.5".to_string()));
        assert_eq!(normalize_value(&json!(true)), Some("true".to_string()));
        assert_eq!(normalize_value(&Value::Null), None);
    }

    #[test]
    fn test_normalize_compound_values() {
        assert_eq!(normalize_value(&json!(["a", "b"])), Some(r#"["a","b"]"#.to_string()));
        assert_eq!(normalize_value(&json!({"k": 1})), Some(r#"{"k":1}"#.to_string()));
    }

    #[test]
    fn test_normalized_answer_filters_blank() {
        let payload = payload_from_value(json!({"a": "   ", "b": " x ", "c": null}));
        assert_eq!(normalized_answer(&payload, "a"), None);
        assert_eq!(normalized_answer(&payload, "b"), Some("x".to_string()));
        assert_eq!(normalized_answer(&payload, "c"), None);
        assert_eq!(normalized_answer(&payload, "missing"), None);
    }

    #[test]
    fn test_is_filled() {
        assert!(!is_filled(None));
        assert!(!is_filled(Some(&Value::Null)));
        assert!(!is_filled(Some(&json!("  "))));
        assert!(!is_filled(Some(&json!([]))));
        assert!(!is_filled(Some(&json!({}))));
        assert!(is_filled(Some(&json!(false))));
        assert!(is_filled(Some(&json!(0))));
        assert!(is_filled(Some(&json!(["x"]))));
        assert!(is_filled(Some(&json!("x"))));
    }
}
