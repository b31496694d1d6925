//! Unique key derivation
//!
//! A form with one `unique_key` field indexes that field's normalized value.
//! A form with several indexes exactly one composite key whose name lists the
//! component fields and whose value is a compact JSON array of the normalized
//! components, both in schema order.

use serde::{Deserialize, Serialize};

use crate::error::{IntegrityError, IntegrityResult};
use crate::payload::{normalized_answer, Payload};
use crate::schema::FormSchema;

pub const COMPOSITE_KEY_PREFIX: &str = "__composite__:";
const COMPOSITE_NAME_SEPARATOR: &str = "|";
const DISPLAY_SEPARATOR: &str = " + ";

/// Longest `key_value` accepted, in bytes; keeps key rows within what the
/// storage index can hold
pub const MAX_KEY_VALUE_LEN: usize = 1024;

/// A key a submission must own exclusively within its form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UniqueKeyEntry {
    pub key_name: String,
    pub key_value: String,
    /// Human-readable key name used in error messages
    pub label: String,
    /// Human-readable value used in error messages
    pub display_value: String,
}

impl UniqueKeyEntry {
    pub fn is_composite(&self) -> bool {
        self.key_name.starts_with(COMPOSITE_KEY_PREFIX)
    }
}

pub fn composite_key_name<'a, I>(field_names: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let joined = field_names
        .into_iter()
        .collect::<Vec<_>>()
        .join(COMPOSITE_NAME_SEPARATOR);
    format!("{COMPOSITE_KEY_PREFIX}{joined}")
}

/// Key name the schema's unique fields produce, if it has any
pub fn key_name_for(schema: &FormSchema) -> Option<String> {
    let names = schema.unique_field_names();
    match names.as_slice() {
        [] => None,
        [single] => Some((*single).to_string()),
        many => Some(composite_key_name(many.iter().copied())),
    }
}

/// Derive the unique key entries a payload must own.
///
/// # Errors
///
/// - [`IntegrityError::NoUniqueKeyConfigured`] when no field is flagged
/// - [`IntegrityError::MissingUniqueValue`] naming the first component that is
///   absent or blank
/// - [`IntegrityError::UniqueValueTooLong`] when the key value exceeds
///   [`MAX_KEY_VALUE_LEN`]
pub fn derive_unique_key_entries(
    schema: &FormSchema,
    payload: &Payload,
) -> IntegrityResult<Vec<UniqueKeyEntry>> {
    let mut names = Vec::new();
    let mut labels = Vec::new();
    let mut values = Vec::new();

    for field in schema.unique_fields() {
        let value = normalized_answer(payload, &field.name).ok_or_else(|| {
            IntegrityError::MissingUniqueValue {
                label: field.label.clone(),
            }
        })?;
        names.push(field.name.as_str());
        labels.push(field.label.as_str());
        values.push(value);
    }

    let entry = match (names.as_slice(), labels.as_slice(), values.as_slice()) {
        ([], _, _) => return Err(IntegrityError::NoUniqueKeyConfigured),
        ([name], [label], [value]) => UniqueKeyEntry {
            key_name: (*name).to_string(),
            key_value: value.clone(),
            label: (*label).to_string(),
            display_value: value.clone(),
        },
        _ => UniqueKeyEntry {
            key_name: composite_key_name(names.iter().copied()),
            key_value: serde_json::to_string(&values)
                .map_err(|e| IntegrityError::Serialization(e.to_string()))?,
            label: labels.join(DISPLAY_SEPARATOR),
            display_value: values.join(DISPLAY_SEPARATOR),
        },
    };

    if entry.key_value.len() > MAX_KEY_VALUE_LEN {
        return Err(IntegrityError::UniqueValueTooLong {
            label: entry.label,
            max: MAX_KEY_VALUE_LEN,
        });
    }

    Ok(vec![entry])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::payload_from_value;
    use crate::schema::{FieldDescriptor, FieldType};
    use proptest::prelude::*;
    use serde_json::json;

    fn schema(fields: Vec<FieldDescriptor>) -> FormSchema {
        FormSchema::new(fields)
    }

    #[test]
    fn test_single_field_key() {
        let schema = schema(vec![
            FieldDescriptor::new("mrn", "Record number", FieldType::Text).unique(),
            FieldDescriptor::new("notes", "Notes", FieldType::Textarea),
        ]);
        let payload = payload_from_value(json!({"mrn": "  A-001  ", "notes": "x"}));

        let entries = derive_unique_key_entries(&schema, &payload).unwrap();
        assert_eq!(
            entries,
            vec![UniqueKeyEntry {
                key_name: "mrn".to_string(),
                key_value: "A-001".to_string(),
                label: "Record number".to_string(),
                display_value: "A-001".to_string(),
            }]
        );
        assert!(!entries[0].is_composite());
    }

    #[test]
    fn test_composite_key_in_schema_order() {
        let schema = schema(vec![
            FieldDescriptor::new("site", "Site", FieldType::Text).unique(),
            FieldDescriptor::new("age", "Age", FieldType::Number),
            FieldDescriptor::new("mrn", "MRN", FieldType::Number).unique(),
        ]);
        let payload = payload_from_value(json!({"mrn": 42, "site": "Norte ", "age": 70}));

        let entries = derive_unique_key_entries(&schema, &payload).unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.key_name, "__composite__:site|mrn");
        assert_eq!(entry.key_value, r#"["Norte","42"]"#);
        assert_eq!(entry.label, "Site + MRN");
        assert_eq!(entry.display_value, "Norte + 42");
        assert!(entry.is_composite());
    }

    #[test]
    fn test_composite_value_keeps_non_ascii() {
        let schema = schema(vec![
            FieldDescriptor::new("nombre", "Nombre", FieldType::Text).unique(),
            FieldDescriptor::new("folio", "Folio", FieldType::Text).unique(),
        ]);
        let payload = payload_from_value(json!({"nombre": "José", "folio": "Ñ-7"}));

        let entries = derive_unique_key_entries(&schema, &payload).unwrap();
        assert_eq!(entries[0].key_value, r#"["José","Ñ-7"]"#);
    }

    #[test]
    fn test_no_unique_field_is_configuration_error() {
        let schema = schema(vec![FieldDescriptor::new("a", "A", FieldType::Text)]);
        let payload = payload_from_value(json!({"a": "x"}));
        assert_eq!(
            derive_unique_key_entries(&schema, &payload),
            Err(IntegrityError::NoUniqueKeyConfigured)
        );
    }

    #[test]
    fn test_missing_component_names_label() {
        let schema = schema(vec![
            FieldDescriptor::new("site", "Site", FieldType::Text).unique(),
            FieldDescriptor::new("mrn", "Medical record", FieldType::Text).unique(),
        ]);

        for payload in [
            json!({"site": "N"}),
            json!({"site": "N", "mrn": null}),
            json!({"site": "N", "mrn": "   "}),
        ] {
            let err = derive_unique_key_entries(&schema, &payload_from_value(payload)).unwrap_err();
            assert_eq!(
                err,
                IntegrityError::MissingUniqueValue {
                    label: "Medical record".to_string()
                }
            );
            assert_eq!(
                err.to_string(),
                "Unique key field 'Medical record' is required and cannot be empty."
            );
        }
    }

    #[test]
    fn test_overlong_values_are_rejected() {
        let single = schema(vec![FieldDescriptor::new("notes", "Notes", FieldType::Textarea).unique()]);
        let at_limit = payload_from_value(json!({"notes": "x".repeat(MAX_KEY_VALUE_LEN)}));
        assert!(derive_unique_key_entries(&single, &at_limit).is_ok());

        let too_long = payload_from_value(json!({"notes": "x".repeat(MAX_KEY_VALUE_LEN + 1)}));
        assert_eq!(
            derive_unique_key_entries(&single, &too_long).unwrap_err(),
            IntegrityError::UniqueValueTooLong {
                label: "Notes".to_string(),
                max: MAX_KEY_VALUE_LEN,
            }
        );

        // each component fits but the encoded composite does not
        let composite = schema(vec![
            FieldDescriptor::new("a", "A", FieldType::Text).unique(),
            FieldDescriptor::new("b", "B", FieldType::Text).unique(),
        ]);
        let half = "y".repeat(MAX_KEY_VALUE_LEN / 2);
        let payload = payload_from_value(json!({"a": half.clone(), "b": half}));
        let err = derive_unique_key_entries(&composite, &payload).unwrap_err();
        assert!(matches!(err, IntegrityError::UniqueValueTooLong { label, .. } if label == "A + B"));
    }

    #[test]
    fn test_key_name_for_schema() {
        let single = schema(vec![FieldDescriptor::new("mrn", "MRN", FieldType::Text).unique()]);
        assert_eq!(key_name_for(&single).as_deref(), Some("mrn"));

        let none = schema(vec![FieldDescriptor::new("mrn", "MRN", FieldType::Text)]);
        assert_eq!(key_name_for(&none), None);

        let composite = schema(vec![
            FieldDescriptor::new("a", "A", FieldType::Text).unique(),
            FieldDescriptor::new("b", "B", FieldType::Text).unique(),
        ]);
        assert_eq!(key_name_for(&composite).as_deref(), Some("__composite__:a|b"));
    }

    proptest! {
        #[test]
        fn prop_surrounding_whitespace_does_not_change_key(
            value in "[A-Za-z0-9]{1,12}",
            left in "[ \t]{0,3}",
            right in "[ \t\n]{0,3}",
        ) {
            let schema = schema(vec![FieldDescriptor::new("id", "ID", FieldType::Text).unique()]);
            let padded = payload_from_value(json!({"id": format!("{left}{value}{right}")}));
            let plain = payload_from_value(json!({"id": value.clone()}));

            let a = derive_unique_key_entries(&schema, &padded).unwrap();
            let b = derive_unique_key_entries(&schema, &plain).unwrap();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn prop_composite_value_decodes_to_components(
            first in "[^\\s]{1,8}",
            second in "[^\\s]{1,8}",
        ) {
            let schema = schema(vec![
                FieldDescriptor::new("a", "A", FieldType::Text).unique(),
                FieldDescriptor::new("b", "B", FieldType::Text).unique(),
            ]);
            let payload = payload_from_value(json!({"a": first.clone(), "b": second.clone()}));

            let entries = derive_unique_key_entries(&schema, &payload).unwrap();
            let decoded: Vec<String> = serde_json::from_str(&entries[0].key_value).unwrap();
            prop_assert_eq!(decoded, vec![first, second]);
        }
    }
}
