//! Form schema model
//!
//! Schemas are stored as free-form JSON (`{"fields": [...]}`) and edited by a
//! form builder, so parsing never fails: malformed entries are dropped and a
//! missing `fields` array yields an empty schema. Strict checks only run when
//! an administrator saves a form, through [`FormSchema::validate`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::error::{IntegrityError, IntegrityResult};

/// Input widget type of a form field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum FieldType {
    #[default]
    Text,
    Number,
    Date,
    Select,
    Radio,
    Checkbox,
    Textarea,
    /// Any type the builder knows about that we do not
    Other(String),
}

impl FieldType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "text" => FieldType::Text,
            "number" => FieldType::Number,
            "date" => FieldType::Date,
            "select" => FieldType::Select,
            "radio" => FieldType::Radio,
            "checkbox" => FieldType::Checkbox,
            "textarea" => FieldType::Textarea,
            _ => FieldType::Other(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Select => "select",
            FieldType::Radio => "radio",
            FieldType::Checkbox => "checkbox",
            FieldType::Textarea => "textarea",
            FieldType::Other(raw) => raw,
        }
    }

    /// Choice fields get a value histogram in completion profiles
    pub fn is_choice(&self) -> bool {
        matches!(self, FieldType::Select | FieldType::Radio | FieldType::Checkbox)
    }

    /// Fields that cannot be rendered without a list of options
    pub fn requires_options(&self) -> bool {
        matches!(self, FieldType::Select | FieldType::Radio)
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FieldType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(FieldType::parse(&raw))
    }
}

/// One field of a form schema
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    pub unique_key: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<Value>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            field_type,
            required: false,
            unique_key: false,
            options: Vec::new(),
            placeholder: None,
            validation: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique_key = true;
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Parse one entry of the `fields` array.
    ///
    /// Returns `None` for entries that are not objects or have no name.
    /// `required` and `unique_key` only count when they are literally `true`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let name = obj.get("name").and_then(Value::as_str)?;
        if name.trim().is_empty() {
            return None;
        }

        let label = obj
            .get("label")
            .and_then(Value::as_str)
            .filter(|label| !label.trim().is_empty())
            .unwrap_or(name);

        let field_type = obj
            .get("type")
            .and_then(Value::as_str)
            .map(FieldType::parse)
            .unwrap_or_default();

        Some(Self {
            name: name.to_string(),
            label: label.to_string(),
            field_type,
            required: is_true(obj, "required"),
            unique_key: is_true(obj, "unique_key"),
            options: parse_options(obj.get("options")),
            placeholder: obj
                .get("placeholder")
                .and_then(Value::as_str)
                .map(str::to_string),
            validation: obj.get("validation").filter(|v| v.is_object()).cloned(),
        })
    }
}

fn is_true(obj: &Map<String, Value>, key: &str) -> bool {
    matches!(obj.get(key), Some(Value::Bool(true)))
}

fn parse_options(raw: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = raw else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Object(obj) => obj.get("value").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .collect()
}

/// Ordered list of field descriptors
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FormSchema {
    fields: Vec<FieldDescriptor>,
}

impl FormSchema {
    pub fn new(fields: Vec<FieldDescriptor>) -> Self {
        Self { fields }
    }

    /// Parse a stored schema document, keeping only well-formed fields
    pub fn from_value(value: &Value) -> Self {
        let fields = value
            .get("fields")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(FieldDescriptor::from_value).collect())
            .unwrap_or_default();

        Self { fields }
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields flagged `unique_key`, in schema order
    pub fn unique_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.unique_key)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.required)
    }

    pub fn has_unique_key(&self) -> bool {
        self.fields.iter().any(|f| f.unique_key)
    }

    /// Names of the unique-key fields; two schemas with equal lists derive
    /// comparable key rows
    pub fn unique_field_names(&self) -> Vec<&str> {
        self.unique_fields().map(|f| f.name.as_str()).collect()
    }

    /// Checks applied when a form is created or its schema replaced
    pub fn validate(&self) -> IntegrityResult<()> {
        if self.fields.is_empty() {
            return Err(IntegrityError::InvalidSchema(
                "a form needs at least one field".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(IntegrityError::InvalidSchema(format!(
                    "field name '{}' is used more than once",
                    field.name
                )));
            }

            if field.field_type.requires_options()
                && field.options.iter().all(|o| o.trim().is_empty())
            {
                return Err(IntegrityError::InvalidSchema(format!(
                    "field '{}' of type {} needs at least one option",
                    field.label, field.field_type
                )));
            }
        }

        if !self.has_unique_key() {
            return Err(IntegrityError::InvalidSchema(
                "at least one field must be marked as unique key".to_string(),
            ));
        }

        Ok(())
    }
}

/// Set `unique_key: true` on the raw field entry named `field_name`.
///
/// Works on the stored document so keys the parser does not model survive.
/// Returns false when no entry carries that name.
pub fn mark_unique_field(schema_json: &mut Value, field_name: &str) -> bool {
    let Some(fields) = schema_json.get_mut("fields").and_then(Value::as_array_mut) else {
        return false;
    };
    let entry = fields.iter_mut().find_map(|item| {
        item.as_object_mut()
            .filter(|obj| obj.get("name").and_then(Value::as_str) == Some(field_name))
    });
    match entry {
        Some(obj) => {
            obj.insert("unique_key".to_string(), Value::Bool(true));
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full_field() {
        let field = FieldDescriptor::from_value(&json!({
            "name": "stage",
            "label": "Tumor stage",
            "type": "select",
            "required": true,
            "unique_key": false,
            "options": ["I", "II", {"value": "III", "label": "Stage III"}],
            "placeholder": "Pick one",
            "validation": {"pattern": "^I+$"}
        }))
        .unwrap();

        assert_eq!(field.name, "stage");
        assert_eq!(field.label, "Tumor stage");
        assert_eq!(field.field_type, FieldType::Select);
        assert!(field.required);
        assert!(!field.unique_key);
        assert_eq!(field.options, vec!["I", "II", "III"]);
        assert_eq!(field.placeholder.as_deref(), Some("Pick one"));
        assert!(field.validation.is_some());
    }

    #[test]
    fn test_label_falls_back_to_name() {
        let field = FieldDescriptor::from_value(&json!({"name": "mrn", "label": "  "})).unwrap();
        assert_eq!(field.label, "mrn");

        let field = FieldDescriptor::from_value(&json!({"name": "mrn"})).unwrap();
        assert_eq!(field.label, "mrn");
        assert_eq!(field.field_type, FieldType::Text);
    }

    #[test]
    fn test_flags_must_be_literal_true() {
        let field = FieldDescriptor::from_value(&json!({
            "name": "mrn",
            "unique_key": "true",
            "required": 1
        }))
        .unwrap();
        assert!(!field.unique_key);
        assert!(!field.required);
    }

    #[test]
    fn test_lenient_schema_parsing() {
        let schema = FormSchema::from_value(&json!({
            "fields": [
                {"name": "a"},
                "not an object",
                {"label": "nameless"},
                {"name": "   "},
                {"name": "b", "type": "signature"}
            ]
        }));
        assert_eq!(schema.fields().len(), 2);
        assert_eq!(
            schema.field("b").map(|f| f.field_type.clone()),
            Some(FieldType::Other("signature".to_string()))
        );

        assert!(FormSchema::from_value(&json!([1, 2])).is_empty());
        assert!(FormSchema::from_value(&json!({"fields": "nope"})).is_empty());
        assert!(FormSchema::from_value(&Value::Null).is_empty());
    }

    #[test]
    fn test_unique_fields_keep_schema_order() {
        let schema = FormSchema::new(vec![
            FieldDescriptor::new("site", "Site", FieldType::Text).unique(),
            FieldDescriptor::new("notes", "Notes", FieldType::Textarea),
            FieldDescriptor::new("mrn", "MRN", FieldType::Text).unique(),
        ]);
        assert_eq!(schema.unique_field_names(), vec!["site", "mrn"]);
    }

    #[test]
    fn test_validate_requires_unique_key() {
        let schema = FormSchema::new(vec![FieldDescriptor::new("a", "A", FieldType::Text)]);
        assert!(matches!(schema.validate(), Err(IntegrityError::InvalidSchema(_))));

        let schema = FormSchema::new(vec![FieldDescriptor::new("a", "A", FieldType::Text).unique()]);
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicate_names_and_missing_options() {
        let schema = FormSchema::new(vec![
            FieldDescriptor::new("a", "A", FieldType::Text).unique(),
            FieldDescriptor::new("a", "Again", FieldType::Number),
        ]);
        assert!(schema.validate().is_err());

        let schema = FormSchema::new(vec![
            FieldDescriptor::new("a", "A", FieldType::Text).unique(),
            FieldDescriptor::new("arm", "Arm", FieldType::Radio),
        ]);
        assert!(schema.validate().is_err());

        let schema = FormSchema::new(vec![]);
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_schema_round_trips_through_json() {
        let schema = FormSchema::new(vec![
            FieldDescriptor::new("arm", "Arm", FieldType::Radio)
                .required()
                .with_options(["A", "B"]),
            FieldDescriptor::new("mrn", "MRN", FieldType::Text).unique(),
        ]);
        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(value["fields"][0]["type"], "radio");
        assert_eq!(FormSchema::from_value(&value), schema);
    }

    #[test]
    fn test_mark_unique_field_keeps_the_rest_of_the_document() {
        let original = json!({
            "title": "Enrollment",
            "fields": [
                {"id": "f1", "name": "folio", "label": "Folio", "type": "text", "defaultValue": "X"},
                {"name": "arm", "type": "radio", "options": [
                    {"value": "a", "label": "Arm A"},
                    {"value": "b", "label": "Arm B"}
                ]},
                {"label": "section header", "type": "heading"},
                "stray"
            ]
        });

        let mut marked = original.clone();
        assert!(mark_unique_field(&mut marked, "folio"));

        let mut expected = original;
        expected["fields"][0]["unique_key"] = json!(true);
        assert_eq!(marked, expected);
        assert_eq!(FormSchema::from_value(&marked).unique_field_names(), vec!["folio"]);
    }

    #[test]
    fn test_mark_unique_field_without_match() {
        let mut doc = json!({"fields": [{"name": "mrn"}]});
        assert!(!mark_unique_field(&mut doc, "site"));
        assert_eq!(doc, json!({"fields": [{"name": "mrn"}]}));

        let mut no_fields = json!({"title": "Empty"});
        assert!(!mark_unique_field(&mut no_fields, "mrn"));
    }
}
