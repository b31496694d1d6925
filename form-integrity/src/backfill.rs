//! Key index rebuild and unique-field suggestion for existing data
//!
//! Submissions collected before uniqueness was enforced may be incomplete or
//! collide with each other. A rebuild recomputes every key row from scratch;
//! incomplete submissions are skipped, and collisions either abort the rebuild
//! ([`RebuildMode::Strict`]) or leave the key with the earliest submission
//! ([`RebuildMode::KeepFirst`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{IntegrityError, IntegrityResult};
use crate::index::KeyRow;
use crate::payload::{normalized_answer, Payload};
use crate::schema::FormSchema;
use crate::unique_keys::derive_unique_key_entries;

/// Words in a field name or label that suggest an identifier
pub const IDENTIFIER_HINTS: &[&str] = &[
    "id",
    "identifier",
    "code",
    "record",
    "folio",
    "document",
    "patient",
    "subject",
    "mrn",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebuildMode {
    /// Any collision fails the whole rebuild
    #[default]
    Strict,
    /// The earliest submission keeps a contested key
    KeepFirst,
}

/// A submission as read back from storage
#[derive(Debug, Clone)]
pub struct StoredSubmission {
    pub id: Uuid,
    pub form_id: Uuid,
    pub payload: Payload,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateKey {
    pub form_id: Uuid,
    pub key_name: String,
    pub key_value: String,
    pub kept_submission_id: Uuid,
    pub duplicate_submission_id: Uuid,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RebuildPlan {
    pub rows: Vec<KeyRow>,
    pub forms_scanned: usize,
    pub forms_without_unique_key: Vec<Uuid>,
    /// Submissions whose key is blank or too long to index
    pub skipped_incomplete: usize,
    pub skipped_duplicates: usize,
    pub duplicates: Vec<DuplicateKey>,
}

/// Compute the full key index for `forms` from `submissions`.
///
/// Submissions of forms not listed are ignored. Within a form, submissions
/// are visited by creation time, then id.
///
/// # Errors
///
/// [`IntegrityError::DuplicatesFound`] in strict mode when two submissions
/// derive the same key.
pub fn plan_rebuild(
    forms: &[(Uuid, FormSchema)],
    submissions: &[StoredSubmission],
    mode: RebuildMode,
) -> IntegrityResult<RebuildPlan> {
    let mut by_form: HashMap<Uuid, Vec<&StoredSubmission>> = HashMap::new();
    for submission in submissions {
        by_form.entry(submission.form_id).or_default().push(submission);
    }

    let mut plan = RebuildPlan::default();

    for (form_id, schema) in forms {
        plan.forms_scanned += 1;
        if !schema.has_unique_key() {
            plan.forms_without_unique_key.push(*form_id);
            continue;
        }

        let mut owned = by_form.remove(form_id).unwrap_or_default();
        owned.sort_by_key(|s| (s.created_at, s.id));

        let mut owners: HashMap<(String, String), Uuid> = HashMap::new();
        for submission in owned {
            let entries = match derive_unique_key_entries(schema, &submission.payload) {
                Ok(entries) => entries,
                Err(
                    IntegrityError::MissingUniqueValue { label }
                    | IntegrityError::UniqueValueTooLong { label, .. },
                ) => {
                    debug!(
                        submission_id = %submission.id,
                        field = %label,
                        "Skipping submission with unusable unique key"
                    );
                    plan.skipped_incomplete += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            for entry in entries {
                let key = (entry.key_name.clone(), entry.key_value.clone());
                if let Some(kept) = owners.get(&key) {
                    plan.duplicates.push(DuplicateKey {
                        form_id: *form_id,
                        key_name: entry.key_name,
                        key_value: entry.key_value,
                        kept_submission_id: *kept,
                        duplicate_submission_id: submission.id,
                    });
                    plan.skipped_duplicates += 1;
                    continue;
                }
                owners.insert(key, submission.id);
                plan.rows.push(KeyRow::from_entry(submission.id, *form_id, &entry));
            }
        }
    }

    if mode == RebuildMode::Strict && !plan.duplicates.is_empty() {
        warn!(
            duplicates = plan.duplicates.len(),
            "Rebuild aborted, duplicate unique key values found"
        );
        return Err(IntegrityError::DuplicatesFound(plan.duplicates));
    }

    info!(
        rows = plan.rows.len(),
        forms = plan.forms_scanned,
        skipped_incomplete = plan.skipped_incomplete,
        skipped_duplicates = plan.skipped_duplicates,
        "Unique key rebuild planned"
    );
    Ok(plan)
}

/// Why a field was suggested as the unique key of a legacy form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSuggestion {
    pub index: usize,
    pub field_name: String,
    pub non_empty_count: usize,
    pub duplicate_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct FieldScore {
    no_duplicates: bool,
    non_empty: usize,
    identifier_hint: bool,
    required: bool,
}

/// Pick a unique-key field for a form that has none.
///
/// Fields are ranked by having no duplicate values, then by number of
/// non-empty answers, then by an identifier-like name or label, then by being
/// required; the first field wins ties. When no field has any answers, the
/// first required field is preferred.
///
/// Returns `None` when the schema is empty or already has a unique key.
pub fn suggest_unique_field(schema: &FormSchema, payloads: &[Payload]) -> Option<FieldSuggestion> {
    if schema.is_empty() || schema.has_unique_key() {
        return None;
    }

    let mut best: Option<(usize, FieldScore, usize)> = None;
    for (index, field) in schema.fields().iter().enumerate() {
        let mut seen = HashSet::new();
        let mut duplicates = 0usize;
        let mut non_empty = 0usize;
        for payload in payloads {
            if let Some(value) = normalized_answer(payload, &field.name) {
                non_empty += 1;
                if !seen.insert(value) {
                    duplicates += 1;
                }
            }
        }

        let hint_text = format!("{} {}", field.name, field.label).to_lowercase();
        let score = FieldScore {
            no_duplicates: duplicates == 0,
            non_empty,
            identifier_hint: IDENTIFIER_HINTS.iter().any(|hint| hint_text.contains(hint)),
            required: field.required,
        };

        if best.map_or(true, |(_, current, _)| score > current) {
            best = Some((index, score, duplicates));
        }
    }

    let (mut index, score, mut duplicates) = best?;
    if score.non_empty == 0 {
        if let Some(required) = schema.fields().iter().position(|f| f.required) {
            index = required;
            duplicates = 0;
        }
    }

    let field = schema.fields().get(index)?;
    let non_empty_count = payloads
        .iter()
        .filter(|p| normalized_answer(p, &field.name).is_some())
        .count();

    Some(FieldSuggestion {
        index,
        field_name: field.name.clone(),
        non_empty_count,
        duplicate_count: duplicates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::payload_from_value;
    use crate::schema::{FieldDescriptor, FieldType};
    use crate::unique_keys::MAX_KEY_VALUE_LEN;
    use chrono::{Duration, TimeZone};
    use serde_json::{json, Value};

    fn stored(form_id: Uuid, minutes: i64, payload: Value) -> StoredSubmission {
        StoredSubmission {
            id: Uuid::new_v4(),
            form_id,
            payload: payload_from_value(payload),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + Duration::minutes(minutes),
        }
    }

    fn mrn_schema() -> FormSchema {
        FormSchema::new(vec![
            FieldDescriptor::new("mrn", "MRN", FieldType::Text).unique(),
            FieldDescriptor::new("age", "Age", FieldType::Number),
        ])
    }

    #[test]
    fn test_rebuild_skips_incomplete_and_keyless_forms() {
        let keyed = Uuid::new_v4();
        let keyless = Uuid::new_v4();
        let forms = vec![
            (keyed, mrn_schema()),
            (keyless, FormSchema::new(vec![FieldDescriptor::new("a", "A", FieldType::Text)])),
        ];
        let submissions = vec![
            stored(keyed, 0, json!({"mrn": "1"})),
            stored(keyed, 1, json!({"mrn": " "})),
            stored(keyed, 2, json!({"age": 40})),
            stored(keyed, 3, json!({"mrn": "9".repeat(MAX_KEY_VALUE_LEN + 1)})),
            stored(keyless, 0, json!({"a": "x"})),
        ];

        let plan = plan_rebuild(&forms, &submissions, RebuildMode::Strict).unwrap();
        assert_eq!(plan.rows.len(), 1);
        assert_eq!(plan.rows[0].key_value, "1");
        assert_eq!(plan.skipped_incomplete, 3);
        assert_eq!(plan.forms_without_unique_key, vec![keyless]);
        assert_eq!(plan.forms_scanned, 2);
    }

    #[test]
    fn test_strict_rebuild_reports_every_duplicate() {
        let form = Uuid::new_v4();
        let first = stored(form, 0, json!({"mrn": "A"}));
        let second = stored(form, 5, json!({"mrn": " A "}));
        let third = stored(form, 9, json!({"mrn": "A"}));
        let submissions = vec![third.clone(), first.clone(), second.clone()];

        let err = plan_rebuild(&[(form, mrn_schema())], &submissions, RebuildMode::Strict)
            .unwrap_err();
        let IntegrityError::DuplicatesFound(duplicates) = err else {
            panic!("expected duplicates");
        };
        assert_eq!(duplicates.len(), 2);
        assert!(duplicates.iter().all(|d| d.kept_submission_id == first.id));
        assert_eq!(duplicates[0].duplicate_submission_id, second.id);
        assert_eq!(duplicates[1].duplicate_submission_id, third.id);
    }

    #[test]
    fn test_keep_first_rebuild_counts_skips() {
        let form = Uuid::new_v4();
        let first = stored(form, 0, json!({"mrn": "A"}));
        let submissions = vec![
            stored(form, 3, json!({"mrn": "A"})),
            first.clone(),
            stored(form, 4, json!({"mrn": "B"})),
        ];

        let plan = plan_rebuild(&[(form, mrn_schema())], &submissions, RebuildMode::KeepFirst)
            .unwrap();
        assert_eq!(plan.rows.len(), 2);
        assert_eq!(plan.skipped_duplicates, 1);
        assert!(plan
            .rows
            .iter()
            .any(|r| r.key_value == "A" && r.submission_id == first.id));
    }

    #[test]
    fn test_rebuild_keys_are_scoped_per_form() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let submissions = vec![stored(a, 0, json!({"mrn": "1"})), stored(b, 0, json!({"mrn": "1"}))];
        let plan = plan_rebuild(
            &[(a, mrn_schema()), (b, mrn_schema())],
            &submissions,
            RebuildMode::Strict,
        )
        .unwrap();
        assert_eq!(plan.rows.len(), 2);
    }

    #[test]
    fn test_suggest_prefers_distinct_populated_field() {
        let schema = FormSchema::new(vec![
            FieldDescriptor::new("site", "Site", FieldType::Text).required(),
            FieldDescriptor::new("folio", "Folio", FieldType::Text),
            FieldDescriptor::new("comment", "Comment", FieldType::Textarea),
        ]);
        let payloads: Vec<Payload> = vec![
            payload_from_value(json!({"site": "N", "folio": "F1", "comment": "a"})),
            payload_from_value(json!({"site": "N", "folio": "F2", "comment": "b"})),
            payload_from_value(json!({"site": "S", "folio": "F3"})),
        ];

        let suggestion = suggest_unique_field(&schema, &payloads).unwrap();
        assert_eq!(suggestion.field_name, "folio");
        assert_eq!(suggestion.index, 1);
        assert_eq!(suggestion.non_empty_count, 3);
        assert_eq!(suggestion.duplicate_count, 0);
    }

    #[test]
    fn test_suggest_uses_hint_to_break_ties() {
        let schema = FormSchema::new(vec![
            FieldDescriptor::new("color", "Color", FieldType::Text),
            FieldDescriptor::new("patient_code", "Patient code", FieldType::Text),
        ]);
        let payloads = vec![payload_from_value(json!({"color": "red", "patient_code": "P1"}))];
        let suggestion = suggest_unique_field(&schema, &payloads).unwrap();
        assert_eq!(suggestion.field_name, "patient_code");
    }

    #[test]
    fn test_suggest_without_answers_prefers_required() {
        let schema = FormSchema::new(vec![
            FieldDescriptor::new("color", "Color", FieldType::Text),
            FieldDescriptor::new("weight", "Weight", FieldType::Number).required(),
        ]);
        let suggestion = suggest_unique_field(&schema, &[]).unwrap();
        assert_eq!(suggestion.field_name, "weight");
        assert_eq!(suggestion.non_empty_count, 0);
    }

    #[test]
    fn test_suggest_skips_configured_forms() {
        assert_eq!(suggest_unique_field(&mrn_schema(), &[]), None);
        assert_eq!(suggest_unique_field(&FormSchema::default(), &[]), None);
    }
}
