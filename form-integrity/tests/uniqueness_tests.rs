/// Submission write flow against the in-memory unique key index
///
/// These tests walk the create/update/delete lifecycle the server drives
/// and do not need a database.

#[cfg(test)]
mod tests {
    use form_integrity::{
        check_availability, derive_unique_key_entries, parse_payload, plan_rebuild,
        recompute_on_write, FormSchema, InMemoryUniqueKeyIndex, IntegrityError, RebuildMode,
        StoredSubmission, UniqueKeyIndex,
    };
    use chrono::Utc;
    use serde_json::json;
    use std::sync::Arc;
    use uuid::Uuid;

    fn composite_schema() -> FormSchema {
        FormSchema::from_value(&json!({
            "fields": [
                {"name": "hospital_code", "label": "Hospital code", "type": "text", "unique_key": true},
                {"name": "patient_number", "label": "Patient number", "type": "number", "unique_key": true},
                {"name": "diagnosis", "label": "Diagnosis", "type": "select", "options": ["A", "B"]}
            ]
        }))
    }

    // =========================================================================
    // CREATE / UPDATE
    // =========================================================================

    #[tokio::test]
    async fn test_create_then_duplicate_is_rejected() {
        let index = InMemoryUniqueKeyIndex::new();
        let form = Uuid::new_v4();
        let schema = composite_schema();

        let first = parse_payload(r#"{"hospital_code": "HN", "patient_number": 7}"#);
        recompute_on_write(&index, form, &schema, &first, Uuid::new_v4())
            .await
            .unwrap();

        let clash = parse_payload(r#"{"hospital_code": " HN ", "patient_number": 7, "diagnosis": "A"}"#);
        let err = recompute_on_write(&index, form, &schema, &clash, Uuid::new_v4())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Duplicate value for unique key 'Hospital code + Patient number': 'HN + 7'."
        );
        assert!(err.is_user_facing());
    }

    #[tokio::test]
    async fn test_same_values_allowed_on_other_forms() {
        let index = InMemoryUniqueKeyIndex::new();
        let schema = composite_schema();
        let payload = parse_payload(r#"{"hospital_code": "HN", "patient_number": 7}"#);

        recompute_on_write(&index, Uuid::new_v4(), &schema, &payload, Uuid::new_v4())
            .await
            .unwrap();
        recompute_on_write(&index, Uuid::new_v4(), &schema, &payload, Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(index.len(), 2);
    }

    #[tokio::test]
    async fn test_update_keeping_own_key_succeeds() {
        let index = InMemoryUniqueKeyIndex::new();
        let form = Uuid::new_v4();
        let schema = composite_schema();
        let submission = Uuid::new_v4();

        let payload = parse_payload(r#"{"hospital_code": "HN", "patient_number": 7}"#);
        recompute_on_write(&index, form, &schema, &payload, submission).await.unwrap();

        let edited = parse_payload(r#"{"hospital_code": "HN", "patient_number": 7, "diagnosis": "B"}"#);
        recompute_on_write(&index, form, &schema, &edited, submission).await.unwrap();

        let rows = index.entries_for_form(form).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].submission_id, submission);
    }

    #[tokio::test]
    async fn test_update_moving_key_frees_old_value() {
        let index = InMemoryUniqueKeyIndex::new();
        let form = Uuid::new_v4();
        let schema = composite_schema();
        let submission = Uuid::new_v4();

        let before = parse_payload(r#"{"hospital_code": "HN", "patient_number": 7}"#);
        recompute_on_write(&index, form, &schema, &before, submission).await.unwrap();
        let after = parse_payload(r#"{"hospital_code": "HN", "patient_number": 8}"#);
        recompute_on_write(&index, form, &schema, &after, submission).await.unwrap();

        recompute_on_write(&index, form, &schema, &before, Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(index.len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_payload_reports_missing_key() {
        let index = InMemoryUniqueKeyIndex::new();
        let payload = parse_payload("{{{");
        let err = recompute_on_write(&index, Uuid::new_v4(), &composite_schema(), &payload, Uuid::new_v4())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            IntegrityError::MissingUniqueValue {
                label: "Hospital code".to_string()
            }
        );
    }

    // =========================================================================
    // RACES
    // =========================================================================

    #[tokio::test]
    async fn test_storage_guard_catches_race_after_precheck() {
        let index = InMemoryUniqueKeyIndex::new();
        let form = Uuid::new_v4();
        let schema = composite_schema();
        let payload = parse_payload(r#"{"hospital_code": "HS", "patient_number": 1}"#);
        let entries = derive_unique_key_entries(&schema, &payload).unwrap();

        // Both writers pass the pre-check before either stores its keys
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        check_availability(&index, form, &entries, Some(a)).await.unwrap();
        check_availability(&index, form, &entries, Some(b)).await.unwrap();

        index.replace_entries(a, form, &entries).await.unwrap();
        let err = index.replace_entries(b, form, &entries).await.unwrap_err();
        assert_eq!(err, IntegrityError::ConcurrentDuplicate);
        assert_eq!(err.to_string(), "Duplicate value detected for a unique key field.");
    }

    #[tokio::test]
    async fn test_concurrent_writers_only_one_wins() {
        let index = Arc::new(InMemoryUniqueKeyIndex::new());
        let form = Uuid::new_v4();
        let schema = Arc::new(composite_schema());

        let mut handles = Vec::new();
        for _ in 0..16 {
            let index = Arc::clone(&index);
            let schema = Arc::clone(&schema);
            handles.push(tokio::spawn(async move {
                let payload = parse_payload(r#"{"hospital_code": "HC", "patient_number": 99}"#);
                recompute_on_write(index.as_ref(), form, &schema, &payload, Uuid::new_v4()).await
            }));
        }

        let mut wins = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => wins += 1,
                Err(IntegrityError::DuplicateValue { .. } | IntegrityError::ConcurrentDuplicate) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(index.len(), 1);
    }

    // =========================================================================
    // REBUILD
    // =========================================================================

    #[tokio::test]
    async fn test_rebuilt_index_enforces_keys() {
        let form = Uuid::new_v4();
        let schema = composite_schema();
        let existing = StoredSubmission {
            id: Uuid::new_v4(),
            form_id: form,
            payload: parse_payload(r#"{"hospital_code": "HN", "patient_number": 3}"#),
            created_at: Utc::now(),
        };

        let plan = plan_rebuild(&[(form, schema.clone())], &[existing], RebuildMode::Strict).unwrap();
        let index = InMemoryUniqueKeyIndex::new();
        index.load(&plan.rows).await.unwrap();

        let again = parse_payload(r#"{"hospital_code": "HN", "patient_number": 3}"#);
        let result = recompute_on_write(&index, form, &schema, &again, Uuid::new_v4()).await;
        assert!(matches!(result, Err(IntegrityError::DuplicateValue { .. })));
    }
}
