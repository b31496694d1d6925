/// Calls the write flow makes against a unique key index
///
/// A mocked index pins down which lookups happen, with which arguments, and
/// that nothing is stored once a conflict is reported.

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use form_integrity::{
        check_availability, parse_payload, recompute_on_write, FormSchema, IntegrityError,
        IntegrityResult, KeyRow, UniqueKeyEntry, UniqueKeyIndex,
    };
    use mockall::mock;
    use serde_json::json;
    use uuid::Uuid;

    mock! {
        pub Index {}

        #[async_trait]
        impl UniqueKeyIndex for Index {
            async fn find_conflict(
                &self,
                form_id: Uuid,
                key_name: &str,
                key_value: &str,
                exclude: Option<Uuid>,
            ) -> IntegrityResult<Option<Uuid>>;

            async fn replace_entries(
                &self,
                submission_id: Uuid,
                form_id: Uuid,
                entries: &[UniqueKeyEntry],
            ) -> IntegrityResult<()>;

            async fn remove_submission(&self, submission_id: Uuid) -> IntegrityResult<()>;

            async fn entries_for_form(&self, form_id: Uuid) -> IntegrityResult<Vec<KeyRow>>;
        }
    }

    fn mrn_schema() -> FormSchema {
        FormSchema::from_value(&json!({
            "fields": [
                {"name": "mrn", "label": "MRN", "type": "text", "unique_key": true},
                {"name": "age", "label": "Age", "type": "number"}
            ]
        }))
    }

    #[tokio::test]
    async fn test_update_excludes_own_submission() {
        let form_id = Uuid::new_v4();
        let submission_id = Uuid::new_v4();

        let mut index = MockIndex::new();
        index
            .expect_find_conflict()
            .withf(move |form, name, value, exclude| {
                *form == form_id && name == "mrn" && value == "0042" && *exclude == Some(submission_id)
            })
            .times(1)
            .returning(|_, _, _, _| Ok(None));
        index
            .expect_replace_entries()
            .withf(move |sub, form, entries| {
                *sub == submission_id && *form == form_id && entries.len() == 1
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let payload = parse_payload(r#"{"mrn": " 0042 ", "age": 61}"#);
        let entries = recompute_on_write(&index, form_id, &mrn_schema(), &payload, submission_id)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_conflict_stops_before_storing() {
        let form_id = Uuid::new_v4();
        let owner = Uuid::new_v4();

        let mut index = MockIndex::new();
        index
            .expect_find_conflict()
            .times(1)
            .returning(move |_, _, _, _| Ok(Some(owner)));
        index.expect_replace_entries().times(0);

        let payload = parse_payload(r#"{"mrn": "0042"}"#);
        let err = recompute_on_write(&index, form_id, &mrn_schema(), &payload, Uuid::new_v4())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            IntegrityError::DuplicateValue {
                label: "MRN".to_string(),
                display_value: "0042".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_missing_key_never_reaches_the_index() {
        let mut index = MockIndex::new();
        index.expect_find_conflict().times(0);
        index.expect_replace_entries().times(0);

        let payload = parse_payload(r#"{"age": 61}"#);
        let err = recompute_on_write(&index, Uuid::new_v4(), &mrn_schema(), &payload, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, IntegrityError::MissingUniqueValue { .. }));
    }

    #[tokio::test]
    async fn test_index_failures_propagate() {
        let mut index = MockIndex::new();
        index
            .expect_find_conflict()
            .withf(|form, _, _, exclude| form.is_nil() && exclude.is_none())
            .returning(|_, _, _, _| Err(IntegrityError::Index("connection reset".to_string())));

        let entry = UniqueKeyEntry {
            key_name: "mrn".to_string(),
            key_value: "0042".to_string(),
            label: "MRN".to_string(),
            display_value: "0042".to_string(),
        };
        let err = check_availability(&index, Uuid::nil(), &[entry], None)
            .await
            .unwrap_err();
        assert!(!err.is_user_facing());
    }
}
