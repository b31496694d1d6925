//! Unique key index abstraction
//!
//! The index maps `(form_id, key_name, key_value)` to the submission owning
//! it. Writers call [`recompute_on_write`], which derives the entries, runs a
//! pre-check that produces a precise duplicate message, then asks the index to
//! swap the submission's rows. The swap itself must enforce uniqueness
//! atomically; that check is authoritative and reports
//! [`IntegrityError::ConcurrentDuplicate`].

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::error::{IntegrityError, IntegrityResult};
use crate::payload::Payload;
use crate::schema::FormSchema;
use crate::unique_keys::{derive_unique_key_entries, UniqueKeyEntry};

/// A persisted unique key bound to a submission
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyRow {
    pub submission_id: Uuid,
    pub form_id: Uuid,
    pub key_name: String,
    pub key_value: String,
}

impl KeyRow {
    pub fn from_entry(submission_id: Uuid, form_id: Uuid, entry: &UniqueKeyEntry) -> Self {
        Self {
            submission_id,
            form_id,
            key_name: entry.key_name.clone(),
            key_value: entry.key_value.clone(),
        }
    }
}

/// Storage for unique key rows
#[async_trait]
pub trait UniqueKeyIndex: Send + Sync {
    /// Submission currently owning the key, ignoring `exclude`
    async fn find_conflict(
        &self,
        form_id: Uuid,
        key_name: &str,
        key_value: &str,
        exclude: Option<Uuid>,
    ) -> IntegrityResult<Option<Uuid>>;

    /// Atomically replace every row of `submission_id` with `entries`.
    ///
    /// Fails with [`IntegrityError::ConcurrentDuplicate`] without changing
    /// anything if another submission owns one of the keys.
    async fn replace_entries(
        &self,
        submission_id: Uuid,
        form_id: Uuid,
        entries: &[UniqueKeyEntry],
    ) -> IntegrityResult<()>;

    /// Drop every row of a deleted submission
    async fn remove_submission(&self, submission_id: Uuid) -> IntegrityResult<()>;

    async fn entries_for_form(&self, form_id: Uuid) -> IntegrityResult<Vec<KeyRow>>;
}

/// Reject entries already owned by another submission of the form
pub async fn check_availability<I>(
    index: &I,
    form_id: Uuid,
    entries: &[UniqueKeyEntry],
    exclude: Option<Uuid>,
) -> IntegrityResult<()>
where
    I: UniqueKeyIndex + ?Sized,
{
    for entry in entries {
        if let Some(owner) = index
            .find_conflict(form_id, &entry.key_name, &entry.key_value, exclude)
            .await?
        {
            debug!(
                form_id = %form_id,
                key_name = %entry.key_name,
                owner = %owner,
                "Unique key already taken"
            );
            return Err(IntegrityError::DuplicateValue {
                label: entry.label.clone(),
                display_value: entry.display_value.clone(),
            });
        }
    }
    Ok(())
}

/// Derive, check and store the keys of a created or updated submission
pub async fn recompute_on_write<I>(
    index: &I,
    form_id: Uuid,
    schema: &FormSchema,
    payload: &Payload,
    submission_id: Uuid,
) -> IntegrityResult<Vec<UniqueKeyEntry>>
where
    I: UniqueKeyIndex + ?Sized,
{
    let entries = derive_unique_key_entries(schema, payload)?;
    check_availability(index, form_id, &entries, Some(submission_id)).await?;
    index.replace_entries(submission_id, form_id, &entries).await?;
    Ok(entries)
}

type IndexKey = (Uuid, String, String);

/// In-memory unique key index for testing and development
#[derive(Clone, Default)]
pub struct InMemoryUniqueKeyIndex {
    owners: Arc<DashMap<IndexKey, Uuid>>,
    by_submission: Arc<DashMap<Uuid, Vec<IndexKey>>>,
    write_lock: Arc<Mutex<()>>,
}

impl InMemoryUniqueKeyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Load rows produced by a rebuild, replacing the current contents.
    ///
    /// Rows that repeat a key fail the whole load and leave the index as it was.
    pub async fn load(&self, rows: &[KeyRow]) -> IntegrityResult<()> {
        let _guard = self.write_lock.lock().await;

        let mut owners: HashMap<IndexKey, Uuid> = HashMap::with_capacity(rows.len());
        let mut by_submission: HashMap<Uuid, Vec<IndexKey>> = HashMap::new();
        for row in rows {
            let key = (row.form_id, row.key_name.clone(), row.key_value.clone());
            if owners.contains_key(&key) {
                return Err(IntegrityError::ConcurrentDuplicate);
            }
            owners.insert(key.clone(), row.submission_id);
            by_submission.entry(row.submission_id).or_default().push(key);
        }

        self.owners.clear();
        self.by_submission.clear();
        for (key, owner) in owners {
            self.owners.insert(key, owner);
        }
        for (submission_id, keys) in by_submission {
            self.by_submission.insert(submission_id, keys);
        }
        Ok(())
    }
}

#[async_trait]
impl UniqueKeyIndex for InMemoryUniqueKeyIndex {
    async fn find_conflict(
        &self,
        form_id: Uuid,
        key_name: &str,
        key_value: &str,
        exclude: Option<Uuid>,
    ) -> IntegrityResult<Option<Uuid>> {
        let key = (form_id, key_name.to_string(), key_value.to_string());
        Ok(self
            .owners
            .get(&key)
            .map(|owner| *owner.value())
            .filter(|owner| Some(*owner) != exclude))
    }

    async fn replace_entries(
        &self,
        submission_id: Uuid,
        form_id: Uuid,
        entries: &[UniqueKeyEntry],
    ) -> IntegrityResult<()> {
        let _guard = self.write_lock.lock().await;

        let new_keys: Vec<IndexKey> = entries
            .iter()
            .map(|e| (form_id, e.key_name.clone(), e.key_value.clone()))
            .collect();

        let taken = new_keys.iter().any(|key| {
            self.owners
                .get(key)
                .is_some_and(|owner| *owner.value() != submission_id)
        });
        if taken {
            return Err(IntegrityError::ConcurrentDuplicate);
        }

        if let Some((_, old_keys)) = self.by_submission.remove(&submission_id) {
            for key in old_keys {
                self.owners.remove(&key);
            }
        }

        for key in &new_keys {
            self.owners.insert(key.clone(), submission_id);
        }
        if !new_keys.is_empty() {
            self.by_submission.insert(submission_id, new_keys);
        }

        Ok(())
    }

    async fn remove_submission(&self, submission_id: Uuid) -> IntegrityResult<()> {
        let _guard = self.write_lock.lock().await;
        if let Some((_, keys)) = self.by_submission.remove(&submission_id) {
            for key in keys {
                self.owners.remove(&key);
            }
        }
        Ok(())
    }

    async fn entries_for_form(&self, form_id: Uuid) -> IntegrityResult<Vec<KeyRow>> {
        let mut rows: Vec<KeyRow> = self
            .owners
            .iter()
            .filter(|entry| entry.key().0 == form_id)
            .map(|entry| {
                let (form_id, key_name, key_value) = entry.key().clone();
                KeyRow {
                    submission_id: *entry.value(),
                    form_id,
                    key_name,
                    key_value,
                }
            })
            .collect();
        rows.sort_by(|a, b| (&a.key_name, &a.key_value).cmp(&(&b.key_name, &b.key_value)));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, value: &str) -> UniqueKeyEntry {
        UniqueKeyEntry {
            key_name: name.to_string(),
            key_value: value.to_string(),
            label: name.to_uppercase(),
            display_value: value.to_string(),
        }
    }

    #[tokio::test]
    async fn test_find_conflict_honours_exclude() {
        let index = InMemoryUniqueKeyIndex::new();
        let form = Uuid::new_v4();
        let owner = Uuid::new_v4();
        index.replace_entries(owner, form, &[entry("mrn", "1")]).await.unwrap();

        assert_eq!(index.find_conflict(form, "mrn", "1", None).await.unwrap(), Some(owner));
        assert_eq!(index.find_conflict(form, "mrn", "1", Some(owner)).await.unwrap(), None);
        assert_eq!(index.find_conflict(form, "mrn", "2", None).await.unwrap(), None);
        assert_eq!(
            index.find_conflict(Uuid::new_v4(), "mrn", "1", None).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_replace_swaps_rows() {
        let index = InMemoryUniqueKeyIndex::new();
        let form = Uuid::new_v4();
        let submission = Uuid::new_v4();

        index.replace_entries(submission, form, &[entry("mrn", "1")]).await.unwrap();
        index.replace_entries(submission, form, &[entry("mrn", "2")]).await.unwrap();

        let rows = index.entries_for_form(form).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key_value, "2");
        assert_eq!(index.find_conflict(form, "mrn", "1", None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_replace_is_all_or_nothing() {
        let index = InMemoryUniqueKeyIndex::new();
        let form = Uuid::new_v4();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        index.replace_entries(first, form, &[entry("mrn", "1")]).await.unwrap();
        index.replace_entries(second, form, &[entry("mrn", "2")]).await.unwrap();

        let result = index
            .replace_entries(second, form, &[entry("mrn", "1")])
            .await;
        assert_eq!(result, Err(IntegrityError::ConcurrentDuplicate));

        // second keeps its old key
        assert_eq!(index.find_conflict(form, "mrn", "2", None).await.unwrap(), Some(second));
        assert_eq!(index.len(), 2);
    }

    #[tokio::test]
    async fn test_check_availability_reports_label_and_value() {
        let index = InMemoryUniqueKeyIndex::new();
        let form = Uuid::new_v4();
        index
            .replace_entries(Uuid::new_v4(), form, &[entry("mrn", "77")])
            .await
            .unwrap();

        let err = check_availability(&index, form, &[entry("mrn", "77")], None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Duplicate value for unique key 'MRN': '77'.");
    }

    #[tokio::test]
    async fn test_remove_submission_frees_keys() {
        let index = InMemoryUniqueKeyIndex::new();
        let form = Uuid::new_v4();
        let submission = Uuid::new_v4();
        index.replace_entries(submission, form, &[entry("mrn", "1")]).await.unwrap();

        index.remove_submission(submission).await.unwrap();
        assert!(index.is_empty());
        assert!(check_availability(&index, form, &[entry("mrn", "1")], None).await.is_ok());
    }

    #[tokio::test]
    async fn test_load_rejects_duplicate_rows() {
        let index = InMemoryUniqueKeyIndex::new();
        let form = Uuid::new_v4();
        let row = |submission_id, value: &str| KeyRow {
            submission_id,
            form_id: form,
            key_name: "mrn".to_string(),
            key_value: value.to_string(),
        };

        let keep = Uuid::new_v4();
        index.load(&[row(keep, "0")]).await.unwrap();

        let result = index
            .load(&[row(Uuid::new_v4(), "1"), row(Uuid::new_v4(), "1")])
            .await;
        assert_eq!(result, Err(IntegrityError::ConcurrentDuplicate));

        // previous contents survive the failed load
        assert_eq!(index.len(), 1);
        assert_eq!(index.find_conflict(form, "mrn", "0", None).await.unwrap(), Some(keep));
        assert_eq!(index.find_conflict(form, "mrn", "1", None).await.unwrap(), None);
        assert_eq!(index.entries_for_form(form).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_load_replaces_contents() {
        let index = InMemoryUniqueKeyIndex::new();
        let form = Uuid::new_v4();
        let old = Uuid::new_v4();
        let new = Uuid::new_v4();
        index.replace_entries(old, form, &[entry("mrn", "1")]).await.unwrap();

        let row = KeyRow {
            submission_id: new,
            form_id: form,
            key_name: "mrn".to_string(),
            key_value: "2".to_string(),
        };
        index.load(&[row]).await.unwrap();

        assert_eq!(index.find_conflict(form, "mrn", "1", None).await.unwrap(), None);
        assert_eq!(index.find_conflict(form, "mrn", "2", None).await.unwrap(), Some(new));

        // the old submission no longer owns anything to remove
        index.remove_submission(old).await.unwrap();
        assert_eq!(index.len(), 1);
    }
}
