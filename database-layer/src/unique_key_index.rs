// PostgreSQL backed unique key index
use async_trait::async_trait;
use form_integrity::{IntegrityError, IntegrityResult, KeyRow, UniqueKeyEntry, UniqueKeyIndex};
use sqlx::PgConnection;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DatabaseError, DatabaseResult};

/// Unique key rows stored in `submission_unique_keys`, read and written
/// through the caller's open transaction.
///
/// The `uq_submission_unique_keys_key` constraint is the final guard against
/// concurrent writers that both passed the availability pre-check.
#[derive(Debug)]
pub struct PgUniqueKeyIndex<'c> {
    conn: Mutex<&'c mut PgConnection>,
}

impl<'c> PgUniqueKeyIndex<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

fn index_error(err: DatabaseError) -> IntegrityError {
    match err {
        DatabaseError::Integrity(inner) => inner,
        other => IntegrityError::Index(other.to_string()),
    }
}

#[async_trait]
impl<'c> UniqueKeyIndex for PgUniqueKeyIndex<'c> {
    async fn find_conflict(
        &self,
        form_id: Uuid,
        key_name: &str,
        key_value: &str,
        exclude: Option<Uuid>,
    ) -> IntegrityResult<Option<Uuid>> {
        let mut conn = self.conn.lock().await;
        let owner = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT submission_id
            FROM submission_unique_keys
            WHERE form_id = $1 AND key_name = $2 AND key_value = $3
              AND ($4::uuid IS NULL OR submission_id <> $4)
            LIMIT 1
            "#,
        )
        .bind(form_id)
        .bind(key_name)
        .bind(key_value)
        .bind(exclude)
        .fetch_optional(&mut **conn)
        .await
        .map_err(|e| IntegrityError::Index(e.to_string()))?;

        Ok(owner)
    }

    async fn replace_entries(
        &self,
        submission_id: Uuid,
        form_id: Uuid,
        entries: &[UniqueKeyEntry],
    ) -> IntegrityResult<()> {
        let mut conn = self.conn.lock().await;
        sqlx::query("DELETE FROM submission_unique_keys WHERE submission_id = $1")
            .bind(submission_id)
            .execute(&mut **conn)
            .await
            .map_err(|e| IntegrityError::Index(e.to_string()))?;

        let rows: Vec<KeyRow> = entries
            .iter()
            .map(|entry| KeyRow::from_entry(submission_id, form_id, entry))
            .collect();
        insert_key_rows(&mut **conn, &rows).await.map_err(index_error)?;

        debug!(
            submission_id = %submission_id,
            keys = entries.len(),
            "Unique keys stored"
        );
        Ok(())
    }

    async fn remove_submission(&self, submission_id: Uuid) -> IntegrityResult<()> {
        let mut conn = self.conn.lock().await;
        let removed = sqlx::query("DELETE FROM submission_unique_keys WHERE submission_id = $1")
            .bind(submission_id)
            .execute(&mut **conn)
            .await
            .map_err(|e| IntegrityError::Index(e.to_string()))?;

        debug!(
            submission_id = %submission_id,
            keys = removed.rows_affected(),
            "Unique keys released"
        );
        Ok(())
    }

    async fn entries_for_form(&self, form_id: Uuid) -> IntegrityResult<Vec<KeyRow>> {
        let mut conn = self.conn.lock().await;
        let rows = sqlx::query_as::<_, (Uuid, Uuid, String, String)>(
            r#"
            SELECT submission_id, form_id, key_name, key_value
            FROM submission_unique_keys
            WHERE form_id = $1
            ORDER BY id
            "#,
        )
        .bind(form_id)
        .fetch_all(&mut **conn)
        .await
        .map_err(|e| IntegrityError::Index(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(submission_id, form_id, key_name, key_value)| KeyRow {
                submission_id,
                form_id,
                key_name,
                key_value,
            })
            .collect())
    }
}

/// Insert precomputed key rows, mapping the unique constraint to a duplicate error
pub async fn insert_key_rows(conn: &mut PgConnection, rows: &[KeyRow]) -> DatabaseResult<()> {
    for row in rows {
        sqlx::query(
            r#"
            INSERT INTO submission_unique_keys (submission_id, form_id, key_name, key_value)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(row.submission_id)
        .bind(row.form_id)
        .bind(&row.key_name)
        .bind(&row.key_value)
        .execute(&mut *conn)
        .await
        .map_err(DatabaseError::from_key_insert)?;
    }
    Ok(())
}

/// Drop every key row of a form, used before rebuilding it
pub async fn delete_form_keys(conn: &mut PgConnection, form_id: Uuid) -> DatabaseResult<u64> {
    let result = sqlx::query("DELETE FROM submission_unique_keys WHERE form_id = $1")
        .bind(form_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}
