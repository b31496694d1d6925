use form_integrity::{
    key_name_for, plan_rebuild, FormSchema, RebuildMode, StoredSubmission, SubmissionSnapshot,
};
use sqlx::{PgConnection, Pool, Postgres};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{DatabaseError, DatabaseResult};
use crate::models::{Form, FormChanges, NewForm, Submission};
use crate::unique_key_index::{delete_form_keys, insert_key_rows};

/// Repository for form definitions
#[derive(Debug, Clone)]
pub struct FormRepository {
    pool: Pool<Postgres>,
}

impl FormRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn list_all(&self) -> DatabaseResult<Vec<Form>> {
        let forms = sqlx::query_as::<_, Form>(
            r#"
            SELECT id, name, description, schema_json, created_by, created_at, updated_at
            FROM forms
            ORDER BY created_at DESC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(forms)
    }

    /// Forms assigned to at least one study
    pub async fn list_assigned(&self) -> DatabaseResult<Vec<Form>> {
        let forms = sqlx::query_as::<_, Form>(
            r#"
            SELECT f.id, f.name, f.description, f.schema_json, f.created_by,
                   f.created_at, f.updated_at
            FROM forms f
            WHERE EXISTS (SELECT 1 FROM study_forms sf WHERE sf.form_id = f.id)
            ORDER BY f.created_at DESC, f.id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(forms)
    }

    pub async fn get(&self, id: Uuid) -> DatabaseResult<Form> {
        sqlx::query_as::<_, Form>(
            r#"
            SELECT id, name, description, schema_json, created_by, created_at, updated_at
            FROM forms
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DatabaseError::NotFound("Form not found"))
    }

    pub async fn is_assigned_to_any_study(&self, id: Uuid) -> DatabaseResult<bool> {
        let assigned = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM study_forms WHERE form_id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(assigned)
    }

    pub async fn create(&self, input: &NewForm, created_by: Uuid) -> DatabaseResult<Form> {
        FormSchema::from_value(&input.schema_json).validate()?;

        let form = sqlx::query_as::<_, Form>(
            r#"
            INSERT INTO forms (id, name, description, schema_json, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, description, schema_json, created_by, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(&input.schema_json)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;

        info!(form_id = %form.id, "Form created");
        Ok(form)
    }

    /// Update a form. When the set of unique-key fields changes, the key rows
    /// of every existing submission are rebuilt in the same transaction and
    /// the update is refused if the new key would collide.
    pub async fn update(&self, id: Uuid, changes: &FormChanges) -> DatabaseResult<Form> {
        let new_schema = match &changes.schema_json {
            Some(value) => {
                let schema = FormSchema::from_value(value);
                schema.validate()?;
                Some(schema)
            }
            None => None,
        };

        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Form>(
            r#"
            SELECT id, name, description, schema_json, created_by, created_at, updated_at
            FROM forms
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DatabaseError::NotFound("Form not found"))?;

        let form = sqlx::query_as::<_, Form>(
            r#"
            UPDATE forms
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                schema_json = COALESCE($4, schema_json),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, description, schema_json, created_by, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(changes.name.as_deref().map(str::trim))
        .bind(&changes.description)
        .bind(&changes.schema_json)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(schema) = new_schema {
            if key_name_for(&schema) != key_name_for(&current.schema()) {
                let rows = rebuild_form_keys(&mut *tx, id, &schema).await?;
                info!(form_id = %id, rows, "Unique keys rebuilt after schema change");
            }
        }

        tx.commit().await?;
        info!(form_id = %id, "Form updated");
        Ok(form)
    }

    /// Delete a form without submissions; study assignments cascade
    pub async fn delete(&self, id: Uuid) -> DatabaseResult<()> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_scalar::<_, Uuid>("SELECT id FROM forms WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(DatabaseError::NotFound("Form not found"));
        }

        let has_submissions = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM submissions WHERE form_id = $1)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if has_submissions {
            return Err(DatabaseError::Conflict(
                "Cannot delete form with existing submissions".to_string(),
            ));
        }

        sqlx::query("DELETE FROM forms WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(form_id = %id, "Form deleted");
        Ok(())
    }

    /// Submissions of a form, optionally limited to one study, for profiling
    pub async fn snapshots(
        &self,
        form_id: Uuid,
        study_id: Option<Uuid>,
    ) -> DatabaseResult<Vec<SubmissionSnapshot>> {
        let submissions = sqlx::query_as::<_, Submission>(
            r#"
            SELECT id, form_id, study_id, user_id, data_json, created_at, updated_at
            FROM submissions
            WHERE form_id = $1 AND ($2::uuid IS NULL OR study_id = $2)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(form_id)
        .bind(study_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(submissions.iter().map(Submission::snapshot).collect())
    }
}

/// Read a form and hold a share lock on it until the transaction ends.
///
/// Submission writers take this lock and schema changes take `FOR UPDATE`, so
/// key rows are always derived from the schema they were rebuilt for.
pub(crate) async fn lock_form_for_write(
    conn: &mut PgConnection,
    id: Uuid,
) -> DatabaseResult<Form> {
    sqlx::query_as::<_, Form>(
        r#"
        SELECT id, name, description, schema_json, created_by, created_at, updated_at
        FROM forms
        WHERE id = $1
        FOR SHARE
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or(DatabaseError::NotFound("Form not found"))
}

/// Every submission of a form as rebuild input
pub async fn stored_submissions(
    conn: &mut PgConnection,
    form_id: Option<Uuid>,
) -> DatabaseResult<Vec<StoredSubmission>> {
    let submissions = sqlx::query_as::<_, Submission>(
        r#"
        SELECT id, form_id, study_id, user_id, data_json, created_at, updated_at
        FROM submissions
        WHERE ($1::uuid IS NULL OR form_id = $1)
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(form_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(submissions.iter().map(Submission::stored).collect())
}

/// Recompute the key rows of one form from its stored submissions
async fn rebuild_form_keys(
    conn: &mut PgConnection,
    form_id: Uuid,
    schema: &FormSchema,
) -> DatabaseResult<usize> {
    let submissions = stored_submissions(conn, Some(form_id)).await?;
    let plan = plan_rebuild(&[(form_id, schema.clone())], &submissions, RebuildMode::Strict)?;

    if plan.skipped_incomplete > 0 {
        warn!(
            form_id = %form_id,
            skipped = plan.skipped_incomplete,
            "Submissions without a complete unique key were left unindexed"
        );
    }

    delete_form_keys(conn, form_id).await?;
    insert_key_rows(conn, &plan.rows).await?;
    Ok(plan.rows.len())
}
