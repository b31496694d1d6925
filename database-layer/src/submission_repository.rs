use form_integrity::{payload_from_value, recompute_on_write, Payload, UniqueKeyIndex};
use serde_json::Value;
use sqlx::{Pool, Postgres};
use tracing::info;
use uuid::Uuid;

use crate::error::{DatabaseError, DatabaseResult};
use crate::form_repository::lock_form_for_write;
use crate::models::{NewSubmission, Submission, SubmissionChanges};
use crate::study_repository::StudyRepository;
use crate::unique_key_index::PgUniqueKeyIndex;

/// Repository for submissions and their unique key rows
#[derive(Debug, Clone)]
pub struct SubmissionRepository {
    pool: Pool<Postgres>,
    studies: StudyRepository,
}

fn payload_text(data: &Value) -> DatabaseResult<(Payload, String)> {
    let text = serde_json::to_string(data)
        .map_err(|e| DatabaseError::InvalidInput(format!("Invalid submission data: {}", e)))?;
    Ok((payload_from_value(data.clone()), text))
}

impl SubmissionRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            studies: StudyRepository::new(pool.clone()),
            pool,
        }
    }

    pub async fn get(&self, id: Uuid) -> DatabaseResult<Submission> {
        sqlx::query_as::<_, Submission>(
            r#"
            SELECT id, form_id, study_id, user_id, data_json, created_at, updated_at
            FROM submissions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DatabaseError::NotFound("Submission not found"))
    }

    /// Store a new submission after checking the study lifecycle, the form
    /// assignment and the form's unique keys
    pub async fn create(&self, input: &NewSubmission, user_id: Uuid) -> DatabaseResult<Submission> {
        let study = self.studies.get(input.study_id).await?;

        let mut tx = self.pool.begin().await?;
        let form = lock_form_for_write(&mut *tx, input.form_id).await?;

        let status = study.status();
        if !status.accepts_submissions() {
            return Err(DatabaseError::InvalidInput(format!(
                "Submissions are only allowed when study status is Data Collection. Current status: {}.",
                status
            )));
        }

        let assigned = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM study_forms WHERE study_id = $1 AND form_id = $2)",
        )
        .bind(study.id)
        .bind(form.id)
        .fetch_one(&mut *tx)
        .await?;
        if !assigned {
            return Err(DatabaseError::InvalidInput(
                "Form is not assigned to this study".to_string(),
            ));
        }

        let (payload, text) = payload_text(&input.data_json)?;
        let id = Uuid::new_v4();

        let submission = sqlx::query_as::<_, Submission>(
            r#"
            INSERT INTO submissions (id, form_id, study_id, user_id, data_json)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, form_id, study_id, user_id, data_json, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(form.id)
        .bind(study.id)
        .bind(user_id)
        .bind(&text)
        .fetch_one(&mut *tx)
        .await?;

        let entries = {
            let index = PgUniqueKeyIndex::new(&mut *tx);
            recompute_on_write(&index, form.id, &form.schema(), &payload, id).await?
        };
        tx.commit().await?;

        info!(
            submission_id = %id,
            form_id = %form.id,
            study_id = %study.id,
            keys = entries.len(),
            "Submission created"
        );
        Ok(submission)
    }

    /// Replace the answers of a submission and move its unique keys
    pub async fn update(&self, id: Uuid, changes: &SubmissionChanges) -> DatabaseResult<Submission> {
        let (payload, text) = payload_text(&changes.data_json)?;

        let mut tx = self.pool.begin().await?;
        let form_id = sqlx::query_scalar::<_, Uuid>("SELECT form_id FROM submissions WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(DatabaseError::NotFound("Submission not found"))?;
        let form = lock_form_for_write(&mut *tx, form_id).await?;

        let submission = sqlx::query_as::<_, Submission>(
            r#"
            UPDATE submissions
            SET data_json = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, form_id, study_id, user_id, data_json, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&text)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DatabaseError::NotFound("Submission not found"))?;

        {
            let index = PgUniqueKeyIndex::new(&mut *tx);
            recompute_on_write(&index, form.id, &form.schema(), &payload, id).await?;
        }
        tx.commit().await?;

        info!(submission_id = %id, "Submission updated");
        Ok(submission)
    }

    /// Delete a submission and release its unique keys
    pub async fn delete(&self, id: Uuid) -> DatabaseResult<()> {
        let mut tx = self.pool.begin().await?;

        PgUniqueKeyIndex::new(&mut *tx).remove_submission(id).await?;
        let removed = sqlx::query("DELETE FROM submissions WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if removed.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("Submission not found"));
        }
        tx.commit().await?;

        info!(submission_id = %id, "Submission deleted");
        Ok(())
    }
}
