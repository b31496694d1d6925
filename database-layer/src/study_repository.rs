use sqlx::{Pool, Postgres};
use tracing::info;
use uuid::Uuid;

use crate::error::{DatabaseError, DatabaseResult};
use crate::models::{Form, NewStudy, Study, StudyChanges, StudyStatus};

/// Study columns with the legacy flags derived from `status`
const STUDY_COLUMNS: &str = r#"
    id, name, description, title, summary, primary_coordinating_center,
    principal_investigator_name, principal_investigator_email,
    sub_investigator_name, sub_investigator_email, general_objective,
    specific_objectives, inclusion_exclusion_criteria, data_collection_deadline,
    status,
    (status IN ('Data Collection', 'Analysis')) AS is_active,
    (status = 'Canceled') AS is_archived,
    created_by, created_at, updated_at
"#;

/// Repository for studies and their form assignments
#[derive(Debug, Clone)]
pub struct StudyRepository {
    pool: Pool<Postgres>,
}

impl StudyRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List studies; closed and canceled ones only when `include_closed` is set
    pub async fn list(&self, include_closed: bool) -> DatabaseResult<Vec<Study>> {
        let sql = format!(
            r#"
            SELECT {STUDY_COLUMNS}
            FROM studies
            WHERE ($1 OR status IN ('Data Collection', 'Analysis'))
            ORDER BY created_at DESC, id ASC
            "#
        );
        let studies = sqlx::query_as::<_, Study>(&sql)
            .bind(include_closed)
            .fetch_all(&self.pool)
            .await?;

        Ok(studies)
    }

    pub async fn get(&self, id: Uuid) -> DatabaseResult<Study> {
        let sql = format!("SELECT {STUDY_COLUMNS} FROM studies WHERE id = $1");
        sqlx::query_as::<_, Study>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DatabaseError::NotFound("Study not found"))
    }

    pub async fn create(&self, input: &NewStudy, created_by: Uuid) -> DatabaseResult<Study> {
        let status = input.status.unwrap_or(StudyStatus::DataCollection);
        let meta = &input.metadata;
        let sql = format!(
            r#"
            INSERT INTO studies (
                id, name, description, title, summary, primary_coordinating_center,
                principal_investigator_name, principal_investigator_email,
                sub_investigator_name, sub_investigator_email, general_objective,
                specific_objectives, inclusion_exclusion_criteria,
                data_collection_deadline, status, created_by
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING {STUDY_COLUMNS}
            "#
        );
        let study = sqlx::query_as::<_, Study>(&sql)
            .bind(Uuid::new_v4())
            .bind(input.name.trim())
            .bind(&input.description)
            .bind(&meta.title)
            .bind(&meta.summary)
            .bind(&meta.primary_coordinating_center)
            .bind(&meta.principal_investigator_name)
            .bind(&meta.principal_investigator_email)
            .bind(&meta.sub_investigator_name)
            .bind(&meta.sub_investigator_email)
            .bind(&meta.general_objective)
            .bind(&meta.specific_objectives)
            .bind(&meta.inclusion_exclusion_criteria)
            .bind(meta.data_collection_deadline)
            .bind(status.as_str())
            .bind(created_by)
            .fetch_one(&self.pool)
            .await?;

        info!(study_id = %study.id, status = %study.status, "Study created");
        Ok(study)
    }

    /// Apply the provided fields; absent fields keep their value
    pub async fn update(&self, id: Uuid, changes: &StudyChanges) -> DatabaseResult<Study> {
        let meta = &changes.metadata;
        let sql = format!(
            r#"
            UPDATE studies
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                title = COALESCE($4, title),
                summary = COALESCE($5, summary),
                primary_coordinating_center = COALESCE($6, primary_coordinating_center),
                principal_investigator_name = COALESCE($7, principal_investigator_name),
                principal_investigator_email = COALESCE($8, principal_investigator_email),
                sub_investigator_name = COALESCE($9, sub_investigator_name),
                sub_investigator_email = COALESCE($10, sub_investigator_email),
                general_objective = COALESCE($11, general_objective),
                specific_objectives = COALESCE($12, specific_objectives),
                inclusion_exclusion_criteria = COALESCE($13, inclusion_exclusion_criteria),
                data_collection_deadline = COALESCE($14, data_collection_deadline),
                status = COALESCE($15, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {STUDY_COLUMNS}
            "#
        );
        let study = sqlx::query_as::<_, Study>(&sql)
            .bind(id)
            .bind(changes.name.as_deref().map(str::trim))
            .bind(&changes.description)
            .bind(&meta.title)
            .bind(&meta.summary)
            .bind(&meta.primary_coordinating_center)
            .bind(&meta.principal_investigator_name)
            .bind(&meta.principal_investigator_email)
            .bind(&meta.sub_investigator_name)
            .bind(&meta.sub_investigator_email)
            .bind(&meta.general_objective)
            .bind(&meta.specific_objectives)
            .bind(&meta.inclusion_exclusion_criteria)
            .bind(meta.data_collection_deadline)
            .bind(changes.status.map(|s| s.as_str()))
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DatabaseError::NotFound("Study not found"))?;

        info!(study_id = %id, "Study updated");
        Ok(study)
    }

    pub async fn set_status(&self, id: Uuid, status: StudyStatus) -> DatabaseResult<Study> {
        let changes = StudyChanges {
            status: Some(status),
            ..StudyChanges::default()
        };
        self.update(id, &changes).await
    }

    /// Delete a study without submissions; form assignments cascade
    pub async fn delete(&self, id: Uuid) -> DatabaseResult<()> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_scalar::<_, Uuid>("SELECT id FROM studies WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(DatabaseError::NotFound("Study not found"));
        }

        let submissions =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM submissions WHERE study_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if submissions > 0 {
            return Err(DatabaseError::Conflict(format!(
                "Cannot delete study with {} submission(s). Please set status to Closed or Canceled instead.",
                submissions
            )));
        }

        sqlx::query("DELETE FROM studies WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(study_id = %id, "Study deleted");
        Ok(())
    }

    /// Forms assigned to a study
    pub async fn forms_for_study(&self, study_id: Uuid) -> DatabaseResult<Vec<Form>> {
        let forms = sqlx::query_as::<_, Form>(
            r#"
            SELECT f.id, f.name, f.description, f.schema_json, f.created_by,
                   f.created_at, f.updated_at
            FROM forms f
            JOIN study_forms sf ON sf.form_id = f.id
            WHERE sf.study_id = $1
            ORDER BY sf.created_at ASC, f.name ASC
            "#,
        )
        .bind(study_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(forms)
    }

    pub async fn assign_form(&self, study_id: Uuid, form_id: Uuid) -> DatabaseResult<()> {
        self.get(study_id).await?;
        let form_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM forms WHERE id = $1)")
                .bind(form_id)
                .fetch_one(&self.pool)
                .await?;
        if !form_exists {
            return Err(DatabaseError::NotFound("Form not found"));
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO study_forms (study_id, form_id)
            VALUES ($1, $2)
            ON CONFLICT (study_id, form_id) DO NOTHING
            "#,
        )
        .bind(study_id)
        .bind(form_id)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(DatabaseError::Conflict(
                "Form already assigned to this study".to_string(),
            ));
        }

        info!(study_id = %study_id, form_id = %form_id, "Form assigned to study");
        Ok(())
    }

    pub async fn remove_form(&self, study_id: Uuid, form_id: Uuid) -> DatabaseResult<()> {
        let removed = sqlx::query("DELETE FROM study_forms WHERE study_id = $1 AND form_id = $2")
            .bind(study_id)
            .bind(form_id)
            .execute(&self.pool)
            .await?;

        if removed.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("Form not assigned to this study"));
        }

        info!(study_id = %study_id, form_id = %form_id, "Form removed from study");
        Ok(())
    }
}
