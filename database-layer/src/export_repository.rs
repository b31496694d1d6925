use sqlx::{Pool, Postgres};
use tracing::debug;

use crate::error::DatabaseResult;
use crate::models::{ExportFilters, ExportRow};

/// Read-only query behind the CSV and JSON exports
#[derive(Debug, Clone)]
pub struct ExportRepository {
    pool: Pool<Postgres>,
}

impl ExportRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Submissions matching `filters` with their author, oldest first.
    /// Date bounds are inclusive.
    pub async fn rows(&self, filters: &ExportFilters) -> DatabaseResult<Vec<ExportRow>> {
        let rows = sqlx::query_as::<_, ExportRow>(
            r#"
            SELECT s.id AS submission_id, s.form_id, s.study_id, s.user_id,
                   u.email AS user_email, u.full_name AS user_full_name, u.hospital_id,
                   s.data_json, s.created_at, s.updated_at
            FROM submissions s
            JOIN users u ON u.id = s.user_id
            WHERE ($1::uuid IS NULL OR s.study_id = $1)
              AND ($2::uuid IS NULL OR s.form_id = $2)
              AND ($3::uuid IS NULL OR u.hospital_id = $3)
              AND ($4::timestamptz IS NULL OR s.created_at >= $4)
              AND ($5::timestamptz IS NULL OR s.created_at <= $5)
            ORDER BY s.created_at ASC, s.id ASC
            "#,
        )
        .bind(filters.study_id)
        .bind(filters.form_id)
        .bind(filters.hospital_id)
        .bind(filters.start_date)
        .bind(filters.end_date)
        .fetch_all(&self.pool)
        .await?;

        debug!(rows = rows.len(), "Export rows selected");
        Ok(rows)
    }
}
