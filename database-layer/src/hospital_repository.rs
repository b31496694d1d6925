use sqlx::{Pool, Postgres};
use tracing::info;
use uuid::Uuid;

use crate::error::{DatabaseError, DatabaseResult};
use crate::models::{Hospital, HospitalChanges, NewHospital};

/// Repository for hospital operations
#[derive(Debug, Clone)]
pub struct HospitalRepository {
    pool: Pool<Postgres>,
}

impl HospitalRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn list(&self, limit: i64, offset: i64) -> DatabaseResult<Vec<Hospital>> {
        let hospitals = sqlx::query_as::<_, Hospital>(
            r#"
            SELECT id, name, address, contact_info, created_at
            FROM hospitals
            ORDER BY name ASC, id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(hospitals)
    }

    pub async fn count(&self) -> DatabaseResult<i64> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM hospitals")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    pub async fn get(&self, id: Uuid) -> DatabaseResult<Hospital> {
        sqlx::query_as::<_, Hospital>(
            r#"
            SELECT id, name, address, contact_info, created_at
            FROM hospitals
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DatabaseError::NotFound("Hospital not found"))
    }

    pub async fn exists(&self, id: Uuid) -> DatabaseResult<bool> {
        let found = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM hospitals WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(found)
    }

    pub async fn create(&self, input: &NewHospital) -> DatabaseResult<Hospital> {
        let hospital = sqlx::query_as::<_, Hospital>(
            r#"
            INSERT INTO hospitals (id, name, address, contact_info)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, address, contact_info, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.name.trim())
        .bind(&input.address)
        .bind(&input.contact_info)
        .fetch_one(&self.pool)
        .await?;

        info!(hospital_id = %hospital.id, "Hospital created");
        Ok(hospital)
    }

    pub async fn update(&self, id: Uuid, changes: &HospitalChanges) -> DatabaseResult<Hospital> {
        sqlx::query_as::<_, Hospital>(
            r#"
            UPDATE hospitals
            SET name = COALESCE($2, name),
                address = COALESCE($3, address),
                contact_info = COALESCE($4, contact_info)
            WHERE id = $1
            RETURNING id, name, address, contact_info, created_at
            "#,
        )
        .bind(id)
        .bind(changes.name.as_deref().map(str::trim))
        .bind(&changes.address)
        .bind(&changes.contact_info)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DatabaseError::NotFound("Hospital not found"))
    }

    /// Delete a hospital that has no users assigned
    pub async fn delete(&self, id: Uuid) -> DatabaseResult<()> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_scalar::<_, Uuid>("SELECT id FROM hospitals WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(DatabaseError::NotFound("Hospital not found"));
        }

        let users = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE hospital_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if users > 0 {
            return Err(DatabaseError::Conflict(
                "Cannot delete hospital with assigned users".to_string(),
            ));
        }

        sqlx::query("DELETE FROM hospitals WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(hospital_id = %id, "Hospital deleted");
        Ok(())
    }
}
