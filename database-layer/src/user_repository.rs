use sqlx::{Pool, Postgres};
use tracing::info;
use uuid::Uuid;

use crate::error::{is_unique_violation, DatabaseError, DatabaseResult};
use crate::models::{NewUser, User, UserChanges};

const USER_EMAIL_CONSTRAINT: &str = "uq_users_email";

fn map_user_write(err: sqlx::Error) -> DatabaseError {
    if is_unique_violation(&err, Some(USER_EMAIL_CONSTRAINT)) {
        DatabaseError::Conflict("A user with this email already exists".to_string())
    } else {
        DatabaseError::SqlxError(err)
    }
}

/// Repository for user accounts
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: Pool<Postgres>,
}

impl UserRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        hospital_id: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, full_name, role, hospital_id, is_active, created_at
            FROM users
            WHERE ($1::uuid IS NULL OR hospital_id = $1)
            ORDER BY email ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(hospital_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    pub async fn count(&self, hospital_id: Option<Uuid>) -> DatabaseResult<i64> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE ($1::uuid IS NULL OR hospital_id = $1)",
        )
        .bind(hospital_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    pub async fn find(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, full_name, role, hospital_id, is_active, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get(&self, id: Uuid) -> DatabaseResult<User> {
        self.find(id).await?.ok_or(DatabaseError::NotFound("User not found"))
    }

    pub async fn create(&self, input: &NewUser) -> DatabaseResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, full_name, role, hospital_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, full_name, role, hospital_id, is_active, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.email.trim().to_lowercase())
        .bind(input.full_name.trim())
        .bind(input.role.as_str())
        .bind(input.hospital_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_user_write)?;

        info!(user_id = %user.id, role = %user.role, "User created");
        Ok(user)
    }

    pub async fn update(&self, id: Uuid, changes: &UserChanges) -> DatabaseResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email = COALESCE($2, email),
                full_name = COALESCE($3, full_name),
                role = COALESCE($4, role),
                hospital_id = COALESCE($5, hospital_id),
                is_active = COALESCE($6, is_active)
            WHERE id = $1
            RETURNING id, email, full_name, role, hospital_id, is_active, created_at
            "#,
        )
        .bind(id)
        .bind(changes.email.as_deref().map(|e| e.trim().to_lowercase()))
        .bind(changes.full_name.as_deref().map(str::trim))
        .bind(changes.role.map(|r| r.as_str()))
        .bind(changes.hospital_id)
        .bind(changes.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_user_write)?
        .ok_or(DatabaseError::NotFound("User not found"))
    }

    /// Delete a user that has not submitted any data
    pub async fn delete(&self, id: Uuid) -> DatabaseResult<()> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(DatabaseError::NotFound("User not found"));
        }

        let submissions =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM submissions WHERE user_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if submissions > 0 {
            return Err(DatabaseError::Conflict(format!(
                "Cannot delete user with {} submission(s). Deactivate the account instead.",
                submissions
            )));
        }

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(user_id = %id, "User deleted");
        Ok(())
    }
}
