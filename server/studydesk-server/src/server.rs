use std::sync::Arc;
use std::time::Instant;

use database_layer::{
    DatabasePool, ExportRepository, FormRepository, HospitalRepository, StudyRepository,
    SubmissionRepository, UserRepository,
};
use error_common::{Result, StudyDeskError};
use jsonwebtoken::DecodingKey;
use logger_redacted::PiiRedactor;
use sqlx::PgPool;
use tracing::info;

use crate::config::Settings;

/// Main StudyDesk server state
#[derive(Clone)]
pub struct StudyDeskServer {
    /// Server configuration
    pub config: Arc<Settings>,
    /// Database connection pool
    pub db: DatabasePool,
    pub hospitals: HospitalRepository,
    pub users: UserRepository,
    pub studies: StudyRepository,
    pub forms: FormRepository,
    pub submissions: SubmissionRepository,
    pub exports: ExportRepository,
    /// Redactor for values that end up in logs
    pub redactor: PiiRedactor,
    /// Key verifying bearer tokens
    pub jwt_key: Arc<DecodingKey>,
    pub started_at: Instant,
}

impl StudyDeskServer {
    /// Connect to the database and build the server state
    ///
    /// # Errors
    ///
    /// Fails when the database is unreachable or migrations fail.
    pub async fn new(config: Settings) -> Result<Self> {
        let db = DatabasePool::with_settings(&config.database.url, &config.database.pool)
            .await
            .map_err(|e| StudyDeskError::DatabaseError(e.to_string()))?;

        if config.database.run_migrations {
            db.migrate()
                .await
                .map_err(|e| StudyDeskError::DatabaseError(e.to_string()))?;
        }

        Ok(Self::with_pool(db.pool().clone(), config))
    }

    /// Build the server state around an existing pool
    pub fn with_pool(pool: PgPool, config: Settings) -> Self {
        let redactor = PiiRedactor::new(config.logging.redaction());
        let jwt_key = DecodingKey::from_secret(config.jwt.secret.as_bytes());

        info!(name = %config.server.name, "Server state initialized");

        Self {
            hospitals: HospitalRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            studies: StudyRepository::new(pool.clone()),
            forms: FormRepository::new(pool.clone()),
            submissions: SubmissionRepository::new(pool.clone()),
            exports: ExportRepository::new(pool.clone()),
            db: DatabasePool::from_pool(pool),
            redactor,
            jwt_key: Arc::new(jwt_key),
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
