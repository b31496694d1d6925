use form_integrity::IntegrityError;
use thiserror::Error;

/// Name of the storage constraint guarding unique key rows
pub const UNIQUE_KEY_CONSTRAINT: &str = "uq_submission_unique_keys_key";

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Carries the full user-facing message, e.g. "Study not found"
    #[error("{0}")]
    NotFound(&'static str),

    /// The operation would break a referential rule (e.g. deleting a
    /// hospital that still has users)
    #[error("{0}")]
    Conflict(String),

    /// The request is well formed but not allowed in the current state
    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl DatabaseError {
    /// Map a failed key row insert, turning the unique constraint into the
    /// user-facing duplicate error
    pub fn from_key_insert(err: sqlx::Error) -> Self {
        if is_unique_violation(&err, Some(UNIQUE_KEY_CONSTRAINT)) {
            DatabaseError::Integrity(IntegrityError::ConcurrentDuplicate)
        } else {
            DatabaseError::SqlxError(err)
        }
    }
}

/// True when `err` is a Postgres unique violation, optionally on a specific
/// constraint
pub fn is_unique_violation(err: &sqlx::Error, constraint: Option<&str>) -> bool {
    let Some(db_err) = err.as_database_error() else {
        return false;
    };
    let code_matches = db_err.code().is_some_and(|code| code == UNIQUE_VIOLATION);
    match constraint {
        Some(expected) => code_matches && db_err.constraint().map_or(true, |c| c == expected),
        None => code_matches,
    }
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_are_not_unique_violations() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound, None));
        assert!(matches!(
            DatabaseError::from_key_insert(sqlx::Error::RowNotFound),
            DatabaseError::SqlxError(sqlx::Error::RowNotFound)
        ));
    }

    #[test]
    fn test_integrity_errors_keep_their_message() {
        let err = DatabaseError::from(IntegrityError::ConcurrentDuplicate);
        assert_eq!(err.to_string(), "Duplicate value detected for a unique key field.");
    }
}
