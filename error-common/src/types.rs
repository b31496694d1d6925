use thiserror::Error;

/// Process-level errors of the StudyDesk binaries
#[derive(Error, Debug)]
pub enum StudyDeskError {
    /// Network communication errors
    #[error("Network error: {0}")]
    NetworkError(String),

    /// HTTP server errors
    #[error("Server error: {0}")]
    ServerError(String),

    /// Database operation errors
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Logging setup errors
    #[error("Logging error: {0}")]
    LoggingError(String),

    /// Unique key maintenance errors
    #[error("Integrity error: {0}")]
    IntegrityError(String),

    /// Internal system errors
    #[error("Internal error: {0}")]
    InternalError(String),

    /// Wrapped external errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StudyDeskError {
    /// Stable code of the error category, see [`crate::codes`]
    pub fn code(&self) -> &'static str {
        use crate::codes;
        match self {
            StudyDeskError::NetworkError(_) | StudyDeskError::ServerError(_) => codes::system::SERVER_FAILURE,
            StudyDeskError::DatabaseError(_) => codes::database::QUERY_FAILED,
            StudyDeskError::ConfigError(_) => codes::system::INVALID_CONFIGURATION,
            StudyDeskError::LoggingError(_) => codes::system::LOGGING_FAILURE,
            StudyDeskError::IntegrityError(_) => codes::integrity::DUPLICATE_UNIQUE_KEY,
            StudyDeskError::InternalError(_) | StudyDeskError::Other(_) => codes::system::INTERNAL,
        }
    }
}

/// Result type alias for StudyDesk operations
pub type Result<T> = std::result::Result<T, StudyDeskError>;

/// Log an error with the place it surfaced
pub fn log_error(context: &str, error: &StudyDeskError) {
    tracing::error!(
        context = context,
        error_code = error.code(),
        error = %error,
        "StudyDesk error occurred"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_and_codes() {
        let err = StudyDeskError::ConfigError("jwt.secret is empty".to_string());
        assert_eq!(err.to_string(), "Configuration error: jwt.secret is empty");
        assert_eq!(err.code(), "SYS_9002");
    }

    #[test]
    fn test_anyhow_is_transparent() {
        let err = StudyDeskError::from(anyhow::anyhow!("socket closed"));
        assert_eq!(err.to_string(), "socket closed");
        assert_eq!(err.code(), "SYS_9000");
    }
}
