use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("Failed to install tracing subscriber: {0}")]
    InitFailed(String),
}
