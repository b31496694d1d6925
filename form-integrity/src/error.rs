use thiserror::Error;

use crate::backfill::DuplicateKey;

/// Errors raised while deriving, checking or rebuilding unique keys
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    /// The form has no field flagged `unique_key`
    #[error("This form is invalid: no unique key field is configured. Please contact an administrator.")]
    NoUniqueKeyConfigured,

    /// A key component is absent or blank in the payload
    #[error("Unique key field '{label}' is required and cannot be empty.")]
    MissingUniqueValue { label: String },

    /// The normalized key is longer than the index accepts
    #[error("Unique key value for '{label}' is too long (at most {max} bytes).")]
    UniqueValueTooLong { label: String, max: usize },

    /// Another submission of the same form already owns the key
    #[error("Duplicate value for unique key '{label}': '{display_value}'.")]
    DuplicateValue {
        label: String,
        display_value: String,
    },

    /// The storage constraint rejected the key after the pre-check passed
    #[error("Duplicate value detected for a unique key field.")]
    ConcurrentDuplicate,

    #[error("Invalid form schema: {0}")]
    InvalidSchema(String),

    #[error("Found {} duplicate unique key value(s)", .0.len())]
    DuplicatesFound(Vec<DuplicateKey>),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unique key index error: {0}")]
    Index(String),
}

impl IntegrityError {
    /// True for errors caused by the submitted data rather than the system
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            IntegrityError::NoUniqueKeyConfigured
                | IntegrityError::MissingUniqueValue { .. }
                | IntegrityError::UniqueValueTooLong { .. }
                | IntegrityError::DuplicateValue { .. }
                | IntegrityError::ConcurrentDuplicate
                | IntegrityError::InvalidSchema(_)
        )
    }
}

pub type IntegrityResult<T> = Result<T, IntegrityError>;
