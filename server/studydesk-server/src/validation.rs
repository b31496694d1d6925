//! Request validation utilities for consistent validation across handlers
//!
//! This module provides a `RequestValidation` trait and helper macros to
//! centralize validation logic and ensure consistent error messages.

use database_layer::{
    HospitalChanges, NewForm, NewHospital, NewStudy, NewSubmission, NewUser, StudyChanges,
    StudyMetadata, SubmissionChanges, UserChanges,
};
use form_integrity::FormSchema;

use crate::error::ApiError;

/// Trait for validating request payloads
///
/// Implemented for every create/update request body; handlers call it
/// before touching the database.
pub trait RequestValidation {
    /// Returns `Err(ApiError)` with a validation message when the request
    /// is not acceptable
    fn validate(&self) -> Result<(), ApiError>;
}

/// Validate a field with a custom predicate
///
/// ```rust,ignore
/// validate_field!(self.email, self.email.contains('@'), "Invalid email format");
/// ```
#[macro_export]
macro_rules! validate_field {
    ($field:expr, $predicate:expr, $message:expr) => {
        if !$predicate {
            return Err($crate::error::ApiError::validation($message));
        }
    };
}

/// Validate a required, non-blank string
#[macro_export]
macro_rules! validate_required {
    ($field:expr, $message:expr) => {
        $crate::validate_field!($field, !$field.trim().is_empty(), $message);
    };
}

/// Validate string length in characters
#[macro_export]
macro_rules! validate_length {
    ($field:expr, $min:expr, $max:expr, $message:expr) => {
        let len = $field.chars().count();
        $crate::validate_field!($field, len >= $min && len <= $max, $message);
    };
}

/// Validate email format (basic check)
#[macro_export]
macro_rules! validate_email {
    ($field:expr, $message:expr) => {
        $crate::validate_field!($field, $crate::validation::looks_like_email(&$field), $message);
    };
}

/// Validate an optional string only when present
#[macro_export]
macro_rules! validate_optional {
    ($field:expr, |$value:ident| $check:block) => {
        if let Some($value) = $field.as_deref() {
            $check
        }
    };
}

/// `local@domain.tld` with no whitespace
pub fn looks_like_email(value: &str) -> bool {
    let value = value.trim();
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

impl RequestValidation for NewHospital {
    fn validate(&self) -> Result<(), ApiError> {
        validate_required!(self.name, "Hospital name is required");
        validate_length!(self.name, 1, 200, "Hospital name must be at most 200 characters");
        Ok(())
    }
}

impl RequestValidation for HospitalChanges {
    fn validate(&self) -> Result<(), ApiError> {
        validate_optional!(self.name, |name| {
            validate_required!(name, "Hospital name cannot be empty");
            validate_length!(name, 1, 200, "Hospital name must be at most 200 characters");
        });
        Ok(())
    }
}

impl RequestValidation for NewUser {
    fn validate(&self) -> Result<(), ApiError> {
        validate_required!(self.email, "Email is required");
        validate_email!(self.email, "Invalid email format");
        validate_required!(self.full_name, "Full name is required");
        validate_length!(self.full_name, 1, 200, "Full name must be at most 200 characters");
        Ok(())
    }
}

impl RequestValidation for UserChanges {
    fn validate(&self) -> Result<(), ApiError> {
        validate_optional!(self.email, |email| {
            validate_email!(email, "Invalid email format");
        });
        validate_optional!(self.full_name, |name| {
            validate_required!(name, "Full name cannot be empty");
        });
        Ok(())
    }
}

impl RequestValidation for StudyMetadata {
    fn validate(&self) -> Result<(), ApiError> {
        for email in self.emails() {
            validate_email!(email, "Invalid investigator email format");
        }
        Ok(())
    }
}

impl RequestValidation for NewStudy {
    fn validate(&self) -> Result<(), ApiError> {
        validate_required!(self.name, "Study name is required");
        validate_length!(self.name, 1, 200, "Study name must be at most 200 characters");
        self.metadata.validate()
    }
}

impl RequestValidation for StudyChanges {
    fn validate(&self) -> Result<(), ApiError> {
        validate_optional!(self.name, |name| {
            validate_required!(name, "Study name cannot be empty");
        });
        self.metadata.validate()
    }
}

impl RequestValidation for NewForm {
    fn validate(&self) -> Result<(), ApiError> {
        validate_required!(self.name, "Form name is required");
        FormSchema::from_value(&self.schema_json).validate()?;
        Ok(())
    }
}

impl RequestValidation for database_layer::FormChanges {
    fn validate(&self) -> Result<(), ApiError> {
        validate_optional!(self.name, |name| {
            validate_required!(name, "Form name cannot be empty");
        });
        if let Some(schema) = &self.schema_json {
            FormSchema::from_value(schema).validate()?;
        }
        Ok(())
    }
}

impl RequestValidation for NewSubmission {
    fn validate(&self) -> Result<(), ApiError> {
        validate_field!(self.form_id, !self.form_id.is_nil(), "form_id is required");
        validate_field!(self.study_id, !self.study_id.is_nil(), "study_id is required");
        validate_field!(self.data_json, self.data_json.is_object(), "data_json must be a JSON object");
        Ok(())
    }
}

impl RequestValidation for SubmissionChanges {
    fn validate(&self) -> Result<(), ApiError> {
        validate_field!(self.data_json, self.data_json.is_object(), "data_json must be a JSON object");
        Ok(())
    }
}
