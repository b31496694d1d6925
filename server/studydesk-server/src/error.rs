use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use database_layer::DatabaseError;
use error_common::codes;
use form_integrity::IntegrityError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{error, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Standard API error response structure
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Error type
    #[schema(example = "validation_error")]
    pub error_type: String,
    /// Stable error code
    #[schema(example = "FORM_5003")]
    pub error_code: String,
    /// Human-readable error message
    pub message: String,
    /// Field-specific validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<HashMap<String, Vec<String>>>,
    /// Timestamp when error occurred
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Suggested actions for resolving the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

/// Standard API success response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResponseMetadata>,
}

/// Response metadata for pagination
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResponseMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginationInfo {
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

/// Main API error enum
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field_errors: Option<HashMap<String, Vec<String>>>,
    },

    #[error("Authentication error: {message}")]
    Authentication { message: String, code: &'static str },

    #[error("Authorization error: {message}")]
    Authorization { message: String },

    #[error("Resource not found: {message}")]
    NotFound { message: String },

    #[error("Resource conflict: {message}")]
    Conflict { message: String },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Integrity error: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    #[error("Bad request: {message}")]
    BadRequest { message: String },
}

impl ApiError {
    /// Create a validation error with field-specific errors
    pub fn validation_with_fields(
        message: impl Into<String>,
        field_errors: HashMap<String, Vec<String>>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            field_errors: Some(field_errors),
        }
    }

    /// Create a simple validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field_errors: None,
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
            code: codes::authentication::INVALID_TOKEN,
        }
    }

    pub fn missing_token() -> Self {
        Self::Authentication {
            message: "Missing Authorization header".to_string(),
            code: codes::authentication::MISSING_TOKEN,
        }
    }

    pub fn inactive_user() -> Self {
        Self::Authentication {
            message: "Inactive user".to_string(),
            code: codes::authentication::INACTIVE_USER,
        }
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
        }
    }

    /// The caller lacks the role or ownership the operation needs
    pub fn forbidden() -> Self {
        Self::authorization("Not enough permissions")
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Authentication { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Authorization { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Database(db_err) => match db_err {
                DatabaseError::NotFound(_) => StatusCode::NOT_FOUND,
                DatabaseError::Conflict(_) => StatusCode::CONFLICT,
                DatabaseError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                DatabaseError::Integrity(err) => integrity_status(err),
                DatabaseError::ConnectionFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Integrity(err) => integrity_status(err),
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get the error type string
    pub fn error_type(&self) -> &'static str {
        let status = self.status_code();
        if status == StatusCode::BAD_REQUEST {
            match self {
                ApiError::BadRequest { .. } => "bad_request",
                _ => "validation_error",
            }
        } else if status == StatusCode::UNAUTHORIZED {
            "authentication_error"
        } else if status == StatusCode::FORBIDDEN {
            "authorization_error"
        } else if status == StatusCode::NOT_FOUND {
            "not_found"
        } else if status == StatusCode::CONFLICT {
            "conflict"
        } else if status == StatusCode::SERVICE_UNAVAILABLE {
            "service_unavailable"
        } else if matches!(self, ApiError::Database(_)) {
            "database_error"
        } else {
            "internal_error"
        }
    }

    /// Stable error code, see [`error_common::codes`]
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Validation { field_errors: Some(_), .. } => codes::validation::MISSING_REQUIRED_FIELD,
            ApiError::Validation { .. } => codes::validation::INVALID_INPUT,
            ApiError::BadRequest { .. } => codes::validation::INVALID_FORMAT,
            ApiError::Authentication { code, .. } => *code,
            ApiError::Authorization { .. } => codes::authorization::ACCESS_DENIED,
            ApiError::NotFound { .. } => codes::resource::NOT_FOUND,
            ApiError::Conflict { .. } => codes::resource::CONFLICT,
            ApiError::Database(db_err) => match db_err {
                DatabaseError::NotFound(_) => codes::resource::NOT_FOUND,
                DatabaseError::Conflict(_) => codes::resource::CONFLICT,
                DatabaseError::InvalidInput(_) => codes::validation::INVALID_INPUT,
                DatabaseError::Integrity(err) => integrity_code(err),
                DatabaseError::ConnectionFailed(_) => codes::database::CONNECTION_FAILED,
                _ => codes::database::QUERY_FAILED,
            },
            ApiError::Integrity(err) => integrity_code(err),
            ApiError::Internal { .. } => codes::system::INTERNAL,
            ApiError::ServiceUnavailable { .. } => codes::database::CONNECTION_FAILED,
        }
    }

    /// Message shown to the client; internal details stay in the logs
    pub fn client_message(&self) -> String {
        match self {
            ApiError::Validation { message, .. }
            | ApiError::Authentication { message, .. }
            | ApiError::Authorization { message }
            | ApiError::NotFound { message }
            | ApiError::Conflict { message }
            | ApiError::Internal { message }
            | ApiError::ServiceUnavailable { message }
            | ApiError::BadRequest { message } => message.clone(),
            ApiError::Database(db_err) => ApiError::format_database_error(db_err),
            ApiError::Integrity(err) => integrity_message(err),
        }
    }

    /// Get suggested actions for resolving the error
    pub fn suggestions(&self) -> Option<Vec<String>> {
        let status = self.status_code();
        if status == StatusCode::UNAUTHORIZED {
            Some(vec![
                "Check if your token has expired".to_string(),
                "Ask an administrator to reactivate your account".to_string(),
            ])
        } else if status == StatusCode::FORBIDDEN {
            Some(vec!["Contact your administrator for access".to_string()])
        } else if status == StatusCode::SERVICE_UNAVAILABLE {
            Some(vec![
                "Try again in a few moments".to_string(),
                "Contact support if the issue persists".to_string(),
            ])
        } else {
            match self {
                ApiError::Integrity(err) | ApiError::Database(DatabaseError::Integrity(err)) => {
                    integrity_suggestions(err)
                }
                _ => None,
            }
        }
    }

    /// Pretty format database errors for better user experience
    pub fn format_database_error(db_error: &DatabaseError) -> String {
        match db_error {
            DatabaseError::NotFound(_) | DatabaseError::Conflict(_) | DatabaseError::InvalidInput(_) => {
                db_error.to_string()
            }
            DatabaseError::Integrity(err) => integrity_message(err),
            DatabaseError::ConnectionFailed(_) => {
                "Unable to connect to the database. Try again in a few moments.".to_string()
            }
            DatabaseError::SqlxError(sqlx::Error::RowNotFound) => {
                "Requested record not found.".to_string()
            }
            _ => "Database operation failed. Please try again.".to_string(),
        }
    }
}

fn integrity_status(err: &IntegrityError) -> StatusCode {
    match err {
        IntegrityError::DuplicatesFound(_) => StatusCode::CONFLICT,
        err if err.is_user_facing() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn integrity_code(err: &IntegrityError) -> &'static str {
    match err {
        IntegrityError::NoUniqueKeyConfigured => codes::integrity::NO_UNIQUE_KEY,
        IntegrityError::MissingUniqueValue { .. } => codes::integrity::MISSING_UNIQUE_VALUE,
        IntegrityError::UniqueValueTooLong { .. } => codes::integrity::UNIQUE_VALUE_TOO_LONG,
        IntegrityError::DuplicateValue { .. }
        | IntegrityError::ConcurrentDuplicate
        | IntegrityError::DuplicatesFound(_) => codes::integrity::DUPLICATE_UNIQUE_KEY,
        IntegrityError::InvalidSchema(_) => codes::integrity::INVALID_SCHEMA,
        IntegrityError::Serialization(_) | IntegrityError::Index(_) => codes::system::INTERNAL,
    }
}

fn integrity_message(err: &IntegrityError) -> String {
    match err {
        IntegrityError::DuplicatesFound(duplicates) => format!(
            "The new unique key would collide: {} existing submission(s) share a value.",
            duplicates.len()
        ),
        IntegrityError::Serialization(_) | IntegrityError::Index(_) => {
            "Unable to check unique keys. Please try again.".to_string()
        }
        other => other.to_string(),
    }
}

fn integrity_suggestions(err: &IntegrityError) -> Option<Vec<String>> {
    match err {
        IntegrityError::DuplicateValue { .. } | IntegrityError::ConcurrentDuplicate => Some(vec![
            "Check whether this record was already submitted".to_string(),
            "Edit the existing submission instead of creating a new one".to_string(),
        ]),
        IntegrityError::MissingUniqueValue { .. } => Some(vec![
            "Fill in every unique key field before submitting".to_string(),
        ]),
        _ => None,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4().to_string();
        let status_code = self.status_code();

        if status_code.is_server_error() {
            error!(
                error_id = %error_id,
                error_type = %self.error_type(),
                status_code = %status_code.as_u16(),
                error = %self,
                "API error occurred"
            );
        } else {
            warn!(
                error_id = %error_id,
                error_type = %self.error_type(),
                status_code = %status_code.as_u16(),
                error = %self,
                "Request rejected"
            );
        }

        let field_errors = match &self {
            ApiError::Validation { field_errors, .. } => field_errors.clone(),
            _ => None,
        };

        let error_response = ApiErrorResponse {
            error_id,
            error_type: self.error_type().to_string(),
            error_code: self.error_code().to_string(),
            message: self.client_message(),
            field_errors,
            timestamp: chrono::Utc::now(),
            suggestions: self.suggestions(),
        };

        (status_code, Json(error_response)).into_response()
    }
}

/// Helper function to create successful API responses
pub fn api_success<T>(data: T) -> ApiResponse<T> {
    ApiResponse {
        success: true,
        data,
        metadata: None,
    }
}

/// Helper function to create successful API responses with metadata
pub fn api_success_with_meta<T>(data: T, metadata: ResponseMetadata) -> ApiResponse<T> {
    ApiResponse {
        success: true,
        data,
        metadata: Some(metadata),
    }
}

/// Convert SQLx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(sqlx_error: sqlx::Error) -> Self {
        ApiError::Database(DatabaseError::SqlxError(sqlx_error))
    }
}

/// Convert anyhow errors to API errors
impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        ApiError::Internal {
            message: error.to_string(),
        }
    }
}

/// Convert serde JSON errors to API errors
impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        ApiError::BadRequest {
            message: format!("Invalid JSON: {}", error),
        }
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
