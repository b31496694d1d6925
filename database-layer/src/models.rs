// Database models
use chrono::{DateTime, NaiveDate, Utc};
use form_integrity::{parse_payload, FormSchema, Payload, StoredSubmission, SubmissionSnapshot};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// ============================================================================
// ROLES AND STATUSES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    /// Unknown role strings are treated as the least privileged role
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::User
        }
    }
}

/// Study lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum StudyStatus {
    #[serde(rename = "Data Collection")]
    DataCollection,
    Analysis,
    Closed,
    Canceled,
}

impl StudyStatus {
    pub const ALL: [StudyStatus; 4] = [
        StudyStatus::DataCollection,
        StudyStatus::Analysis,
        StudyStatus::Closed,
        StudyStatus::Canceled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StudyStatus::DataCollection => "Data Collection",
            StudyStatus::Analysis => "Analysis",
            StudyStatus::Closed => "Closed",
            StudyStatus::Canceled => "Canceled",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == raw.trim())
    }

    /// Only studies collecting data accept new submissions
    pub fn accepts_submissions(&self) -> bool {
        matches!(self, StudyStatus::DataCollection)
    }

    /// Legacy `is_active` flag
    pub fn is_active(&self) -> bool {
        matches!(self, StudyStatus::DataCollection | StudyStatus::Analysis)
    }

    /// Legacy `is_archived` flag
    pub fn is_archived(&self) -> bool {
        matches!(self, StudyStatus::Canceled)
    }

    /// Closed and canceled studies are hidden from default listings
    pub fn is_open(&self) -> bool {
        self.is_active()
    }

    /// Status implied by the legacy archive flag
    pub fn from_legacy_flags(is_archived: bool) -> Self {
        if is_archived {
            StudyStatus::Canceled
        } else {
            StudyStatus::DataCollection
        }
    }
}

impl std::fmt::Display for StudyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// HOSPITALS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Hospital {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub contact_info: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewHospital {
    pub name: String,
    pub address: Option<String>,
    pub contact_info: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct HospitalChanges {
    pub name: Option<String>,
    pub address: Option<String>,
    pub contact_info: Option<String>,
}

// ============================================================================
// USERS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub hospital_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn role(&self) -> Role {
        Role::parse(&self.role)
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Role::Admin
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub role: Role,
    pub hospital_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UserChanges {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub hospital_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

// ============================================================================
// STUDIES
// ============================================================================

/// Descriptive protocol fields of a study
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StudyMetadata {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub primary_coordinating_center: Option<String>,
    pub principal_investigator_name: Option<String>,
    pub principal_investigator_email: Option<String>,
    pub sub_investigator_name: Option<String>,
    pub sub_investigator_email: Option<String>,
    pub general_objective: Option<String>,
    pub specific_objectives: Option<String>,
    pub inclusion_exclusion_criteria: Option<String>,
    pub data_collection_deadline: Option<NaiveDate>,
}

impl StudyMetadata {
    /// Email addresses present in the metadata
    pub fn emails(&self) -> impl Iterator<Item = &str> {
        [
            self.principal_investigator_email.as_deref(),
            self.sub_investigator_email.as_deref(),
        ]
        .into_iter()
        .flatten()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Study {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub metadata: StudyMetadata,
    pub status: String,
    pub is_active: bool,
    pub is_archived: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Study {
    /// Typed status; rows written by this crate always parse
    pub fn status(&self) -> StudyStatus {
        StudyStatus::parse(&self.status).unwrap_or(StudyStatus::DataCollection)
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewStudy {
    pub name: String,
    pub description: Option<String>,
    pub status: Option<StudyStatus>,
    #[serde(flatten)]
    pub metadata: StudyMetadata,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct StudyChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<StudyStatus>,
    #[serde(flatten)]
    pub metadata: StudyMetadata,
}

// ============================================================================
// FORMS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Form {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub schema_json: Value,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Form {
    pub fn schema(&self) -> FormSchema {
        FormSchema::from_value(&self.schema_json)
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewForm {
    pub name: String,
    pub description: Option<String>,
    pub schema_json: Value,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct FormChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub schema_json: Option<Value>,
}

// ============================================================================
// SUBMISSIONS
// ============================================================================

/// Submission row; `data_json` is the stored text, see [`Submission::payload`]
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Submission {
    pub id: Uuid,
    pub form_id: Uuid,
    pub study_id: Uuid,
    pub user_id: Uuid,
    pub data_json: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    pub fn payload(&self) -> Payload {
        parse_payload(&self.data_json)
    }

    pub fn snapshot(&self) -> SubmissionSnapshot {
        SubmissionSnapshot::new(self.payload(), self.created_at)
            .with_user(self.user_id)
            .with_updated_at(self.updated_at)
    }

    pub fn stored(&self) -> StoredSubmission {
        StoredSubmission {
            id: self.id,
            form_id: self.form_id,
            payload: self.payload(),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewSubmission {
    pub form_id: Uuid,
    pub study_id: Uuid,
    pub data_json: Value,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SubmissionChanges {
    pub data_json: Value,
}

/// Export selection; every filter is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ExportFilters {
    pub study_id: Option<Uuid>,
    pub form_id: Option<Uuid>,
    pub hospital_id: Option<Uuid>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Submission joined with its author, as exported
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ExportRow {
    pub submission_id: Uuid,
    pub form_id: Uuid,
    pub study_id: Uuid,
    pub user_id: Uuid,
    pub user_email: String,
    pub user_full_name: String,
    pub hospital_id: Option<Uuid>,
    pub data_json: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExportRow {
    pub fn payload(&self) -> Payload {
        parse_payload(&self.data_json)
    }
}
