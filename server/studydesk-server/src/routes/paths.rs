//! Centralized API route path constants
//!
//! utoipa `#[path(...)]` attributes need string literals, so the handler
//! annotations repeat these paths with the `/api/v1` prefix and `{param}`
//! placeholders. Keep both in step.

/// API base path
pub const API_V1: &str = "/api/v1";

/// Health check endpoints (outside `/api/v1`)
pub mod health {
    pub const HEALTH: &str = "/health";
    pub const VERSION: &str = "/version";
}

/// Hospital endpoints
pub mod hospitals {
    pub const HOSPITALS: &str = "/hospitals";
    pub const HOSPITAL_BY_ID: &str = "/hospitals/:hospital_id";
}

/// User endpoints
pub mod users {
    pub const USERS: &str = "/users";
    pub const ME: &str = "/users/me";
    pub const USER_BY_ID: &str = "/users/:user_id";
}

/// Study endpoints
pub mod studies {
    pub const STUDIES: &str = "/studies";
    pub const STUDY_BY_ID: &str = "/studies/:study_id";
    pub const STUDY_FORM: &str = "/studies/:study_id/forms/:form_id";
    pub const ARCHIVE: &str = "/studies/:study_id/archive";
    pub const UNARCHIVE: &str = "/studies/:study_id/unarchive";
}

/// Form endpoints
pub mod forms {
    pub const FORMS: &str = "/forms";
    pub const FORM_BY_ID: &str = "/forms/:form_id";
    pub const PROFILE: &str = "/forms/:form_id/profile";
}

/// Submission endpoints
pub mod submissions {
    pub const SUBMISSIONS: &str = "/submissions";
    pub const SUBMISSION_BY_ID: &str = "/submissions/:submission_id";
}

/// Export endpoints
pub mod export {
    pub const CSV: &str = "/export/csv";
    pub const JSON: &str = "/export/json";
}
