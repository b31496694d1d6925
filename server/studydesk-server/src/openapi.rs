use axum::Router;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::server::StudyDeskServer;

/// Main OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    info(
        title = "StudyDesk API",
        description = "Research form data collection across participating hospitals"
    ),
    paths(
        // Health endpoints
        crate::handlers::health::health_check,
        crate::handlers::health::version_info,

        // Hospitals
        crate::handlers::hospitals::list_hospitals,
        crate::handlers::hospitals::get_hospital,
        crate::handlers::hospitals::create_hospital,
        crate::handlers::hospitals::update_hospital,
        crate::handlers::hospitals::delete_hospital,

        // Users
        crate::handlers::users::list_users,
        crate::handlers::users::get_current_user,
        crate::handlers::users::get_user,
        crate::handlers::users::create_user,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,

        // Studies
        crate::handlers::studies::list_studies,
        crate::handlers::studies::get_study,
        crate::handlers::studies::create_study,
        crate::handlers::studies::update_study,
        crate::handlers::studies::delete_study,
        crate::handlers::studies::assign_form,
        crate::handlers::studies::remove_form,
        crate::handlers::studies::archive_study,
        crate::handlers::studies::unarchive_study,

        // Forms
        crate::handlers::forms::list_forms,
        crate::handlers::forms::get_form,
        crate::handlers::forms::get_form_profile,
        crate::handlers::forms::create_form,
        crate::handlers::forms::update_form,
        crate::handlers::forms::delete_form,

        // Submissions
        crate::handlers::submissions::list_submissions,
        crate::handlers::submissions::create_submission,
        crate::handlers::submissions::get_submission,
        crate::handlers::submissions::update_submission,
        crate::handlers::submissions::delete_submission,

        // Export
        crate::handlers::export::export_csv,
        crate::handlers::export::export_json,
    ),
    components(
        schemas(
            crate::handlers::health::HealthResponse,
            crate::handlers::health::VersionResponse,
            crate::handlers::MessageResponse,
            crate::handlers::studies::StudyWithForms,
            crate::handlers::studies::StudyFormDetail,
            crate::handlers::submissions::SubmissionResponse,
            crate::error::ApiErrorResponse,
            crate::error::ResponseMetadata,
            crate::error::PaginationInfo,
            database_layer::Role,
            database_layer::StudyStatus,
            database_layer::Hospital,
            database_layer::NewHospital,
            database_layer::HospitalChanges,
            database_layer::User,
            database_layer::NewUser,
            database_layer::UserChanges,
            database_layer::StudyMetadata,
            database_layer::Study,
            database_layer::NewStudy,
            database_layer::StudyChanges,
            database_layer::Form,
            database_layer::NewForm,
            database_layer::FormChanges,
            database_layer::NewSubmission,
            database_layer::SubmissionChanges,
            database_layer::ExportFilters,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Service health and version"),
        (name = "hospitals", description = "Participating hospitals"),
        (name = "users", description = "User directory and roles"),
        (name = "studies", description = "Study lifecycle and form assignment"),
        (name = "forms", description = "Form definitions and completion profiles"),
        (name = "submissions", description = "Collected form data with unique key enforcement"),
        (name = "export", description = "CSV and JSON data export")
    )
)]
pub struct ApiDoc;

/// Registers the bearer token scheme referenced by `security(("bearer_auth" = []))`
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::builder().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
            );
        }
    }
}

/// Create documentation routes
pub fn create_docs_routes() -> Router<StudyDeskServer> {
    Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
