pub mod paths;

use axum::{
    routing::{get, post},
    Router,
};

use crate::{
    handlers::{export, forms, health, hospitals, studies, submissions, users},
    openapi,
    server::StudyDeskServer,
};

/// Create health check routes
pub fn health_routes() -> Router<StudyDeskServer> {
    Router::new()
        .route(paths::health::HEALTH, get(health::health_check))
        .route(paths::health::VERSION, get(health::version_info))
}

/// Create hospital routes
pub fn hospital_routes() -> Router<StudyDeskServer> {
    Router::new()
        .route(
            paths::hospitals::HOSPITALS,
            get(hospitals::list_hospitals).post(hospitals::create_hospital),
        )
        .route(
            paths::hospitals::HOSPITAL_BY_ID,
            get(hospitals::get_hospital)
                .put(hospitals::update_hospital)
                .delete(hospitals::delete_hospital),
        )
}

/// Create user routes
pub fn user_routes() -> Router<StudyDeskServer> {
    Router::new()
        .route(
            paths::users::USERS,
            get(users::list_users).post(users::create_user),
        )
        .route(paths::users::ME, get(users::get_current_user))
        .route(
            paths::users::USER_BY_ID,
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
}

/// Create study routes, including form assignment
pub fn study_routes() -> Router<StudyDeskServer> {
    Router::new()
        .route(
            paths::studies::STUDIES,
            get(studies::list_studies).post(studies::create_study),
        )
        .route(
            paths::studies::STUDY_BY_ID,
            get(studies::get_study)
                .put(studies::update_study)
                .delete(studies::delete_study),
        )
        .route(
            paths::studies::STUDY_FORM,
            post(studies::assign_form).delete(studies::remove_form),
        )
        .route(paths::studies::ARCHIVE, post(studies::archive_study))
        .route(paths::studies::UNARCHIVE, post(studies::unarchive_study))
}

/// Create form routes
pub fn form_routes() -> Router<StudyDeskServer> {
    Router::new()
        .route(
            paths::forms::FORMS,
            get(forms::list_forms).post(forms::create_form),
        )
        .route(
            paths::forms::FORM_BY_ID,
            get(forms::get_form)
                .put(forms::update_form)
                .delete(forms::delete_form),
        )
        .route(paths::forms::PROFILE, get(forms::get_form_profile))
}

/// Create submission routes
pub fn submission_routes() -> Router<StudyDeskServer> {
    Router::new()
        .route(
            paths::submissions::SUBMISSIONS,
            get(submissions::list_submissions).post(submissions::create_submission),
        )
        .route(
            paths::submissions::SUBMISSION_BY_ID,
            get(submissions::get_submission)
                .put(submissions::update_submission)
                .delete(submissions::delete_submission),
        )
}

/// Create export routes
pub fn export_routes() -> Router<StudyDeskServer> {
    Router::new()
        .route(paths::export::CSV, post(export::export_csv))
        .route(paths::export::JSON, post(export::export_json))
}

/// Create API v1 routes
pub fn api_v1_routes() -> Router<StudyDeskServer> {
    Router::new()
        .merge(hospital_routes())
        .merge(user_routes())
        .merge(study_routes())
        .merge(form_routes())
        .merge(submission_routes())
        .merge(export_routes())
}

/// Create all application routes
pub fn create_routes() -> Router<StudyDeskServer> {
    Router::new()
        // Health check routes (no authentication required)
        .merge(health_routes())
        // API documentation routes
        .merge(openapi::create_docs_routes())
        // API v1 routes (authentication required)
        .nest(paths::API_V1, api_v1_routes())
}
