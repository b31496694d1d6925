use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use database_layer::{Form, FormChanges, NewForm};
use form_integrity::{profile_form, FormProfile};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::error::{api_success, ApiError, ApiResponse};
use crate::handlers::MessageResponse;
use crate::middleware::AuthContext;
use crate::server::StudyDeskServer;
use crate::validation::RequestValidation;

/// Form Profile Query Parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FormProfileParams {
    /// Profile only the submissions of this study
    pub study_id: Option<Uuid>,
}

/// Load a form the caller may read; users only see forms assigned to a study
async fn readable_form(
    server: &StudyDeskServer,
    auth: &AuthContext,
    form_id: Uuid,
) -> Result<Form, ApiError> {
    let form = server.forms.get(form_id).await?;
    if !auth.is_admin() && !server.forms.is_assigned_to_any_study(form.id).await? {
        return Err(ApiError::forbidden());
    }
    Ok(form)
}

/// List forms
#[utoipa::path(
    get,
    path = "/api/v1/forms",
    responses(
        (status = 200, description = "Forms retrieved successfully", body = Vec<Form>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "forms",
    security(("bearer_auth" = []))
)]
pub async fn list_forms(
    State(server): State<StudyDeskServer>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Vec<Form>>>, ApiError> {
    let forms = if auth.is_admin() {
        server.forms.list_all().await?
    } else {
        server.forms.list_assigned().await?
    };
    Ok(Json(api_success(forms)))
}

/// Get a form by ID
#[utoipa::path(
    get,
    path = "/api/v1/forms/{form_id}",
    responses(
        (status = 200, description = "Form retrieved successfully", body = Form),
        (status = 403, description = "Form is not assigned to any study"),
        (status = 404, description = "Form not found")
    ),
    params(("form_id" = Uuid, Path, description = "Form ID")),
    tag = "forms",
    security(("bearer_auth" = []))
)]
pub async fn get_form(
    State(server): State<StudyDeskServer>,
    Path(form_id): Path<Uuid>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Form>>, ApiError> {
    let form = readable_form(&server, &auth, form_id).await?;
    Ok(Json(api_success(form)))
}

/// Completion profile of a form
#[utoipa::path(
    get,
    path = "/api/v1/forms/{form_id}/profile",
    responses(
        (status = 200, description = "Completion profile", body = Object),
        (status = 403, description = "Form is not assigned to any study"),
        (status = 404, description = "Form or study not found")
    ),
    params(
        ("form_id" = Uuid, Path, description = "Form ID"),
        FormProfileParams
    ),
    tag = "forms",
    security(("bearer_auth" = []))
)]
pub async fn get_form_profile(
    State(server): State<StudyDeskServer>,
    Path(form_id): Path<Uuid>,
    Query(params): Query<FormProfileParams>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<FormProfile>>, ApiError> {
    let form = readable_form(&server, &auth, form_id).await?;
    if let Some(study_id) = params.study_id {
        server.studies.get(study_id).await?;
    }

    let snapshots = server.forms.snapshots(form.id, params.study_id).await?;
    Ok(Json(api_success(profile_form(&form.schema(), &snapshots))))
}

/// Create a form
#[utoipa::path(
    post,
    path = "/api/v1/forms",
    request_body = NewForm,
    responses(
        (status = 201, description = "Form created successfully", body = Form),
        (status = 400, description = "Invalid form schema"),
        (status = 403, description = "Admin role required")
    ),
    tag = "forms",
    security(("bearer_auth" = []))
)]
pub async fn create_form(
    State(server): State<StudyDeskServer>,
    auth: AuthContext,
    Json(request): Json<NewForm>,
) -> Result<(StatusCode, Json<ApiResponse<Form>>), ApiError> {
    auth.require_admin()?;
    request.validate()?;

    let form = server.forms.create(&request, auth.user_id()).await?;
    Ok((StatusCode::CREATED, Json(api_success(form))))
}

/// Update a form
///
/// A schema change that moves the unique key rebuilds the form's key index;
/// existing duplicates under the new key reject the update.
#[utoipa::path(
    put,
    path = "/api/v1/forms/{form_id}",
    request_body = FormChanges,
    responses(
        (status = 200, description = "Form updated successfully", body = Form),
        (status = 400, description = "Invalid form schema"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Form not found"),
        (status = 409, description = "Existing submissions collide under the new key")
    ),
    params(("form_id" = Uuid, Path, description = "Form ID")),
    tag = "forms",
    security(("bearer_auth" = []))
)]
pub async fn update_form(
    State(server): State<StudyDeskServer>,
    Path(form_id): Path<Uuid>,
    auth: AuthContext,
    Json(request): Json<FormChanges>,
) -> Result<Json<ApiResponse<Form>>, ApiError> {
    auth.require_admin()?;
    request.validate()?;

    let form = server.forms.update(form_id, &request).await?;
    Ok(Json(api_success(form)))
}

/// Delete a form without submissions
#[utoipa::path(
    delete,
    path = "/api/v1/forms/{form_id}",
    responses(
        (status = 200, description = "Form deleted", body = MessageResponse),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Form not found"),
        (status = 409, description = "Form has submissions")
    ),
    params(("form_id" = Uuid, Path, description = "Form ID")),
    tag = "forms",
    security(("bearer_auth" = []))
)]
pub async fn delete_form(
    State(server): State<StudyDeskServer>,
    Path(form_id): Path<Uuid>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    auth.require_admin()?;

    server.forms.delete(form_id).await?;
    Ok(Json(api_success(MessageResponse::new("Form deleted successfully"))))
}
