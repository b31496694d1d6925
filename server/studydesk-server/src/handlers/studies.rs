use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use database_layer::{Form, NewStudy, Study, StudyChanges, StudyStatus};
use form_integrity::{profile_form, FormProfile};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{api_success, ApiError, ApiResponse};
use crate::handlers::MessageResponse;
use crate::middleware::AuthContext;
use crate::server::StudyDeskServer;
use crate::validation::RequestValidation;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// List Studies Query Parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListStudiesParams {
    /// Also return Closed and Canceled studies (admins only)
    #[serde(default)]
    pub include_closed_canceled: bool,
    /// Older name of `include_closed_canceled`
    #[serde(default)]
    pub include_archived: bool,
}

impl ListStudiesParams {
    /// Whether the listing covers every lifecycle status for this caller
    pub fn include_all_statuses(&self, is_admin: bool) -> bool {
        is_admin && (self.include_closed_canceled || self.include_archived)
    }
}

/// A form assigned to a study with its completion profile over the study's
/// submissions
#[derive(Debug, Serialize, ToSchema)]
pub struct StudyFormDetail {
    #[serde(flatten)]
    pub form: Form,
    #[schema(value_type = Object)]
    pub profile: FormProfile,
}

/// Study with its assigned forms
#[derive(Debug, Serialize, ToSchema)]
pub struct StudyWithForms {
    #[serde(flatten)]
    pub study: Study,
    pub forms: Vec<StudyFormDetail>,
}

// ============================================================================
// API HANDLERS
// ============================================================================

/// List studies
///
/// Regular users only ever see studies in Data Collection or Analysis.
#[utoipa::path(
    get,
    path = "/api/v1/studies",
    responses(
        (status = 200, description = "Studies retrieved successfully", body = Vec<Study>),
        (status = 401, description = "Unauthorized")
    ),
    params(ListStudiesParams),
    tag = "studies",
    security(("bearer_auth" = []))
)]
pub async fn list_studies(
    State(server): State<StudyDeskServer>,
    Query(params): Query<ListStudiesParams>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Vec<Study>>>, ApiError> {
    let studies = server
        .studies
        .list(params.include_all_statuses(auth.is_admin()))
        .await?;
    Ok(Json(api_success(studies)))
}

/// Get a study with its forms and their completion profiles
#[utoipa::path(
    get,
    path = "/api/v1/studies/{study_id}",
    responses(
        (status = 200, description = "Study retrieved successfully", body = StudyWithForms),
        (status = 404, description = "Study not found")
    ),
    params(("study_id" = Uuid, Path, description = "Study ID")),
    tag = "studies",
    security(("bearer_auth" = []))
)]
pub async fn get_study(
    State(server): State<StudyDeskServer>,
    Path(study_id): Path<Uuid>,
    _auth: AuthContext,
) -> Result<Json<ApiResponse<StudyWithForms>>, ApiError> {
    let study = server.studies.get(study_id).await?;
    let forms = server.studies.forms_for_study(study.id).await?;

    let mut details = Vec::with_capacity(forms.len());
    for form in forms {
        let snapshots = server.forms.snapshots(form.id, Some(study.id)).await?;
        let profile = profile_form(&form.schema(), &snapshots);
        details.push(StudyFormDetail { form, profile });
    }

    Ok(Json(api_success(StudyWithForms {
        study,
        forms: details,
    })))
}

/// Create a study
#[utoipa::path(
    post,
    path = "/api/v1/studies",
    request_body = NewStudy,
    responses(
        (status = 201, description = "Study created successfully", body = Study),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Admin role required")
    ),
    tag = "studies",
    security(("bearer_auth" = []))
)]
pub async fn create_study(
    State(server): State<StudyDeskServer>,
    auth: AuthContext,
    Json(request): Json<NewStudy>,
) -> Result<(StatusCode, Json<ApiResponse<Study>>), ApiError> {
    auth.require_admin()?;
    request.validate()?;

    let study = server.studies.create(&request, auth.user_id()).await?;
    Ok((StatusCode::CREATED, Json(api_success(study))))
}

/// Update a study
#[utoipa::path(
    put,
    path = "/api/v1/studies/{study_id}",
    request_body = StudyChanges,
    responses(
        (status = 200, description = "Study updated successfully", body = Study),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Study not found")
    ),
    params(("study_id" = Uuid, Path, description = "Study ID")),
    tag = "studies",
    security(("bearer_auth" = []))
)]
pub async fn update_study(
    State(server): State<StudyDeskServer>,
    Path(study_id): Path<Uuid>,
    auth: AuthContext,
    Json(request): Json<StudyChanges>,
) -> Result<Json<ApiResponse<Study>>, ApiError> {
    auth.require_admin()?;
    request.validate()?;

    let study = server.studies.update(study_id, &request).await?;
    Ok(Json(api_success(study)))
}

/// Delete a study without submissions
#[utoipa::path(
    delete,
    path = "/api/v1/studies/{study_id}",
    responses(
        (status = 200, description = "Study deleted", body = MessageResponse),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Study not found"),
        (status = 409, description = "Study has submissions")
    ),
    params(("study_id" = Uuid, Path, description = "Study ID")),
    tag = "studies",
    security(("bearer_auth" = []))
)]
pub async fn delete_study(
    State(server): State<StudyDeskServer>,
    Path(study_id): Path<Uuid>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    auth.require_admin()?;

    server.studies.delete(study_id).await?;
    Ok(Json(api_success(MessageResponse::new("Study deleted successfully"))))
}

/// Assign a form to a study
#[utoipa::path(
    post,
    path = "/api/v1/studies/{study_id}/forms/{form_id}",
    responses(
        (status = 200, description = "Form assigned", body = MessageResponse),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Study or form not found"),
        (status = 409, description = "Form already assigned to this study")
    ),
    params(
        ("study_id" = Uuid, Path, description = "Study ID"),
        ("form_id" = Uuid, Path, description = "Form ID")
    ),
    tag = "studies",
    security(("bearer_auth" = []))
)]
pub async fn assign_form(
    State(server): State<StudyDeskServer>,
    Path((study_id, form_id)): Path<(Uuid, Uuid)>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    auth.require_admin()?;

    server.studies.assign_form(study_id, form_id).await?;
    Ok(Json(api_success(MessageResponse::new(
        "Form assigned to study successfully",
    ))))
}

/// Remove a form from a study
#[utoipa::path(
    delete,
    path = "/api/v1/studies/{study_id}/forms/{form_id}",
    responses(
        (status = 200, description = "Form removed", body = MessageResponse),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Form not assigned to this study")
    ),
    params(
        ("study_id" = Uuid, Path, description = "Study ID"),
        ("form_id" = Uuid, Path, description = "Form ID")
    ),
    tag = "studies",
    security(("bearer_auth" = []))
)]
pub async fn remove_form(
    State(server): State<StudyDeskServer>,
    Path((study_id, form_id)): Path<(Uuid, Uuid)>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    auth.require_admin()?;

    server.studies.remove_form(study_id, form_id).await?;
    Ok(Json(api_success(MessageResponse::new(
        "Form removed from study successfully",
    ))))
}

/// Move a study to Canceled
#[utoipa::path(
    post,
    path = "/api/v1/studies/{study_id}/archive",
    responses(
        (status = 200, description = "Study canceled", body = Study),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Study not found")
    ),
    params(("study_id" = Uuid, Path, description = "Study ID")),
    tag = "studies",
    security(("bearer_auth" = []))
)]
pub async fn archive_study(
    State(server): State<StudyDeskServer>,
    Path(study_id): Path<Uuid>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Study>>, ApiError> {
    auth.require_admin()?;

    let study = server
        .studies
        .set_status(study_id, StudyStatus::Canceled)
        .await?;
    Ok(Json(api_success(study)))
}

/// Move a study back to Data Collection
#[utoipa::path(
    post,
    path = "/api/v1/studies/{study_id}/unarchive",
    responses(
        (status = 200, description = "Study reopened", body = Study),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Study not found")
    ),
    params(("study_id" = Uuid, Path, description = "Study ID")),
    tag = "studies",
    security(("bearer_auth" = []))
)]
pub async fn unarchive_study(
    State(server): State<StudyDeskServer>,
    Path(study_id): Path<Uuid>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Study>>, ApiError> {
    auth.require_admin()?;

    let study = server
        .studies
        .set_status(study_id, StudyStatus::DataCollection)
        .await?;
    Ok(Json(api_success(study)))
}
