use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use database_layer::{NewSubmission, Submission, SubmissionChanges};
use form_integrity::Payload;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{api_success, ApiError, ApiResponse};
use crate::handlers::MessageResponse;
use crate::middleware::AuthContext;
use crate::server::StudyDeskServer;
use crate::types::PaginationParams;
use crate::utils::PaginatedQuery;
use crate::validation::RequestValidation;

const SUBMISSION_SELECT: &str = "SELECT id, form_id, study_id, user_id, data_json, created_at, updated_at FROM submissions WHERE 1=1";
const SUBMISSION_COUNT: &str = "SELECT COUNT(*) FROM submissions WHERE 1=1";

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Submission with its answers parsed; unreadable stored text reads as `{}`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmissionResponse {
    pub id: Uuid,
    pub form_id: Uuid,
    pub study_id: Uuid,
    pub user_id: Uuid,
    #[schema(value_type = Object)]
    pub data_json: Payload,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Submission> for SubmissionResponse {
    fn from(submission: Submission) -> Self {
        Self {
            data_json: submission.payload(),
            id: submission.id,
            form_id: submission.form_id,
            study_id: submission.study_id,
            user_id: submission.user_id,
            created_at: submission.created_at,
            updated_at: submission.updated_at,
        }
    }
}

/// List Submissions Query Parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListSubmissionsParams {
    pub study_id: Option<Uuid>,
    pub form_id: Option<Uuid>,
}

/// Filters shared by the page query and its count; `owner` limits the rows
/// to one author
fn apply_filters(query: &mut PaginatedQuery<'_>, params: &ListSubmissionsParams, owner: Option<Uuid>) {
    query
        .filter_eq("study_id", params.study_id)
        .filter_eq("form_id", params.form_id)
        .filter_eq("user_id", owner);
}

// ============================================================================
// API HANDLERS
// ============================================================================

/// List submissions
///
/// Regular users only see their own submissions.
#[utoipa::path(
    get,
    path = "/api/v1/submissions",
    responses(
        (status = 200, description = "Submissions retrieved successfully", body = Vec<SubmissionResponse>),
        (status = 401, description = "Unauthorized")
    ),
    params(ListSubmissionsParams, PaginationParams),
    tag = "submissions",
    security(("bearer_auth" = []))
)]
pub async fn list_submissions(
    State(server): State<StudyDeskServer>,
    Query(params): Query<ListSubmissionsParams>,
    Query(pagination): Query<PaginationParams>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Vec<SubmissionResponse>>>, ApiError> {
    let owner = (!auth.is_admin()).then(|| auth.user_id());

    let mut query = PaginatedQuery::new(SUBMISSION_SELECT);
    apply_filters(&mut query, &params, owner);
    query
        .order_by("created_at", "DESC")
        .then_by("id", "ASC")
        .paginate(&pagination);
    let submissions: Vec<Submission> = query
        .build_query_as()
        .fetch_all(server.db.pool())
        .await?;

    let mut count = PaginatedQuery::new(SUBMISSION_COUNT);
    apply_filters(&mut count, &params, owner);
    let total_count: i64 = count.build_query_scalar().fetch_one(server.db.pool()).await?;

    let data = submissions.into_iter().map(SubmissionResponse::from).collect();
    Ok(Json(pagination.wrap_response(data, total_count)))
}

/// Create a submission
///
/// The study must be in Data Collection, the form must be assigned to it and
/// the answers must not reuse a unique key value already stored for the form.
#[utoipa::path(
    post,
    path = "/api/v1/submissions",
    request_body = NewSubmission,
    responses(
        (status = 201, description = "Submission stored", body = SubmissionResponse),
        (status = 400, description = "Rejected by the study lifecycle, the form assignment or the unique key"),
        (status = 404, description = "Form or study not found")
    ),
    tag = "submissions",
    security(("bearer_auth" = []))
)]
pub async fn create_submission(
    State(server): State<StudyDeskServer>,
    auth: AuthContext,
    Json(request): Json<NewSubmission>,
) -> Result<(StatusCode, Json<ApiResponse<SubmissionResponse>>), ApiError> {
    request.validate()?;

    let submission = server.submissions.create(&request, auth.user_id()).await?;
    Ok((
        StatusCode::CREATED,
        Json(api_success(SubmissionResponse::from(submission))),
    ))
}

/// Get a submission by ID
#[utoipa::path(
    get,
    path = "/api/v1/submissions/{submission_id}",
    responses(
        (status = 200, description = "Submission retrieved successfully", body = SubmissionResponse),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Submission not found")
    ),
    params(("submission_id" = Uuid, Path, description = "Submission ID")),
    tag = "submissions",
    security(("bearer_auth" = []))
)]
pub async fn get_submission(
    State(server): State<StudyDeskServer>,
    Path(submission_id): Path<Uuid>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<SubmissionResponse>>, ApiError> {
    let submission = server.submissions.get(submission_id).await?;
    auth.require_owner_or_admin(submission.user_id)?;

    Ok(Json(api_success(SubmissionResponse::from(submission))))
}

/// Replace the answers of a submission
#[utoipa::path(
    put,
    path = "/api/v1/submissions/{submission_id}",
    request_body = SubmissionChanges,
    responses(
        (status = 200, description = "Submission updated", body = SubmissionResponse),
        (status = 400, description = "Unique key missing or already used"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Submission not found")
    ),
    params(("submission_id" = Uuid, Path, description = "Submission ID")),
    tag = "submissions",
    security(("bearer_auth" = []))
)]
pub async fn update_submission(
    State(server): State<StudyDeskServer>,
    Path(submission_id): Path<Uuid>,
    auth: AuthContext,
    Json(request): Json<SubmissionChanges>,
) -> Result<Json<ApiResponse<SubmissionResponse>>, ApiError> {
    request.validate()?;

    let existing = server.submissions.get(submission_id).await?;
    auth.require_owner_or_admin(existing.user_id)?;

    let submission = server.submissions.update(existing.id, &request).await?;
    Ok(Json(api_success(SubmissionResponse::from(submission))))
}

/// Delete a submission and release its unique keys
#[utoipa::path(
    delete,
    path = "/api/v1/submissions/{submission_id}",
    responses(
        (status = 200, description = "Submission deleted", body = MessageResponse),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Submission not found")
    ),
    params(("submission_id" = Uuid, Path, description = "Submission ID")),
    tag = "submissions",
    security(("bearer_auth" = []))
)]
pub async fn delete_submission(
    State(server): State<StudyDeskServer>,
    Path(submission_id): Path<Uuid>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let existing = server.submissions.get(submission_id).await?;
    auth.require_owner_or_admin(existing.user_id)?;

    server.submissions.delete(existing.id).await?;
    Ok(Json(api_success(MessageResponse::new(
        "Submission deleted successfully",
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(data_json: &str) -> Submission {
        Submission {
            id: Uuid::new_v4(),
            form_id: Uuid::new_v4(),
            study_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            data_json: data_json.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_response_parses_stored_answers() {
        let response = SubmissionResponse::from(submission(r#"{"mrn": "0042", "age": 61}"#));
        assert_eq!(response.data_json.get("mrn"), Some(&serde_json::json!("0042")));
        assert_eq!(response.data_json.get("age"), Some(&serde_json::json!(61)));
    }

    #[test]
    fn test_unreadable_answers_become_empty() {
        let response = SubmissionResponse::from(submission("gAAAAABlegacy-ciphertext"));
        assert!(response.data_json.is_empty());
    }

    #[test]
    fn test_owner_filter_only_for_regular_users() {
        let params = ListSubmissionsParams {
            study_id: Some(Uuid::new_v4()),
            form_id: None,
        };

        let mut admin = PaginatedQuery::new(SUBMISSION_COUNT);
        apply_filters(&mut admin, &params, None);
        assert_eq!(admin.sql(), format!("{SUBMISSION_COUNT} AND study_id = $1"));

        let mut member = PaginatedQuery::new(SUBMISSION_COUNT);
        apply_filters(&mut member, &params, Some(Uuid::new_v4()));
        assert_eq!(
            member.sql(),
            format!("{SUBMISSION_COUNT} AND study_id = $1 AND user_id = $2")
        );
    }
}
