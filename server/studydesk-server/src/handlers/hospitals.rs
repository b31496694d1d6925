use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use database_layer::{Hospital, HospitalChanges, NewHospital};
use uuid::Uuid;

use crate::error::{api_success, ApiError, ApiResponse};
use crate::handlers::MessageResponse;
use crate::middleware::AuthContext;
use crate::server::StudyDeskServer;
use crate::types::PaginationParams;
use crate::validation::RequestValidation;

/// List hospitals
#[utoipa::path(
    get,
    path = "/api/v1/hospitals",
    responses(
        (status = 200, description = "Hospitals retrieved successfully", body = Vec<Hospital>),
        (status = 401, description = "Unauthorized")
    ),
    params(PaginationParams),
    tag = "hospitals",
    security(("bearer_auth" = []))
)]
pub async fn list_hospitals(
    State(server): State<StudyDeskServer>,
    Query(pagination): Query<PaginationParams>,
    _auth: AuthContext,
) -> Result<Json<ApiResponse<Vec<Hospital>>>, ApiError> {
    let hospitals = server
        .hospitals
        .list(pagination.limit(), pagination.offset())
        .await?;
    let total_count = server.hospitals.count().await?;

    Ok(Json(pagination.wrap_response(hospitals, total_count)))
}

/// Get a hospital by ID
#[utoipa::path(
    get,
    path = "/api/v1/hospitals/{hospital_id}",
    responses(
        (status = 200, description = "Hospital retrieved successfully", body = Hospital),
        (status = 404, description = "Hospital not found")
    ),
    params(("hospital_id" = Uuid, Path, description = "Hospital ID")),
    tag = "hospitals",
    security(("bearer_auth" = []))
)]
pub async fn get_hospital(
    State(server): State<StudyDeskServer>,
    Path(hospital_id): Path<Uuid>,
    _auth: AuthContext,
) -> Result<Json<ApiResponse<Hospital>>, ApiError> {
    let hospital = server.hospitals.get(hospital_id).await?;
    Ok(Json(api_success(hospital)))
}

/// Create a hospital
#[utoipa::path(
    post,
    path = "/api/v1/hospitals",
    request_body = NewHospital,
    responses(
        (status = 201, description = "Hospital created successfully", body = Hospital),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Admin role required")
    ),
    tag = "hospitals",
    security(("bearer_auth" = []))
)]
pub async fn create_hospital(
    State(server): State<StudyDeskServer>,
    auth: AuthContext,
    Json(request): Json<NewHospital>,
) -> Result<(StatusCode, Json<ApiResponse<Hospital>>), ApiError> {
    auth.require_admin()?;
    request.validate()?;

    let hospital = server.hospitals.create(&request).await?;
    Ok((StatusCode::CREATED, Json(api_success(hospital))))
}

/// Update a hospital
#[utoipa::path(
    put,
    path = "/api/v1/hospitals/{hospital_id}",
    request_body = HospitalChanges,
    responses(
        (status = 200, description = "Hospital updated successfully", body = Hospital),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Hospital not found")
    ),
    params(("hospital_id" = Uuid, Path, description = "Hospital ID")),
    tag = "hospitals",
    security(("bearer_auth" = []))
)]
pub async fn update_hospital(
    State(server): State<StudyDeskServer>,
    Path(hospital_id): Path<Uuid>,
    auth: AuthContext,
    Json(request): Json<HospitalChanges>,
) -> Result<Json<ApiResponse<Hospital>>, ApiError> {
    auth.require_admin()?;
    request.validate()?;

    let hospital = server.hospitals.update(hospital_id, &request).await?;
    Ok(Json(api_success(hospital)))
}

/// Delete a hospital without assigned users
#[utoipa::path(
    delete,
    path = "/api/v1/hospitals/{hospital_id}",
    responses(
        (status = 200, description = "Hospital deleted", body = MessageResponse),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Hospital not found"),
        (status = 409, description = "Hospital still has assigned users")
    ),
    params(("hospital_id" = Uuid, Path, description = "Hospital ID")),
    tag = "hospitals",
    security(("bearer_auth" = []))
)]
pub async fn delete_hospital(
    State(server): State<StudyDeskServer>,
    Path(hospital_id): Path<Uuid>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    auth.require_admin()?;

    server.hospitals.delete(hospital_id).await?;
    Ok(Json(api_success(MessageResponse::new(
        "Hospital deleted successfully",
    ))))
}
