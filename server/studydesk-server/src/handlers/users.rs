//! User directory
//!
//! Accounts are provisioned here by admins; credentials live with the
//! identity provider that issues the bearer tokens.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use database_layer::{NewUser, User, UserChanges};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::error::{api_success, ApiError, ApiResponse};
use crate::handlers::MessageResponse;
use crate::middleware::AuthContext;
use crate::server::StudyDeskServer;
use crate::types::PaginationParams;
use crate::validation::RequestValidation;

/// List Users Query Parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListUsersParams {
    /// Only users of this hospital
    pub hospital_id: Option<Uuid>,
}

async fn ensure_hospital(server: &StudyDeskServer, hospital_id: Option<Uuid>) -> Result<(), ApiError> {
    if let Some(id) = hospital_id {
        if !server.hospitals.exists(id).await? {
            return Err(ApiError::not_found("Hospital not found"));
        }
    }
    Ok(())
}

/// List users
#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses(
        (status = 200, description = "Users retrieved successfully", body = Vec<User>),
        (status = 403, description = "Admin role required")
    ),
    params(ListUsersParams, PaginationParams),
    tag = "users",
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    State(server): State<StudyDeskServer>,
    Query(params): Query<ListUsersParams>,
    Query(pagination): Query<PaginationParams>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Vec<User>>>, ApiError> {
    auth.require_admin()?;

    let users = server
        .users
        .list(params.hospital_id, pagination.limit(), pagination.offset())
        .await?;
    let total_count = server.users.count(params.hospital_id).await?;

    Ok(Json(pagination.wrap_response(users, total_count)))
}

/// Current user
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Authenticated user", body = User),
        (status = 401, description = "Unauthorized")
    ),
    tag = "users",
    security(("bearer_auth" = []))
)]
pub async fn get_current_user(auth: AuthContext) -> Json<ApiResponse<User>> {
    Json(api_success(auth.user))
}

/// Get a user by ID
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}",
    responses(
        (status = 200, description = "User retrieved successfully", body = User),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found")
    ),
    params(("user_id" = Uuid, Path, description = "User ID")),
    tag = "users",
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    State(server): State<StudyDeskServer>,
    Path(user_id): Path<Uuid>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    auth.require_admin()?;
    let user = server.users.get(user_id).await?;
    Ok(Json(api_success(user)))
}

/// Create a user
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = NewUser,
    responses(
        (status = 201, description = "User created successfully", body = User),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Admin role required"),
        (status = 409, description = "Email already registered")
    ),
    tag = "users",
    security(("bearer_auth" = []))
)]
pub async fn create_user(
    State(server): State<StudyDeskServer>,
    auth: AuthContext,
    Json(request): Json<NewUser>,
) -> Result<(StatusCode, Json<ApiResponse<User>>), ApiError> {
    auth.require_admin()?;
    request.validate()?;
    ensure_hospital(&server, request.hospital_id).await?;

    let user = server.users.create(&request).await?;
    tracing::info!(
        user_id = %user.id,
        email = %server.redactor.redact_email(&user.email),
        created_by = %auth.user_id(),
        "User provisioned"
    );

    Ok((StatusCode::CREATED, Json(api_success(user))))
}

/// Update a user
#[utoipa::path(
    put,
    path = "/api/v1/users/{user_id}",
    request_body = UserChanges,
    responses(
        (status = 200, description = "User updated successfully", body = User),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found")
    ),
    params(("user_id" = Uuid, Path, description = "User ID")),
    tag = "users",
    security(("bearer_auth" = []))
)]
pub async fn update_user(
    State(server): State<StudyDeskServer>,
    Path(user_id): Path<Uuid>,
    auth: AuthContext,
    Json(request): Json<UserChanges>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    auth.require_admin()?;
    request.validate()?;
    ensure_hospital(&server, request.hospital_id).await?;

    if user_id == auth.user_id() && request.is_active == Some(false) {
        return Err(ApiError::bad_request("You cannot deactivate your own account"));
    }

    let user = server.users.update(user_id, &request).await?;
    Ok(Json(api_success(user)))
}

/// Delete a user without submissions
#[utoipa::path(
    delete,
    path = "/api/v1/users/{user_id}",
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found"),
        (status = 409, description = "User has submissions")
    ),
    params(("user_id" = Uuid, Path, description = "User ID")),
    tag = "users",
    security(("bearer_auth" = []))
)]
pub async fn delete_user(
    State(server): State<StudyDeskServer>,
    Path(user_id): Path<Uuid>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    auth.require_admin()?;

    if user_id == auth.user_id() {
        return Err(ApiError::bad_request("You cannot delete your own account"));
    }

    server.users.delete(user_id).await?;
    Ok(Json(api_success(MessageResponse::new("User deleted successfully"))))
}
