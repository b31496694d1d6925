use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

use crate::server::StudyDeskServer;

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    /// Seconds since the server state was built
    pub uptime: u64,
    pub checks: HashMap<String, String>,
}

/// Version information response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VersionResponse {
    pub name: String,
    pub version: String,
    pub api_version: String,
}

/// Health check handler
///
/// Answers 503 while the database is unreachable so load balancers take the
/// instance out of rotation.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(
    State(server): State<StudyDeskServer>,
) -> (StatusCode, Json<HealthResponse>) {
    let database_ok = server.db.is_healthy().await;

    let mut checks = HashMap::new();
    checks.insert(
        "database".to_string(),
        if database_ok { "healthy" } else { "unhealthy" }.to_string(),
    );

    let (status, label) = if database_ok {
        (StatusCode::OK, "healthy")
    } else {
        tracing::warn!("Health check failed: database unreachable");
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    let response = HealthResponse {
        status: label.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime: server.uptime_secs(),
        checks,
    };

    (status, Json(response))
}

/// Version information handler
#[utoipa::path(
    get,
    path = "/version",
    responses((status = 200, description = "Version information", body = VersionResponse)),
    tag = "health"
)]
pub async fn version_info(State(server): State<StudyDeskServer>) -> Json<VersionResponse> {
    Json(VersionResponse {
        name: server.config.server.name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        api_version: "v1".to_string(),
    })
}
