//! Admin data export
//!
//! Both formats select rows with [`ExportFilters`] and answer 404 when
//! nothing matches. Rows whose stored answers are not valid JSON are left
//! out of the file and logged.

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use database_layer::{ExportFilters, ExportRow};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::middleware::AuthContext;
use crate::server::StudyDeskServer;

pub const CSV_HEADER: [&str; 9] = [
    "Submission ID",
    "Form ID",
    "Study ID",
    "User ID",
    "User Email",
    "Hospital ID",
    "Created At",
    "Updated At",
    "Data (JSON)",
];

/// `export_YYYYMMDD_HHMMSS.<extension>`
pub fn attachment_filename(now: DateTime<Utc>, extension: &str) -> String {
    format!("export_{}.{}", now.format("%Y%m%d_%H%M%S"), extension)
}

/// Stored answers of an export row, `None` when the text is not JSON
fn parsed_answers(row: &ExportRow) -> Option<Value> {
    match serde_json::from_str::<Value>(&row.data_json) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(submission_id = %row.submission_id, error = %e, "Skipping unreadable submission in export");
            None
        }
    }
}

/// Render rows as CSV, one line per readable submission
pub fn render_csv(rows: &[ExportRow]) -> Result<Vec<u8>, ApiError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER).map_err(csv_error)?;

    for row in rows {
        let Some(answers) = parsed_answers(row) else {
            continue;
        };
        writer
            .write_record([
                row.submission_id.to_string(),
                row.form_id.to_string(),
                row.study_id.to_string(),
                row.user_id.to_string(),
                row.user_email.clone(),
                row.hospital_id.map(|id| id.to_string()).unwrap_or_default(),
                row.created_at.to_rfc3339(),
                row.updated_at.to_rfc3339(),
                answers.to_string(),
            ])
            .map_err(csv_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| ApiError::internal(format!("Failed to finish CSV export: {}", e)))
}

fn csv_error(err: csv::Error) -> ApiError {
    ApiError::internal(format!("Failed to write CSV export: {}", err))
}

/// Build the JSON export document
pub fn render_json(rows: &[ExportRow], filters: &ExportFilters, export_date: DateTime<Utc>) -> Value {
    let submissions: Vec<Value> = rows
        .iter()
        .filter_map(|row| {
            parsed_answers(row).map(|data| {
                json!({
                    "id": row.submission_id,
                    "form_id": row.form_id,
                    "study_id": row.study_id,
                    "user": {
                        "id": row.user_id,
                        "email": row.user_email,
                        "full_name": row.user_full_name,
                        "hospital_id": row.hospital_id,
                    },
                    "data": data,
                    "created_at": row.created_at.to_rfc3339(),
                    "updated_at": row.updated_at.to_rfc3339(),
                })
            })
        })
        .collect();

    json!({
        "export_date": export_date.to_rfc3339(),
        "filters": {
            "study_id": filters.study_id,
            "form_id": filters.form_id,
            "hospital_id": filters.hospital_id,
            "start_date": filters.start_date.map(|d| d.to_rfc3339()),
            "end_date": filters.end_date.map(|d| d.to_rfc3339()),
        },
        "submissions": submissions,
    })
}

async fn export_rows(
    server: &StudyDeskServer,
    auth: &AuthContext,
    filters: &ExportFilters,
) -> Result<Vec<ExportRow>, ApiError> {
    auth.require_admin()?;

    let rows = server.exports.rows(filters).await?;
    if rows.is_empty() {
        return Err(ApiError::not_found("No data found for export"));
    }
    Ok(rows)
}

fn attachment(content_type: &'static str, filename: &str, body: Vec<u8>) -> Result<Response, ApiError> {
    let disposition = HeaderValue::from_str(&format!("attachment; filename={}", filename))
        .map_err(|e| ApiError::internal(format!("Invalid export filename: {}", e)))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// Export submissions as CSV
#[utoipa::path(
    post,
    path = "/api/v1/export/csv",
    request_body = ExportFilters,
    responses(
        (status = 200, description = "CSV attachment", content_type = "text/csv"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "No data found for export")
    ),
    tag = "export",
    security(("bearer_auth" = []))
)]
pub async fn export_csv(
    State(server): State<StudyDeskServer>,
    auth: AuthContext,
    Json(filters): Json<ExportFilters>,
) -> Result<Response, ApiError> {
    let rows = export_rows(&server, &auth, &filters).await?;
    let body = render_csv(&rows)?;

    info!(admin_id = %auth.user_id(), rows = rows.len(), format = "csv", "Data exported");
    attachment("text/csv", &attachment_filename(Utc::now(), "csv"), body)
}

/// Export submissions as JSON
#[utoipa::path(
    post,
    path = "/api/v1/export/json",
    request_body = ExportFilters,
    responses(
        (status = 200, description = "JSON attachment", content_type = "application/json"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "No data found for export")
    ),
    tag = "export",
    security(("bearer_auth" = []))
)]
pub async fn export_json(
    State(server): State<StudyDeskServer>,
    auth: AuthContext,
    Json(filters): Json<ExportFilters>,
) -> Result<Response, ApiError> {
    let rows = export_rows(&server, &auth, &filters).await?;
    let now = Utc::now();
    let body = serde_json::to_vec_pretty(&render_json(&rows, &filters, now))?;

    info!(admin_id = %auth.user_id(), rows = rows.len(), format = "json", "Data exported");
    attachment("application/json", &attachment_filename(now, "json"), body)
}
