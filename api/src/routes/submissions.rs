//! Volunteer submission endpoints

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiError, ApiJson};
use crate::middleware::auth::AdminClaims;
use crate::{models::*, ApiState};

/// Public submission routes
pub fn router() -> Router<Arc<ApiState>> {
    Router::new().route("/forms/:form_id/submissions", post(submit_form))
}

/// Admin submission routes
pub fn admin_router() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/forms/:form_id/submissions", get(list_submissions))
        .route("/forms/:form_id/submissions/count", get(count_submissions))
        .route("/forms/:form_id/submissions/export", get(export_submissions))
        .route("/submissions/:id", get(get_submission).delete(delete_submission))
}

/// Submit a volunteer form
///
/// One submission per form and email address. A second attempt answers
/// 409 naming the event.
#[utoipa::path(
    post,
    path = "/api/v1/forms/{form_id}/submissions",
    params(("form_id" = Uuid, Path, description = "Form ID")),
    request_body = SubmissionCreate,
    responses(
        (status = 201, description = "Submission stored", body = Submission),
        (status = 403, description = "Form is not accepting submissions", body = ErrorResponse),
        (status = 404, description = "Form not found", body = ErrorResponse),
        (status = 409, description = "Already submitted for this event", body = ErrorResponse),
        (status = 422, description = "Invalid submission", body = ErrorResponse)
    ),
    tag = "submissions"
)]
pub async fn submit_form(
    State(state): State<Arc<ApiState>>,
    Path(form_id): Path<Uuid>,
    ApiJson(input): ApiJson<SubmissionCreate>,
) -> Result<(StatusCode, Json<ApiResponse<Submission>>), ApiError> {
    let submission = state.guard.submit(form_id, input.into()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(submission.into()))))
}

/// Submissions of a form, newest first
#[utoipa::path(
    get,
    path = "/api/v1/admin/forms/{form_id}/submissions",
    params(("form_id" = Uuid, Path, description = "Form ID")),
    responses(
        (status = 200, description = "Submissions with answers", body = Vec<Submission>),
        (status = 404, description = "Form not found", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn list_submissions(
    _admin: AdminClaims,
    State(state): State<Arc<ApiState>>,
    Path(form_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Submission>>>, ApiError> {
    let list = state.admin.list_submissions(form_id).await?;
    Ok(Json(ApiResponse::success(list.into_iter().map(Into::into).collect())))
}

/// Number of submissions on a form
#[utoipa::path(
    get,
    path = "/api/v1/admin/forms/{form_id}/submissions/count",
    params(("form_id" = Uuid, Path, description = "Form ID")),
    responses(
        (status = 200, description = "Submission count", body = SubmissionCount),
        (status = 404, description = "Form not found", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn count_submissions(
    _admin: AdminClaims,
    State(state): State<Arc<ApiState>>,
    Path(form_id): Path<Uuid>,
) -> Result<Json<ApiResponse<SubmissionCount>>, ApiError> {
    let count = state.admin.count_submissions(form_id).await?;
    Ok(Json(ApiResponse::success(SubmissionCount { form_id, count })))
}

/// Download submissions as CSV
#[utoipa::path(
    get,
    path = "/api/v1/admin/forms/{form_id}/submissions/export",
    params(("form_id" = Uuid, Path, description = "Form ID")),
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv", body = String),
        (status = 404, description = "Form not found", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn export_submissions(
    _admin: AdminClaims,
    State(state): State<Arc<ApiState>>,
    Path(form_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let (form, csv) = state.admin.export_submissions(form_id).await?;
    let disposition = format!("attachment; filename=\"{}-submissions.csv\"", file_stem(&form.title));
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}

/// Get a submission
#[utoipa::path(
    get,
    path = "/api/v1/admin/submissions/{id}",
    params(("id" = Uuid, Path, description = "Submission ID")),
    responses(
        (status = 200, description = "Submission with answers", body = Submission),
        (status = 404, description = "Submission not found", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn get_submission(
    _admin: AdminClaims,
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Submission>>, ApiError> {
    let submission = state.admin.get_submission(id).await?;
    Ok(Json(ApiResponse::success(submission.into())))
}

/// Delete a submission, freeing its email for the form
#[utoipa::path(
    delete,
    path = "/api/v1/admin/submissions/{id}",
    params(("id" = Uuid, Path, description = "Submission ID")),
    responses(
        (status = 204, description = "Submission deleted"),
        (status = 404, description = "Submission not found", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn delete_submission(
    _admin: AdminClaims,
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.admin.delete_submission(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Lowercase ASCII slug for download names
fn file_stem(title: &str) -> String {
    let slug = title
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "form".into()
    } else {
        slug
    }
}
