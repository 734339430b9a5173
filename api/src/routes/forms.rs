//! Volunteer form endpoints

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiError, ApiJson};
use crate::middleware::auth::AdminClaims;
use crate::{models::*, ApiState};

/// Public form routes
pub fn router() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/events/:id/forms", get(list_event_forms))
        .route("/forms/:form_id", get(get_public_form))
}

/// Admin form routes
pub fn admin_router() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/events/:id/forms", get(admin_list_forms).post(create_form))
        .route("/forms/:form_id", get(get_form).put(update_form).delete(delete_form))
        .route("/forms/:form_id/questions", put(replace_questions))
        .route("/forms/:form_id/active", post(set_active))
}

fn forms(list: Vec<eventdesk_core::VolunteerForm>) -> Vec<VolunteerForm> {
    list.into_iter().map(Into::into).collect()
}

/// Active forms of an event
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}/forms",
    params(("id" = Uuid, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Active volunteer forms", body = Vec<VolunteerForm>),
        (status = 404, description = "Event not found", body = ErrorResponse)
    ),
    tag = "forms"
)]
pub async fn list_event_forms(
    State(state): State<Arc<ApiState>>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<VolunteerForm>>>, ApiError> {
    let list = state.admin.list_forms(event_id, true).await?;
    Ok(Json(ApiResponse::success(forms(list))))
}

/// Get an active form with its ordered questions
#[utoipa::path(
    get,
    path = "/api/v1/forms/{form_id}",
    params(("form_id" = Uuid, Path, description = "Form ID")),
    responses(
        (status = 200, description = "Volunteer form", body = VolunteerForm),
        (status = 404, description = "Form not found or inactive", body = ErrorResponse)
    ),
    tag = "forms"
)]
pub async fn get_public_form(
    State(state): State<Arc<ApiState>>,
    Path(form_id): Path<Uuid>,
) -> Result<Json<ApiResponse<VolunteerForm>>, ApiError> {
    let form = state.admin.get_form(form_id).await?;
    if !form.is_active {
        return Err(ApiError::NotFound(format!("form {form_id}")));
    }
    Ok(Json(ApiResponse::success(form.into())))
}

/// All forms of an event, including inactive ones
#[utoipa::path(
    get,
    path = "/api/v1/admin/events/{id}/forms",
    params(("id" = Uuid, Path, description = "Event ID")),
    responses((status = 200, description = "Volunteer forms", body = Vec<VolunteerForm>)),
    tag = "admin"
)]
pub async fn admin_list_forms(
    _admin: AdminClaims,
    State(state): State<Arc<ApiState>>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<VolunteerForm>>>, ApiError> {
    let list = state.admin.list_forms(event_id, false).await?;
    Ok(Json(ApiResponse::success(forms(list))))
}

/// Create a form on an event
#[utoipa::path(
    post,
    path = "/api/v1/admin/events/{id}/forms",
    params(("id" = Uuid, Path, description = "Event ID")),
    request_body = FormCreate,
    responses(
        (status = 201, description = "Form created", body = VolunteerForm),
        (status = 422, description = "Invalid questions", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn create_form(
    _admin: AdminClaims,
    State(state): State<Arc<ApiState>>,
    Path(event_id): Path<Uuid>,
    ApiJson(input): ApiJson<FormCreate>,
) -> Result<(StatusCode, Json<ApiResponse<VolunteerForm>>), ApiError> {
    let form = state.admin.create_form(event_id, input.into()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(form.into()))))
}

/// Get any form
#[utoipa::path(
    get,
    path = "/api/v1/admin/forms/{form_id}",
    params(("form_id" = Uuid, Path, description = "Form ID")),
    responses((status = 200, description = "Volunteer form", body = VolunteerForm)),
    tag = "admin"
)]
pub async fn get_form(
    _admin: AdminClaims,
    State(state): State<Arc<ApiState>>,
    Path(form_id): Path<Uuid>,
) -> Result<Json<ApiResponse<VolunteerForm>>, ApiError> {
    let form = state.admin.get_form(form_id).await?;
    Ok(Json(ApiResponse::success(form.into())))
}

/// Update title and description
#[utoipa::path(
    put,
    path = "/api/v1/admin/forms/{form_id}",
    params(("form_id" = Uuid, Path, description = "Form ID")),
    request_body = FormUpdate,
    responses((status = 200, description = "Form updated", body = VolunteerForm)),
    tag = "admin"
)]
pub async fn update_form(
    _admin: AdminClaims,
    State(state): State<Arc<ApiState>>,
    Path(form_id): Path<Uuid>,
    ApiJson(input): ApiJson<FormUpdate>,
) -> Result<Json<ApiResponse<VolunteerForm>>, ApiError> {
    let form = state.admin.update_form(form_id, input.into()).await?;
    Ok(Json(ApiResponse::success(form.into())))
}

/// Replace the question set
#[utoipa::path(
    put,
    path = "/api/v1/admin/forms/{form_id}/questions",
    params(("form_id" = Uuid, Path, description = "Form ID")),
    request_body = QuestionsReplace,
    responses((status = 200, description = "Questions replaced", body = VolunteerForm)),
    tag = "admin"
)]
pub async fn replace_questions(
    _admin: AdminClaims,
    State(state): State<Arc<ApiState>>,
    Path(form_id): Path<Uuid>,
    ApiJson(input): ApiJson<QuestionsReplace>,
) -> Result<Json<ApiResponse<VolunteerForm>>, ApiError> {
    let questions = input.questions.into_iter().map(Into::into).collect();
    let form = state.admin.replace_questions(form_id, questions).await?;
    Ok(Json(ApiResponse::success(form.into())))
}

/// Enable or disable a form
#[utoipa::path(
    post,
    path = "/api/v1/admin/forms/{form_id}/active",
    params(("form_id" = Uuid, Path, description = "Form ID")),
    request_body = FormActivation,
    responses((status = 200, description = "Form toggled", body = VolunteerForm)),
    tag = "admin"
)]
pub async fn set_active(
    _admin: AdminClaims,
    State(state): State<Arc<ApiState>>,
    Path(form_id): Path<Uuid>,
    ApiJson(input): ApiJson<FormActivation>,
) -> Result<Json<ApiResponse<VolunteerForm>>, ApiError> {
    let form = state.admin.set_active(form_id, input.is_active).await?;
    Ok(Json(ApiResponse::success(form.into())))
}

/// Delete a form with its questions and submissions
#[utoipa::path(
    delete,
    path = "/api/v1/admin/forms/{form_id}",
    params(("form_id" = Uuid, Path, description = "Form ID")),
    responses((status = 204, description = "Form deleted")),
    tag = "admin"
)]
pub async fn delete_form(
    _admin: AdminClaims,
    State(state): State<Arc<ApiState>>,
    Path(form_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.admin.delete_form(form_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
