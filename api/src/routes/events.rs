//! Event endpoints

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiError, ApiJson};
use crate::middleware::auth::AdminClaims;
use crate::{models::*, ApiState};

/// Public event routes
pub fn router() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/events", get(list_events))
        .route("/events/:id", get(get_event))
}

/// Admin event routes
pub fn admin_router() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/events", post(create_event))
        .route("/events/:id", put(update_event).delete(delete_event))
}

/// List events
#[utoipa::path(
    get,
    path = "/api/v1/events",
    responses(
        (status = 200, description = "Events ordered by start time", body = Vec<Event>)
    ),
    tag = "events"
)]
pub async fn list_events(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<ApiResponse<Vec<Event>>>, ApiError> {
    let events = state.admin.list_events().await?;
    Ok(Json(ApiResponse::success(events.into_iter().map(Into::into).collect())))
}

/// Get event by ID
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}",
    params(("id" = Uuid, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Event details", body = Event),
        (status = 404, description = "Event not found", body = ErrorResponse)
    ),
    tag = "events"
)]
pub async fn get_event(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Event>>, ApiError> {
    let event = state.admin.get_event(id).await?;
    Ok(Json(ApiResponse::success(event.into())))
}

/// Create an event
#[utoipa::path(
    post,
    path = "/api/v1/admin/events",
    request_body = EventCreate,
    responses(
        (status = 201, description = "Event created", body = Event),
        (status = 422, description = "Invalid input", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn create_event(
    _admin: AdminClaims,
    State(state): State<Arc<ApiState>>,
    ApiJson(input): ApiJson<EventCreate>,
) -> Result<(StatusCode, Json<ApiResponse<Event>>), ApiError> {
    let event = state.admin.create_event(input.into()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(event.into()))))
}

/// Update an event
#[utoipa::path(
    put,
    path = "/api/v1/admin/events/{id}",
    params(("id" = Uuid, Path, description = "Event ID")),
    request_body = EventCreate,
    responses(
        (status = 200, description = "Event updated", body = Event),
        (status = 404, description = "Event not found", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn update_event(
    _admin: AdminClaims,
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    ApiJson(input): ApiJson<EventCreate>,
) -> Result<Json<ApiResponse<Event>>, ApiError> {
    let event = state.admin.update_event(id, input.into()).await?;
    Ok(Json(ApiResponse::success(event.into())))
}

/// Delete an event with its forms and submissions
#[utoipa::path(
    delete,
    path = "/api/v1/admin/events/{id}",
    params(("id" = Uuid, Path, description = "Event ID")),
    responses(
        (status = 204, description = "Event deleted"),
        (status = 404, description = "Event not found", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn delete_event(
    _admin: AdminClaims,
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.admin.delete_event(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
