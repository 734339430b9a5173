//! Admin dashboard

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;

use crate::error::ApiError;
use crate::middleware::auth::AdminClaims;
use crate::{models::*, ApiState};

pub fn admin_router() -> Router<Arc<ApiState>> {
    Router::new().route("/dashboard", get(get_dashboard))
}

/// Totals and the latest submissions
#[utoipa::path(
    get,
    path = "/api/v1/admin/dashboard",
    responses(
        (status = 200, description = "Dashboard", body = Dashboard),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn get_dashboard(
    _admin: AdminClaims,
    State(state): State<Arc<ApiState>>,
) -> Result<Json<ApiResponse<Dashboard>>, ApiError> {
    let dashboard = state.admin.dashboard().await?;
    Ok(Json(ApiResponse::success(dashboard.into())))
}
