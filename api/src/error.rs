//! API errors and their HTTP mapping

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use eventdesk_core::{GuardError, ServiceError};
use thiserror::Error;

use crate::models::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Guard(#[from] GuardError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    InvalidBody(#[from] JsonRejection),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),
}

impl ApiError {
    /// Status, machine code and client-facing message
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            Self::Guard(GuardError::DuplicateSubmission { .. }) => {
                (StatusCode::CONFLICT, "DUPLICATE_SUBMISSION", self.to_string())
            }
            Self::Guard(GuardError::FormNotFound(_)) => {
                (StatusCode::NOT_FOUND, "FORM_NOT_FOUND", self.to_string())
            }
            Self::Guard(GuardError::FormInactive(_)) => {
                (StatusCode::FORBIDDEN, "FORM_INACTIVE", self.to_string())
            }
            Self::Guard(GuardError::Validation(reason))
            | Self::Service(ServiceError::Validation(reason)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", reason.clone())
            }
            Self::Guard(GuardError::Store(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Failed to submit volunteer form".into(),
            ),
            Self::Service(ServiceError::NotFound(_)) | Self::NotFound(_) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string())
            }
            Self::Service(ServiceError::Store(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".into(),
            ),
            Self::InvalidBody(rejection) => (rejection.status(), "INVALID_BODY", rejection.body_text()),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", self.to_string()),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN", self.to_string()),
        }
    }
}

/// `Json` extractor whose rejections use the API error envelope
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, code, "request rejected");
        }
        (status, Json(ApiResponse::<()>::error(code, &message))).into_response()
    }
}
