//! EventDesk HTTP API
//!
//! Public routes let volunteers read active forms and submit them once per
//! email address. Admin routes under `/api/v1/admin` manage events, forms
//! and submissions and require an `admin` bearer token.
//!
//! ```text
//! /health
//! /docs                         Swagger UI
//! /api/v1/events[/:id[/forms]]  public reads
//! /api/v1/forms/:form_id        public read, submit
//! /api/v1/admin/...             events, forms, submissions, export, dashboard
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;

use axum::{routing::get, Router};
use eventdesk_core::{AdminService, SubmissionGuard, VolunteerStore};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::ApiConfig;
use models::*;

/// API state
#[derive(Clone)]
pub struct ApiState {
    /// API version
    pub version: String,
    pub guard: SubmissionGuard,
    pub admin: AdminService,
    pub jwt_secret: String,
}

impl ApiState {
    pub fn new(store: Arc<dyn VolunteerStore>, jwt_secret: impl Into<String>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            guard: SubmissionGuard::new(store.clone()),
            admin: AdminService::new(store),
            jwt_secret: jwt_secret.into(),
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "EventDesk API",
        version = "0.1.0",
        description = "Events, volunteer sign-up forms and their submissions",
        license(name = "Apache-2.0")
    ),
    paths(
        routes::health::health_check,
        routes::events::list_events,
        routes::events::get_event,
        routes::events::create_event,
        routes::events::update_event,
        routes::events::delete_event,
        routes::forms::list_event_forms,
        routes::forms::get_public_form,
        routes::forms::admin_list_forms,
        routes::forms::create_form,
        routes::forms::get_form,
        routes::forms::update_form,
        routes::forms::replace_questions,
        routes::forms::set_active,
        routes::forms::delete_form,
        routes::submissions::submit_form,
        routes::submissions::list_submissions,
        routes::submissions::count_submissions,
        routes::submissions::export_submissions,
        routes::submissions::get_submission,
        routes::submissions::delete_submission,
        routes::dashboard::get_dashboard,
    ),
    components(
        schemas(
            ErrorResponse, routes::health::HealthResponse,
            Event, EventCreate,
            QuestionType, Question, QuestionCreate,
            VolunteerForm, FormCreate, FormUpdate, QuestionsReplace, FormActivation,
            SubmissionCreate, AnswerCreate, Submission, Answer, SubmissionCount,
            Dashboard
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "events", description = "Public event listing"),
        (name = "forms", description = "Public volunteer forms"),
        (name = "submissions", description = "Volunteer form submission"),
        (name = "admin", description = "Administration, bearer token with admin role")
    )
)]
pub struct ApiDoc;

/// Build the API router
pub fn build_router(state: ApiState, config: &ApiConfig) -> Router {
    let cors = if config.cors_permissive {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };

    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(routes::health::health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
        .with_state(Arc::new(state))
}

fn api_routes() -> Router<Arc<ApiState>> {
    Router::new()
        .merge(routes::events::router())
        .merge(routes::forms::router())
        .merge(routes::submissions::router())
        .nest("/admin", admin_routes())
}

fn admin_routes() -> Router<Arc<ApiState>> {
    Router::new()
        .merge(routes::events::admin_router())
        .merge(routes::forms::admin_router())
        .merge(routes::submissions::admin_router())
        .merge(routes::dashboard::admin_router())
}
