//! EventDesk core
//!
//! Events, volunteer forms and the submission guard that keeps at most one
//! submission per (form, email).
//!
//! ## Modules
//! - `domain`: events, forms, questions, submissions, value objects
//! - `repository`: the `VolunteerStore` seam and an in-memory store
//! - `postgres`: sqlx-backed store with migrations
//! - `guard`: duplicate-safe submission flow
//! - `admin`: event/form/submission management
//! - `export`: CSV rendering of submissions

pub mod admin;
pub mod domain;
pub mod export;
pub mod guard;
pub mod postgres;
pub mod repository;

pub use admin::{AdminService, Dashboard, EventInput, FormInput, FormUpdate, QuestionInput, ServiceError};
pub use domain::*;
pub use guard::{AnswerInput, GuardError, SubmissionGuard, SubmitRequest};
pub use postgres::PgStore;
pub use repository::{InMemoryStore, StoreError, StoreResult, VolunteerStore, SUBMISSION_KEY_CONSTRAINT};
