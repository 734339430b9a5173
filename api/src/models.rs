//! API Models

use chrono::{DateTime, Utc};
use eventdesk_core as domain;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Standard API response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ErrorResponse>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    pub fn error(code: &str, message: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorResponse {
                code: code.to_string(),
                message: message.to_string(),
            }),
        }
    }
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

// ============ Events ============

/// Event
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<domain::Event> for Event {
    fn from(e: domain::Event) -> Self {
        Self {
            id: e.id,
            title: e.title,
            description: e.description,
            location: e.location,
            starts_at: e.starts_at,
            ends_at: e.ends_at,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

/// Event creation/update request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventCreate {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl From<EventCreate> for domain::EventInput {
    fn from(e: EventCreate) -> Self {
        Self {
            title: e.title,
            description: e.description,
            location: e.location,
            starts_at: e.starts_at,
            ends_at: e.ends_at,
        }
    }
}

// ============ Forms ============

/// Question input type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    Text,
    Textarea,
    Email,
    Phone,
    MultipleChoice,
    Checkbox,
    Date,
    Time,
}

impl From<domain::QuestionType> for QuestionType {
    fn from(t: domain::QuestionType) -> Self {
        match t {
            domain::QuestionType::Text => Self::Text,
            domain::QuestionType::Textarea => Self::Textarea,
            domain::QuestionType::Email => Self::Email,
            domain::QuestionType::Phone => Self::Phone,
            domain::QuestionType::MultipleChoice => Self::MultipleChoice,
            domain::QuestionType::Checkbox => Self::Checkbox,
            domain::QuestionType::Date => Self::Date,
            domain::QuestionType::Time => Self::Time,
        }
    }
}

impl From<QuestionType> for domain::QuestionType {
    fn from(t: QuestionType) -> Self {
        match t {
            QuestionType::Text => Self::Text,
            QuestionType::Textarea => Self::Textarea,
            QuestionType::Email => Self::Email,
            QuestionType::Phone => Self::Phone,
            QuestionType::MultipleChoice => Self::MultipleChoice,
            QuestionType::Checkbox => Self::Checkbox,
            QuestionType::Date => Self::Date,
            QuestionType::Time => Self::Time,
        }
    }
}

/// Form question
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Uuid,
    pub form_id: Uuid,
    pub question: String,
    pub question_type: QuestionType,
    pub required: bool,
    pub order: i32,
    pub options: Option<Vec<String>>,
}

impl From<domain::Question> for Question {
    fn from(q: domain::Question) -> Self {
        Self {
            id: q.id,
            form_id: q.form_id,
            question: q.question,
            question_type: q.question_type.into(),
            required: q.required,
            order: q.order,
            options: q.options,
        }
    }
}

/// Question creation request; `id` keeps an existing question
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionCreate {
    pub id: Option<Uuid>,
    pub question: String,
    pub question_type: QuestionType,
    #[serde(default)]
    pub required: bool,
    pub order: Option<i32>,
    pub options: Option<Vec<String>>,
}

impl From<QuestionCreate> for domain::QuestionInput {
    fn from(q: QuestionCreate) -> Self {
        Self {
            id: q.id,
            question: q.question,
            question_type: q.question_type.into(),
            required: q.required,
            order: q.order,
            options: q.options,
        }
    }
}

/// Volunteer form
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VolunteerForm {
    pub id: Uuid,
    pub event_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub questions: Vec<Question>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<domain::VolunteerForm> for VolunteerForm {
    fn from(f: domain::VolunteerForm) -> Self {
        Self {
            id: f.id,
            event_id: f.event_id,
            title: f.title,
            description: f.description,
            is_active: f.is_active,
            questions: f.questions.into_iter().map(Into::into).collect(),
            created_at: f.created_at,
            updated_at: f.updated_at,
        }
    }
}

/// Form creation request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormCreate {
    pub title: String,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    #[serde(default)]
    pub questions: Vec<QuestionCreate>,
}

impl From<FormCreate> for domain::FormInput {
    fn from(f: FormCreate) -> Self {
        Self {
            title: f.title,
            description: f.description,
            is_active: f.is_active.unwrap_or(true),
            questions: f.questions.into_iter().map(Into::into).collect(),
        }
    }
}

/// Form header update
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormUpdate {
    pub title: String,
    pub description: Option<String>,
}

impl From<FormUpdate> for domain::FormUpdate {
    fn from(f: FormUpdate) -> Self {
        Self { title: f.title, description: f.description }
    }
}

/// Replacement question set
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QuestionsReplace {
    pub questions: Vec<QuestionCreate>,
}

/// Soft enable/disable
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormActivation {
    pub is_active: bool,
}

// ============ Submissions ============

/// Submission request body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionCreate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub answers: Vec<AnswerCreate>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerCreate {
    pub question_id: Uuid,
    pub answer: String,
}

impl From<SubmissionCreate> for domain::SubmitRequest {
    fn from(s: SubmissionCreate) -> Self {
        Self {
            first_name: s.first_name,
            last_name: s.last_name,
            email: s.email,
            phone: s.phone,
            answers: s
                .answers
                .into_iter()
                .map(|a| domain::AnswerInput { question_id: a.question_id, answer: a.answer })
                .collect(),
        }
    }
}

/// Stored submission
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: Uuid,
    pub form_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub answers: Vec<Answer>,
}

/// Number of submissions on a form
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionCount {
    pub form_id: Uuid,
    pub count: u64,
}

/// Answer with the question it answers
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub id: Uuid,
    pub question_id: Uuid,
    pub answer: String,
    pub question: Question,
}

impl From<domain::Submission> for Submission {
    fn from(s: domain::Submission) -> Self {
        Self {
            id: s.id,
            form_id: s.form_id,
            first_name: s.first_name,
            last_name: s.last_name,
            email: s.email,
            phone: s.phone,
            submitted_at: s.submitted_at,
            answers: s
                .answers
                .into_iter()
                .map(|a| Answer {
                    id: a.id,
                    question_id: a.question_id,
                    answer: a.answer,
                    question: a.question.into(),
                })
                .collect(),
        }
    }
}

// ============ Dashboard ============

/// Admin dashboard
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub events: u64,
    pub forms: u64,
    pub active_forms: u64,
    pub submissions: u64,
    pub recent_submissions: Vec<Submission>,
}

impl From<domain::Dashboard> for Dashboard {
    fn from(d: domain::Dashboard) -> Self {
        Self {
            events: d.stats.events,
            forms: d.stats.forms,
            active_forms: d.stats.active_forms,
            submissions: d.stats.submissions,
            recent_submissions: d.recent_submissions.into_iter().map(Into::into).collect(),
        }
    }
}
