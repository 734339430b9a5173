//! Aggregates - events, volunteer forms and their submissions
//!
//! Ownership follows the storage cascade: an [`Event`] owns its forms, a
//! [`VolunteerForm`] owns its questions and submissions, a [`Submission`]
//! owns its answers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::{EmailAddress, QuestionType};

/// Public event
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
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

impl Event {
    pub fn create(title: impl Into<String>, starts_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: None,
            location: None,
            starts_at,
            ends_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Volunteer sign-up form attached to an event
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolunteerForm {
    pub id: Uuid,
    pub event_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub is_active: bool,
    /// Always sorted by [`Question::order`]
    pub questions: Vec<Question>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VolunteerForm {
    pub fn create(event_id: Uuid, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            event_id,
            title: title.into(),
            description: None,
            is_active: true,
            questions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn question(&self, id: Uuid) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn sort_questions(&mut self) {
        self.questions.sort_by_key(|q| q.order);
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// A question on a volunteer form
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Uuid,
    pub form_id: Uuid,
    pub question: String,
    pub question_type: QuestionType,
    pub required: bool,
    /// Unique within the form; drives display and export order
    pub order: i32,
    pub options: Option<Vec<String>>,
}

/// One respondent's submission, unique per (form, email)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: Uuid,
    pub form_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub submitted_at: DateTime<Utc>,
    /// Sorted by the order of the answered question
    pub answers: Vec<SubmittedAnswer>,
}

impl Submission {
    pub fn answer_to(&self, question_id: Uuid) -> Option<&str> {
        self.answers
            .iter()
            .find(|a| a.question_id == question_id)
            .map(|a| a.answer.as_str())
    }
}

/// Stored answer together with the question it answers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub question_id: Uuid,
    pub answer: String,
    pub question: Question,
}

/// Validated submission ready for insert
#[derive(Clone, Debug)]
pub struct NewSubmission {
    pub id: Uuid,
    pub form_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: EmailAddress,
    pub phone: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub answers: Vec<NewAnswer>,
}

impl NewSubmission {
    /// Stored view of this submission, answers sorted by question order.
    /// `None` if an answer refers to a question not in `questions`.
    pub fn to_submission(&self, questions: &[Question]) -> Option<Submission> {
        let mut answers = self
            .answers
            .iter()
            .map(|a| {
                let question = questions.iter().find(|q| q.id == a.question_id)?;
                Some(SubmittedAnswer {
                    id: a.id,
                    submission_id: self.id,
                    question_id: a.question_id,
                    answer: a.answer.clone(),
                    question: question.clone(),
                })
            })
            .collect::<Option<Vec<_>>>()?;
        answers.sort_by_key(|a| a.question.order);

        Some(Submission {
            id: self.id,
            form_id: self.form_id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.as_str().to_string(),
            phone: self.phone.clone(),
            submitted_at: self.submitted_at,
            answers,
        })
    }
}

#[derive(Clone, Debug)]
pub struct NewAnswer {
    pub id: Uuid,
    pub question_id: Uuid,
    pub answer: String,
}

/// Aggregate counts for the admin dashboard
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub events: u64,
    pub forms: u64,
    pub active_forms: u64,
    pub submissions: u64,
}
