//! Admin services - event, form and submission management

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::*;
use crate::export::submissions_csv;
use crate::repository::{StoreError, VolunteerStore};

/// Number of submissions shown on the dashboard
pub const RECENT_SUBMISSIONS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => Self::NotFound(what),
            other => Self::Store(other),
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        Self::Validation(err.to_string())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Event create/update payload
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInput {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
}

/// Question payload; `id` keeps an existing question (and its answers)
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub question: String,
    pub question_type: QuestionType,
    #[serde(default)]
    pub required: bool,
    /// Defaults to the position in the submitted list
    #[serde(default)]
    pub order: Option<i32>,
    #[serde(default)]
    pub options: Option<Vec<String>>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormInput {
    pub title: String,
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub questions: Vec<QuestionInput>,
}

fn default_active() -> bool {
    true
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormUpdate {
    pub title: String,
    pub description: Option<String>,
}

/// Dashboard summary
#[derive(Clone, Debug, PartialEq)]
pub struct Dashboard {
    pub stats: StoreStats,
    pub recent_submissions: Vec<Submission>,
}

/// Admin operations over the shared store
#[derive(Clone)]
pub struct AdminService {
    store: Arc<dyn VolunteerStore>,
}

impl AdminService {
    pub fn new(store: Arc<dyn VolunteerStore>) -> Self {
        Self { store }
    }

    // ============ Events ============

    pub async fn create_event(&self, input: EventInput) -> ServiceResult<Event> {
        let mut event = Event::create(required_text("title", &input.title)?, input.starts_at);
        apply_event(&mut event, input)?;
        self.store.insert_event(&event).await?;
        tracing::info!(event_id = %event.id, title = %event.title, "event created");
        Ok(event)
    }

    pub async fn get_event(&self, id: Uuid) -> ServiceResult<Event> {
        Ok(self.store.get_event(id).await?)
    }

    pub async fn list_events(&self) -> ServiceResult<Vec<Event>> {
        Ok(self.store.list_events().await?)
    }

    pub async fn update_event(&self, id: Uuid, input: EventInput) -> ServiceResult<Event> {
        let mut event = self.store.get_event(id).await?;
        apply_event(&mut event, input)?;
        event.touch();
        self.store.update_event(&event).await?;
        Ok(event)
    }

    pub async fn delete_event(&self, id: Uuid) -> ServiceResult<()> {
        self.store.delete_event(id).await?;
        tracing::info!(event_id = %id, "event deleted");
        Ok(())
    }

    // ============ Forms ============

    pub async fn create_form(&self, event_id: Uuid, input: FormInput) -> ServiceResult<VolunteerForm> {
        self.store.get_event(event_id).await?;

        let mut form = VolunteerForm::create(event_id, required_text("title", &input.title)?);
        form.description = optional_text(input.description);
        form.is_active = input.is_active;
        form.questions = build_questions(form.id, &[], input.questions)?;
        form.sort_questions();

        self.store.insert_form(&form).await?;
        tracing::info!(form_id = %form.id, event_id = %event_id, questions = form.questions.len(), "volunteer form created");
        Ok(form)
    }

    pub async fn get_form(&self, id: Uuid) -> ServiceResult<VolunteerForm> {
        Ok(self.store.get_form(id).await?)
    }

    /// Forms of an event; `active_only` hides soft-disabled forms
    pub async fn list_forms(&self, event_id: Uuid, active_only: bool) -> ServiceResult<Vec<VolunteerForm>> {
        self.store.get_event(event_id).await?;
        let mut forms = self.store.list_forms(event_id).await?;
        if active_only {
            forms.retain(|f| f.is_active);
        }
        Ok(forms)
    }

    pub async fn update_form(&self, id: Uuid, update: FormUpdate) -> ServiceResult<VolunteerForm> {
        let mut form = self.store.get_form(id).await?;
        form.title = required_text("title", &update.title)?;
        form.description = optional_text(update.description);
        form.touch();
        self.store.update_form(&form).await?;
        Ok(form)
    }

    pub async fn set_active(&self, id: Uuid, is_active: bool) -> ServiceResult<VolunteerForm> {
        let mut form = self.store.get_form(id).await?;
        form.is_active = is_active;
        form.touch();
        self.store.update_form(&form).await?;
        tracing::info!(form_id = %id, is_active, "volunteer form toggled");
        Ok(form)
    }

    pub async fn replace_questions(&self, id: Uuid, questions: Vec<QuestionInput>) -> ServiceResult<VolunteerForm> {
        let form = self.store.get_form(id).await?;
        let questions = build_questions(form.id, &form.questions, questions)?;
        self.store.replace_questions(id, &questions).await?;
        Ok(self.store.get_form(id).await?)
    }

    pub async fn delete_form(&self, id: Uuid) -> ServiceResult<()> {
        self.store.delete_form(id).await?;
        tracing::info!(form_id = %id, "volunteer form deleted");
        Ok(())
    }

    // ============ Submissions ============

    pub async fn list_submissions(&self, form_id: Uuid) -> ServiceResult<Vec<Submission>> {
        self.store.get_form(form_id).await?;
        Ok(self.store.list_submissions(form_id).await?)
    }

    pub async fn count_submissions(&self, form_id: Uuid) -> ServiceResult<u64> {
        self.store.get_form(form_id).await?;
        Ok(self.store.count_submissions(form_id).await?)
    }

    pub async fn get_submission(&self, id: Uuid) -> ServiceResult<Submission> {
        Ok(self.store.get_submission(id).await?)
    }

    pub async fn delete_submission(&self, id: Uuid) -> ServiceResult<()> {
        self.store.delete_submission(id).await?;
        Ok(())
    }

    /// CSV export, oldest submission first
    pub async fn export_submissions(&self, form_id: Uuid) -> ServiceResult<(VolunteerForm, String)> {
        let form = self.store.get_form(form_id).await?;
        let mut submissions = self.store.list_submissions(form_id).await?;
        submissions.reverse();
        let csv = submissions_csv(&form, &submissions);
        Ok((form, csv))
    }

    pub async fn dashboard(&self) -> ServiceResult<Dashboard> {
        Ok(Dashboard {
            stats: self.store.stats().await?,
            recent_submissions: self.store.recent_submissions(RECENT_SUBMISSIONS).await?,
        })
    }
}

fn apply_event(event: &mut Event, input: EventInput) -> ServiceResult<()> {
    if let Some(ends_at) = input.ends_at {
        if ends_at < input.starts_at {
            return Err(ServiceError::Validation("event cannot end before it starts".into()));
        }
    }
    event.title = required_text("title", &input.title)?;
    event.description = optional_text(input.description);
    event.location = optional_text(input.location);
    event.starts_at = input.starts_at;
    event.ends_at = input.ends_at;
    Ok(())
}

/// Validate a question set for `form_id`; only ids already in `existing` may be kept
fn build_questions(
    form_id: Uuid,
    existing: &[Question],
    inputs: Vec<QuestionInput>,
) -> ServiceResult<Vec<Question>> {
    let mut orders = HashSet::new();
    let mut ids = HashSet::new();
    let mut questions = Vec::with_capacity(inputs.len());

    for (position, input) in inputs.into_iter().enumerate() {
        let text = required_text("question", &input.question)?;
        let order = input.order.unwrap_or(position as i32);
        if !orders.insert(order) {
            return Err(ServiceError::Validation(format!("duplicate question order {order}")));
        }

        let options: Option<Vec<String>> = input.options.map(|opts| {
            opts.into_iter()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect()
        });
        let options = options.filter(|o| !o.is_empty());
        if input.question_type.has_options() && options.is_none() {
            return Err(ServiceError::Validation(format!(
                "{} question needs at least one option: {text}",
                input.question_type
            )));
        }

        let id = match input.id {
            Some(id) if existing.iter().any(|q| q.id == id) => id,
            Some(id) => {
                return Err(ServiceError::Validation(format!(
                    "question {id} does not belong to this form"
                )))
            }
            None => Uuid::new_v4(),
        };
        if !ids.insert(id) {
            return Err(ServiceError::Validation(format!("duplicate question id {id}")));
        }

        questions.push(Question {
            id,
            form_id,
            question: text,
            question_type: input.question_type,
            required: input.required,
            order,
            options: if input.question_type.has_options() { options } else { None },
        });
    }
    Ok(questions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::{AnswerInput, SubmissionGuard, SubmitRequest};
    use crate::repository::InMemoryStore;
    use chrono::Duration;

    fn service() -> (AdminService, SubmissionGuard) {
        let store: Arc<dyn VolunteerStore> = Arc::new(InMemoryStore::new());
        (AdminService::new(store.clone()), SubmissionGuard::new(store))
    }

    fn event_input(title: &str) -> EventInput {
        EventInput {
            title: title.into(),
            description: Some("  ".into()),
            location: Some("Town hall".into()),
            starts_at: Utc::now() + Duration::days(7),
            ends_at: None,
        }
    }

    fn question(text: &str, ty: QuestionType) -> QuestionInput {
        QuestionInput {
            id: None,
            question: text.into(),
            question_type: ty,
            required: false,
            order: None,
            options: ty.has_options().then(|| vec!["Yes".into(), "No".into()]),
        }
    }

    fn form_input() -> FormInput {
        FormInput {
            title: "Greeters".into(),
            description: None,
            is_active: true,
            questions: vec![
                question("T-shirt size", QuestionType::Text),
                question("Can you lift 20kg?", QuestionType::MultipleChoice),
            ],
        }
    }

    #[tokio::test]
    async fn test_event_lifecycle() {
        let (admin, _) = service();
        let event = admin.create_event(event_input("Gala")).await.unwrap();
        assert_eq!(event.description, None);
        assert_eq!(event.location.as_deref(), Some("Town hall"));

        let mut update = event_input("Winter Gala");
        update.ends_at = Some(update.starts_at + Duration::hours(3));
        let updated = admin.update_event(event.id, update).await.unwrap();
        assert_eq!(updated.title, "Winter Gala");
        assert_eq!(admin.list_events().await.unwrap().len(), 1);

        admin.delete_event(event.id).await.unwrap();
        assert!(matches!(admin.get_event(event.id).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_event_validation() {
        let (admin, _) = service();
        assert!(matches!(
            admin.create_event(event_input("  ")).await,
            Err(ServiceError::Validation(_))
        ));

        let mut backwards = event_input("Gala");
        backwards.ends_at = Some(backwards.starts_at - Duration::hours(1));
        assert!(matches!(
            admin.create_event(backwards).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_create_form_assigns_orders() {
        let (admin, _) = service();
        let event = admin.create_event(event_input("Gala")).await.unwrap();
        let form = admin.create_form(event.id, form_input()).await.unwrap();

        let orders: Vec<_> = form.questions.iter().map(|q| q.order).collect();
        assert_eq!(orders, vec![0, 1]);
        assert_eq!(form.questions[0].options, None);
        assert_eq!(form.questions[1].options.as_ref().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_form_validation() {
        let (admin, _) = service();
        let event = admin.create_event(event_input("Gala")).await.unwrap();

        let mut input = form_input();
        input.questions[1].options = Some(vec![" ".into()]);
        assert!(matches!(
            admin.create_form(event.id, input).await,
            Err(ServiceError::Validation(_))
        ));

        let mut input = form_input();
        input.questions[0].order = Some(3);
        input.questions[1].order = Some(3);
        assert!(matches!(
            admin.create_form(event.id, input).await,
            Err(ServiceError::Validation(_))
        ));

        assert!(matches!(
            admin.create_form(Uuid::new_v4(), form_input()).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_inactive_forms_hidden_from_public_listing() {
        let (admin, _) = service();
        let event = admin.create_event(event_input("Gala")).await.unwrap();
        let form = admin.create_form(event.id, form_input()).await.unwrap();
        admin.create_form(event.id, form_input()).await.unwrap();

        admin.set_active(form.id, false).await.unwrap();
        assert_eq!(admin.list_forms(event.id, true).await.unwrap().len(), 1);
        assert_eq!(admin.list_forms(event.id, false).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_replace_questions_keeps_ids() {
        let (admin, _) = service();
        let event = admin.create_event(event_input("Gala")).await.unwrap();
        let form = admin.create_form(event.id, form_input()).await.unwrap();
        let kept = form.questions[0].clone();

        let mut reworded = question("Shirt size", QuestionType::Text);
        reworded.id = Some(kept.id);
        reworded.order = Some(5);
        let updated = admin
            .replace_questions(form.id, vec![question("Allergies", QuestionType::Textarea), reworded])
            .await
            .unwrap();

        assert_eq!(updated.questions.len(), 2);
        assert_eq!(updated.questions[1].id, kept.id);
        assert_eq!(updated.questions[1].question, "Shirt size");
    }

    #[tokio::test]
    async fn test_question_ids_stay_with_their_form() {
        let (admin, _) = service();
        let event = admin.create_event(event_input("Gala")).await.unwrap();
        let first = admin.create_form(event.id, form_input()).await.unwrap();
        let borrowed = first.questions[0].id;

        let mut input = form_input();
        input.questions[0].id = Some(borrowed);
        assert!(matches!(
            admin.create_form(event.id, input).await,
            Err(ServiceError::Validation(_))
        ));

        let second = admin.create_form(event.id, form_input()).await.unwrap();
        let mut foreign = question("Shirt size", QuestionType::Text);
        foreign.id = Some(borrowed);
        assert!(matches!(
            admin.replace_questions(second.id, vec![foreign]).await,
            Err(ServiceError::Validation(_))
        ));

        let second = admin.get_form(second.id).await.unwrap();
        assert!(second.questions.iter().all(|q| q.id != borrowed));
        assert_eq!(admin.get_form(first.id).await.unwrap().questions[0].form_id, first.id);
        assert_eq!(admin.list_forms(event.id, false).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_submissions_export_and_dashboard() {
        let (admin, guard) = service();
        let event = admin.create_event(event_input("Gala")).await.unwrap();
        let form = admin.create_form(event.id, form_input()).await.unwrap();

        for email in ["one@example.com", "two@example.com"] {
            guard
                .submit(
                    form.id,
                    SubmitRequest {
                        first_name: "Sam".into(),
                        last_name: "Lee".into(),
                        email: email.into(),
                        phone: None,
                        answers: vec![AnswerInput {
                            question_id: form.questions[0].id,
                            answer: "L".into(),
                        }],
                    },
                )
                .await
                .unwrap();
        }

        assert_eq!(admin.list_submissions(form.id).await.unwrap().len(), 2);
        assert_eq!(admin.count_submissions(form.id).await.unwrap(), 2);

        let (_, csv) = admin.export_submissions(form.id).await.unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("T-shirt size,Can you lift 20kg?"));
        assert!(lines[1..].iter().all(|l| l.ends_with(",L,")));

        let dashboard = admin.dashboard().await.unwrap();
        assert_eq!(dashboard.stats.submissions, 2);
        assert_eq!(dashboard.stats.active_forms, 1);
        assert_eq!(dashboard.recent_submissions.len(), 2);

        admin.delete_form(form.id).await.unwrap();
        assert_eq!(admin.dashboard().await.unwrap().stats.submissions, 0);
    }
}
