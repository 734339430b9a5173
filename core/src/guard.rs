//! Submission guard
//!
//! Accepts volunteer-form submissions while keeping at most one submission
//! per (form, email). The datastore's unique key is authoritative; the
//! pre-check only saves a round trip through a failed insert. Both paths end
//! in [`SubmissionGuard::duplicate_submission`], so callers always see the
//! same [`GuardError::DuplicateSubmission`].

use chrono::Utc;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::*;
use crate::repository::{StoreError, VolunteerStore, SUBMISSION_KEY_CONSTRAINT};

/// Guard errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    #[error("form not found: {0}")]
    FormNotFound(Uuid),

    #[error("form is not accepting submissions: {0}")]
    FormInactive(Uuid),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("You already submitted for {event_title}.")]
    DuplicateSubmission { event_title: String },

    #[error(transparent)]
    Store(StoreError),
}

impl From<DomainError> for GuardError {
    fn from(err: DomainError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Candidate submission as received from a respondent
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub answers: Vec<AnswerInput>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerInput {
    pub question_id: Uuid,
    pub answer: String,
}

/// One-submission-per-email guard over an injected store
#[derive(Clone)]
pub struct SubmissionGuard {
    store: Arc<dyn VolunteerStore>,
}

impl SubmissionGuard {
    pub fn new(store: Arc<dyn VolunteerStore>) -> Self {
        Self { store }
    }

    /// Validate and persist a submission with its answers
    #[tracing::instrument(name = "submit volunteer form", skip(self, request))]
    pub async fn submit(
        &self,
        form_id: Uuid,
        request: SubmitRequest,
    ) -> Result<Submission, GuardError> {
        let form = match self.store.get_form(form_id).await {
            Ok(form) => form,
            Err(StoreError::NotFound(_)) => return Err(GuardError::FormNotFound(form_id)),
            Err(e) => return Err(GuardError::Store(e)),
        };
        if !form.is_active {
            return Err(GuardError::FormInactive(form_id));
        }

        let new = prepare(&form, request)?;

        if let Some(existing) = self
            .store
            .find_submission(form_id, &new.email)
            .await
            .map_err(GuardError::Store)?
        {
            tracing::warn!(submission_id = %existing.id, "duplicate submission caught by pre-check");
            return Err(self.duplicate_submission(existing.form_id).await);
        }

        match self.store.insert_submission(&new).await {
            Ok(submission) => {
                tracing::info!(submission_id = %submission.id, answers = submission.answers.len(), "volunteer submission stored");
                Ok(submission)
            }
            Err(StoreError::UniqueViolation { constraint })
                if constraint == SUBMISSION_KEY_CONSTRAINT =>
            {
                tracing::warn!("duplicate submission caught by unique constraint");
                Err(self.duplicate_submission(form_id).await)
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to store volunteer submission");
                Err(GuardError::Store(e))
            }
        }
    }

    /// Build the duplicate error by resolving form → event
    async fn duplicate_submission(&self, form_id: Uuid) -> GuardError {
        let lookup = async {
            let form = self.store.get_form(form_id).await?;
            self.store.get_event(form.event_id).await
        };
        match lookup.await {
            Ok(event) => GuardError::DuplicateSubmission { event_title: event.title },
            Err(StoreError::NotFound(_)) => GuardError::FormNotFound(form_id),
            Err(e) => GuardError::Store(e),
        }
    }
}

/// Check a request against its form and shape it for insert
fn prepare(form: &VolunteerForm, request: SubmitRequest) -> Result<NewSubmission, GuardError> {
    let first_name = required_text("firstName", &request.first_name)?;
    let last_name = required_text("lastName", &request.last_name)?;
    let email = EmailAddress::parse(&request.email)?;

    let mut seen = HashSet::new();
    let mut answers = Vec::with_capacity(request.answers.len());
    for input in request.answers {
        if form.question(input.question_id).is_none() {
            return Err(GuardError::Validation(format!(
                "question {} does not belong to this form",
                input.question_id
            )));
        }
        if !seen.insert(input.question_id) {
            return Err(GuardError::Validation(format!(
                "question {} answered more than once",
                input.question_id
            )));
        }
        answers.push(NewAnswer {
            id: Uuid::new_v4(),
            question_id: input.question_id,
            answer: input.answer,
        });
    }

    for question in form.questions.iter().filter(|q| q.required) {
        let answered = answers
            .iter()
            .any(|a| a.question_id == question.id && !a.answer.trim().is_empty());
        if !answered {
            return Err(GuardError::Validation(format!(
                "required question not answered: {}",
                question.question
            )));
        }
    }

    Ok(NewSubmission {
        id: Uuid::new_v4(),
        form_id: form.id,
        first_name,
        last_name,
        email,
        phone: optional_text(request.phone),
        submitted_at: Utc::now(),
        answers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{InMemoryStore, StoreResult};
    use async_trait::async_trait;
    use proptest::prelude::*;

    struct Fixture {
        guard: SubmissionGuard,
        store: Arc<InMemoryStore>,
        form: VolunteerForm,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let form = seed(store.as_ref()).await;
        Fixture {
            guard: SubmissionGuard::new(store.clone()),
            store,
            form,
        }
    }

    async fn seed(store: &dyn VolunteerStore) -> VolunteerForm {
        let event = Event::create("Spring Cleanup", Utc::now());
        store.insert_event(&event).await.unwrap();

        let mut form = VolunteerForm::create(event.id, "Cleanup volunteers");
        form.questions = vec![
            Question {
                id: Uuid::new_v4(),
                form_id: form.id,
                question: "Preferred shift".into(),
                question_type: QuestionType::MultipleChoice,
                required: true,
                order: 0,
                options: Some(vec!["Morning".into(), "Afternoon".into()]),
            },
            Question {
                id: Uuid::new_v4(),
                form_id: form.id,
                question: "Anything else?".into(),
                question_type: QuestionType::Textarea,
                required: false,
                order: 1,
                options: None,
            },
        ];
        store.insert_form(&form).await.unwrap();
        form
    }

    fn request(form: &VolunteerForm, email: &str) -> SubmitRequest {
        SubmitRequest {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: email.into(),
            phone: Some("  ".into()),
            answers: vec![AnswerInput {
                question_id: form.questions[0].id,
                answer: "Morning".into(),
            }],
        }
    }

    /// Store whose pre-check never sees a concurrent insert, optionally
    /// failing every insert with a fixed error
    struct RacingStore {
        inner: InMemoryStore,
        insert_failure: Option<StoreError>,
    }

    impl RacingStore {
        fn new() -> Self {
            Self { inner: InMemoryStore::new(), insert_failure: None }
        }

        fn failing(err: StoreError) -> Self {
            Self { inner: InMemoryStore::new(), insert_failure: Some(err) }
        }
    }

    #[async_trait]
    impl VolunteerStore for RacingStore {
        async fn insert_event(&self, event: &Event) -> StoreResult<()> { self.inner.insert_event(event).await }
        async fn get_event(&self, id: Uuid) -> StoreResult<Event> { self.inner.get_event(id).await }
        async fn list_events(&self) -> StoreResult<Vec<Event>> { self.inner.list_events().await }
        async fn update_event(&self, event: &Event) -> StoreResult<()> { self.inner.update_event(event).await }
        async fn delete_event(&self, id: Uuid) -> StoreResult<()> { self.inner.delete_event(id).await }
        async fn insert_form(&self, form: &VolunteerForm) -> StoreResult<()> { self.inner.insert_form(form).await }
        async fn get_form(&self, id: Uuid) -> StoreResult<VolunteerForm> { self.inner.get_form(id).await }
        async fn list_forms(&self, event_id: Uuid) -> StoreResult<Vec<VolunteerForm>> { self.inner.list_forms(event_id).await }
        async fn update_form(&self, form: &VolunteerForm) -> StoreResult<()> { self.inner.update_form(form).await }
        async fn replace_questions(&self, form_id: Uuid, questions: &[Question]) -> StoreResult<()> { self.inner.replace_questions(form_id, questions).await }
        async fn delete_form(&self, id: Uuid) -> StoreResult<()> { self.inner.delete_form(id).await }
        async fn find_submission(&self, _form_id: Uuid, _email: &EmailAddress) -> StoreResult<Option<Submission>> { Ok(None) }
        async fn insert_submission(&self, new: &NewSubmission) -> StoreResult<Submission> {
            match &self.insert_failure {
                Some(err) => Err(err.clone()),
                None => self.inner.insert_submission(new).await,
            }
        }
        async fn get_submission(&self, id: Uuid) -> StoreResult<Submission> { self.inner.get_submission(id).await }
        async fn list_submissions(&self, form_id: Uuid) -> StoreResult<Vec<Submission>> { self.inner.list_submissions(form_id).await }
        async fn count_submissions(&self, form_id: Uuid) -> StoreResult<u64> { self.inner.count_submissions(form_id).await }
        async fn recent_submissions(&self, limit: usize) -> StoreResult<Vec<Submission>> { self.inner.recent_submissions(limit).await }
        async fn delete_submission(&self, id: Uuid) -> StoreResult<()> { self.inner.delete_submission(id).await }
        async fn stats(&self) -> StoreResult<StoreStats> { self.inner.stats().await }
    }

    #[tokio::test]
    async fn test_submit_returns_answers_with_questions() {
        let fx = fixture().await;
        let submission = fx.guard.submit(fx.form.id, request(&fx.form, "ada@example.com")).await.unwrap();

        assert_eq!(submission.email, "ada@example.com");
        assert_eq!(submission.phone, None);
        assert_eq!(submission.answers.len(), 1);
        assert_eq!(submission.answers[0].question.question, "Preferred shift");
    }

    #[tokio::test]
    async fn test_second_submission_names_the_event() {
        let fx = fixture().await;
        fx.guard.submit(fx.form.id, request(&fx.form, "ada@example.com")).await.unwrap();

        let err = fx
            .guard
            .submit(fx.form.id, request(&fx.form, "ada@example.com"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            GuardError::DuplicateSubmission { event_title: "Spring Cleanup".into() }
        );
        assert_eq!(err.to_string(), "You already submitted for Spring Cleanup.");
    }

    #[tokio::test]
    async fn test_email_case_collides() {
        let fx = fixture().await;
        fx.guard.submit(fx.form.id, request(&fx.form, "ada@example.com")).await.unwrap();

        let err = fx
            .guard
            .submit(fx.form.id, request(&fx.form, " ADA@Example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, GuardError::DuplicateSubmission { .. }));
    }

    #[tokio::test]
    async fn test_same_email_on_another_form_is_fine() {
        let fx = fixture().await;
        let other = seed(fx.store.as_ref()).await;

        fx.guard.submit(fx.form.id, request(&fx.form, "ada@example.com")).await.unwrap();
        fx.guard.submit(other.id, request(&other, "ada@example.com")).await.unwrap();
    }

    #[tokio::test]
    async fn test_constraint_violation_maps_to_duplicate() {
        let store = Arc::new(RacingStore::new());
        let form = seed(store.as_ref()).await;
        let guard = SubmissionGuard::new(store.clone());

        guard.submit(form.id, request(&form, "ada@example.com")).await.unwrap();
        let err = guard.submit(form.id, request(&form, "ada@example.com")).await.unwrap_err();

        assert_eq!(
            err,
            GuardError::DuplicateSubmission { event_title: "Spring Cleanup".into() }
        );
        assert_eq!(store.list_submissions(form.id).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_submissions_yield_one_success() {
        let store = Arc::new(RacingStore::new());
        let form = seed(store.as_ref()).await;
        let guard = SubmissionGuard::new(store.clone());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let guard = guard.clone();
                let req = request(&form, "b@x.com");
                let form_id = form.id;
                tokio::spawn(async move { guard.submit(form_id, req).await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(GuardError::DuplicateSubmission { event_title }) => {
                    assert_eq!(event_title, "Spring Cleanup")
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(store.list_submissions(form.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_other_insert_failures_pass_through() {
        let failures = [
            StoreError::Backend("connection reset".into()),
            StoreError::UniqueViolation { constraint: "volunteer_answers_pkey".into() },
        ];
        for failure in failures {
            let store = Arc::new(RacingStore::failing(failure.clone()));
            let form = seed(store.as_ref()).await;
            let guard = SubmissionGuard::new(store.clone());

            let err = guard.submit(form.id, request(&form, "ada@example.com")).await.unwrap_err();
            assert_eq!(err, GuardError::Store(failure));
            assert_eq!(store.count_submissions(form.id).await.unwrap(), 0);
        }
    }

    #[tokio::test]
    async fn test_unknown_form() {
        let fx = fixture().await;
        let missing = Uuid::new_v4();
        let err = fx.guard.submit(missing, request(&fx.form, "ada@example.com")).await.unwrap_err();
        assert_eq!(err, GuardError::FormNotFound(missing));
    }

    #[tokio::test]
    async fn test_inactive_form() {
        let fx = fixture().await;
        let mut form = fx.form.clone();
        form.is_active = false;
        fx.store.update_form(&form).await.unwrap();

        let err = fx.guard.submit(form.id, request(&form, "ada@example.com")).await.unwrap_err();
        assert_eq!(err, GuardError::FormInactive(form.id));
    }

    #[tokio::test]
    async fn test_foreign_question_rejected() {
        let fx = fixture().await;
        let other = seed(fx.store.as_ref()).await;
        let mut req = request(&fx.form, "ada@example.com");
        req.answers.push(AnswerInput {
            question_id: other.questions[1].id,
            answer: "stale".into(),
        });

        let err = fx.guard.submit(fx.form.id, req).await.unwrap_err();
        assert!(matches!(err, GuardError::Validation(_)));
        assert!(fx.store.list_submissions(fx.form.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_required_question_enforced() {
        let fx = fixture().await;
        let mut req = request(&fx.form, "ada@example.com");
        req.answers[0].answer = "   ".into();

        let err = fx.guard.submit(fx.form.id, req).await.unwrap_err();
        assert_eq!(
            err,
            GuardError::Validation("required question not answered: Preferred shift".into())
        );
    }

    #[tokio::test]
    async fn test_repeated_question_rejected() {
        let fx = fixture().await;
        let mut req = request(&fx.form, "ada@example.com");
        req.answers.push(req.answers[0].clone());

        assert!(matches!(
            fx.guard.submit(fx.form.id, req).await,
            Err(GuardError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_email_and_blank_name() {
        let fx = fixture().await;
        assert!(matches!(
            fx.guard.submit(fx.form.id, request(&fx.form, "not-an-email")).await,
            Err(GuardError::Validation(_))
        ));

        let mut req = request(&fx.form, "ada@example.com");
        req.first_name = " ".into();
        assert!(matches!(
            fx.guard.submit(fx.form.id, req).await,
            Err(GuardError::Validation(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_at_most_one_submission_per_email(
            attempts in prop::collection::vec(0usize..4, 1..24)
        ) {
            let emails = ["a@x.com", "A@x.com", "b@x.com", "c@x.com"];
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let fx = fixture().await;
                let mut accepted = HashSet::new();

                for idx in &attempts {
                    let email = emails[*idx];
                    let key = email.to_lowercase();
                    match fx.guard.submit(fx.form.id, request(&fx.form, email)).await {
                        Ok(_) => prop_assert!(accepted.insert(key)),
                        Err(GuardError::DuplicateSubmission { event_title }) => {
                            prop_assert!(accepted.contains(&key));
                            prop_assert!(!event_title.is_empty());
                        }
                        Err(other) => prop_assert!(false, "unexpected error: {}", other),
                    }
                }

                let stored = fx.store.list_submissions(fx.form.id).await.unwrap();
                prop_assert_eq!(stored.len(), accepted.len());
                Ok(())
            })?;
        }
    }
}
