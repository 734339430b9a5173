//! Repositories - persistence abstraction for events, forms and submissions
//!
//! The datastore is injected as `Arc<dyn VolunteerStore>`. Implementations
//! must enforce:
//! - a unique key on (form id, email) for submissions, reported as
//!   [`StoreError::UniqueViolation`] with [`SUBMISSION_KEY_CONSTRAINT`]
//! - atomic insert of a submission with its answers
//! - cascading deletes event → forms → questions/submissions → answers

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::domain::*;

/// Name of the unique constraint on (volunteer_form_id, email)
pub const SUBMISSION_KEY_CONSTRAINT: &str = "volunteer_submissions_form_email_key";

/// Repository result type
pub type StoreResult<T> = Result<T, StoreError>;

/// Repository errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("storage error: {0}")]
    Backend(String),
}

/// Datastore for the whole event/form/submission graph
#[async_trait]
pub trait VolunteerStore: Send + Sync {
    async fn insert_event(&self, event: &Event) -> StoreResult<()>;
    async fn get_event(&self, id: Uuid) -> StoreResult<Event>;
    /// Ordered by start time
    async fn list_events(&self) -> StoreResult<Vec<Event>>;
    async fn update_event(&self, event: &Event) -> StoreResult<()>;
    async fn delete_event(&self, id: Uuid) -> StoreResult<()>;

    /// Insert a form together with its questions
    async fn insert_form(&self, form: &VolunteerForm) -> StoreResult<()>;
    async fn get_form(&self, id: Uuid) -> StoreResult<VolunteerForm>;
    async fn list_forms(&self, event_id: Uuid) -> StoreResult<Vec<VolunteerForm>>;
    /// Update the form header (title, description, active flag)
    async fn update_form(&self, form: &VolunteerForm) -> StoreResult<()>;
    /// Replace the question set; dropped questions take their answers along
    async fn replace_questions(&self, form_id: Uuid, questions: &[Question]) -> StoreResult<()>;
    async fn delete_form(&self, id: Uuid) -> StoreResult<()>;

    async fn find_submission(
        &self,
        form_id: Uuid,
        email: &EmailAddress,
    ) -> StoreResult<Option<Submission>>;
    /// Atomically insert a submission and its answers
    async fn insert_submission(&self, submission: &NewSubmission) -> StoreResult<Submission>;
    async fn get_submission(&self, id: Uuid) -> StoreResult<Submission>;
    /// Newest first
    async fn list_submissions(&self, form_id: Uuid) -> StoreResult<Vec<Submission>>;
    async fn count_submissions(&self, form_id: Uuid) -> StoreResult<u64>;
    async fn recent_submissions(&self, limit: usize) -> StoreResult<Vec<Submission>>;
    async fn delete_submission(&self, id: Uuid) -> StoreResult<()>;

    async fn stats(&self) -> StoreResult<StoreStats>;
}

#[derive(Clone, Debug)]
struct SubmissionRow {
    id: Uuid,
    form_id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    phone: Option<String>,
    submitted_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Clone, Debug)]
struct AnswerRow {
    id: Uuid,
    submission_id: Uuid,
    question_id: Uuid,
    answer: String,
}

#[derive(Default)]
struct Tables {
    events: HashMap<Uuid, Event>,
    forms: HashMap<Uuid, VolunteerForm>,
    submissions: HashMap<Uuid, SubmissionRow>,
    answers: HashMap<Uuid, AnswerRow>,
    /// Unique index on (form id, email)
    submission_keys: HashSet<(Uuid, String)>,
}

impl Tables {
    fn question(&self, form_id: Uuid, question_id: Uuid) -> Option<&Question> {
        self.forms.get(&form_id).and_then(|f| f.question(question_id))
    }

    fn hydrate(&self, row: &SubmissionRow) -> Submission {
        let mut answers: Vec<SubmittedAnswer> = self
            .answers
            .values()
            .filter(|a| a.submission_id == row.id)
            .filter_map(|a| {
                self.question(row.form_id, a.question_id).map(|q| SubmittedAnswer {
                    id: a.id,
                    submission_id: a.submission_id,
                    question_id: a.question_id,
                    answer: a.answer.clone(),
                    question: q.clone(),
                })
            })
            .collect();
        answers.sort_by_key(|a| a.question.order);

        Submission {
            id: row.id,
            form_id: row.form_id,
            first_name: row.first_name.clone(),
            last_name: row.last_name.clone(),
            email: row.email.clone(),
            phone: row.phone.clone(),
            submitted_at: row.submitted_at,
            answers,
        }
    }

    fn remove_submission(&mut self, id: Uuid) -> Option<SubmissionRow> {
        let row = self.submissions.remove(&id)?;
        self.submission_keys.remove(&(row.form_id, row.email.clone()));
        self.answers.retain(|_, a| a.submission_id != id);
        Some(row)
    }

    fn remove_form(&mut self, id: Uuid) -> Option<VolunteerForm> {
        let form = self.forms.remove(&id)?;
        let doomed: Vec<Uuid> = self
            .submissions
            .values()
            .filter(|s| s.form_id == id)
            .map(|s| s.id)
            .collect();
        for submission_id in doomed {
            self.remove_submission(submission_id);
        }
        Some(form)
    }

    fn sorted_newest_first(&self, rows: impl Iterator<Item = SubmissionRow>) -> Vec<Submission> {
        let mut rows: Vec<_> = rows.collect();
        rows.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        rows.iter().map(|r| self.hydrate(r)).collect()
    }
}

/// In-memory store (for testing and development)
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn check_question_orders(questions: &[Question]) -> StoreResult<()> {
    let mut seen = HashSet::new();
    for q in questions {
        if !seen.insert(q.order) {
            return Err(StoreError::UniqueViolation {
                constraint: "volunteer_form_questions_form_position_key".into(),
            });
        }
    }
    Ok(())
}

#[async_trait]
impl VolunteerStore for InMemoryStore {
    async fn insert_event(&self, event: &Event) -> StoreResult<()> {
        let mut tables = self.tables.write();
        if tables.events.contains_key(&event.id) {
            return Err(StoreError::UniqueViolation { constraint: "events_pkey".into() });
        }
        tables.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn get_event(&self, id: Uuid) -> StoreResult<Event> {
        self.tables
            .read()
            .events
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("event {id}")))
    }

    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        let mut events: Vec<_> = self.tables.read().events.values().cloned().collect();
        events.sort_by_key(|e| e.starts_at);
        Ok(events)
    }

    async fn update_event(&self, event: &Event) -> StoreResult<()> {
        let mut tables = self.tables.write();
        let slot = tables
            .events
            .get_mut(&event.id)
            .ok_or_else(|| StoreError::NotFound(format!("event {}", event.id)))?;
        *slot = event.clone();
        Ok(())
    }

    async fn delete_event(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write();
        tables
            .events
            .remove(&id)
            .ok_or_else(|| StoreError::NotFound(format!("event {id}")))?;
        let forms: Vec<Uuid> = tables
            .forms
            .values()
            .filter(|f| f.event_id == id)
            .map(|f| f.id)
            .collect();
        for form_id in forms {
            tables.remove_form(form_id);
        }
        Ok(())
    }

    async fn insert_form(&self, form: &VolunteerForm) -> StoreResult<()> {
        check_question_orders(&form.questions)?;
        let mut tables = self.tables.write();
        if !tables.events.contains_key(&form.event_id) {
            return Err(StoreError::Backend(format!(
                "foreign key violation: event {} does not exist",
                form.event_id
            )));
        }
        if tables.forms.contains_key(&form.id) {
            return Err(StoreError::UniqueViolation { constraint: "volunteer_forms_pkey".into() });
        }
        let mut form = form.clone();
        form.sort_questions();
        tables.forms.insert(form.id, form);
        Ok(())
    }

    async fn get_form(&self, id: Uuid) -> StoreResult<VolunteerForm> {
        self.tables
            .read()
            .forms
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("form {id}")))
    }

    async fn list_forms(&self, event_id: Uuid) -> StoreResult<Vec<VolunteerForm>> {
        let mut forms: Vec<_> = self
            .tables
            .read()
            .forms
            .values()
            .filter(|f| f.event_id == event_id)
            .cloned()
            .collect();
        forms.sort_by_key(|f| f.created_at);
        Ok(forms)
    }

    async fn update_form(&self, form: &VolunteerForm) -> StoreResult<()> {
        let mut tables = self.tables.write();
        let slot = tables
            .forms
            .get_mut(&form.id)
            .ok_or_else(|| StoreError::NotFound(format!("form {}", form.id)))?;
        slot.title = form.title.clone();
        slot.description = form.description.clone();
        slot.is_active = form.is_active;
        slot.updated_at = form.updated_at;
        Ok(())
    }

    async fn replace_questions(&self, form_id: Uuid, questions: &[Question]) -> StoreResult<()> {
        check_question_orders(questions)?;
        let mut tables = self.tables.write();
        if !tables.forms.contains_key(&form_id) {
            return Err(StoreError::NotFound(format!("form {form_id}")));
        }

        let kept: HashSet<Uuid> = questions.iter().map(|q| q.id).collect();
        let submissions: HashSet<Uuid> = tables
            .submissions
            .values()
            .filter(|s| s.form_id == form_id)
            .map(|s| s.id)
            .collect();
        tables
            .answers
            .retain(|_, a| !submissions.contains(&a.submission_id) || kept.contains(&a.question_id));

        if let Some(form) = tables.forms.get_mut(&form_id) {
            form.questions = questions.to_vec();
            form.sort_questions();
            form.touch();
        }
        Ok(())
    }

    async fn delete_form(&self, id: Uuid) -> StoreResult<()> {
        self.tables
            .write()
            .remove_form(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("form {id}")))
    }

    async fn find_submission(
        &self,
        form_id: Uuid,
        email: &EmailAddress,
    ) -> StoreResult<Option<Submission>> {
        let tables = self.tables.read();
        Ok(tables
            .submissions
            .values()
            .find(|s| s.form_id == form_id && s.email == email.as_str())
            .map(|row| tables.hydrate(row)))
    }

    async fn insert_submission(&self, new: &NewSubmission) -> StoreResult<Submission> {
        let mut tables = self.tables.write();

        // Every check runs before the first write so a failure leaves no rows.
        if !tables.forms.contains_key(&new.form_id) {
            return Err(StoreError::Backend(format!(
                "foreign key violation: form {} does not exist",
                new.form_id
            )));
        }
        let key = (new.form_id, new.email.as_str().to_string());
        if tables.submission_keys.contains(&key) {
            return Err(StoreError::UniqueViolation {
                constraint: SUBMISSION_KEY_CONSTRAINT.into(),
            });
        }
        for answer in &new.answers {
            if tables.question(new.form_id, answer.question_id).is_none() {
                return Err(StoreError::Backend(format!(
                    "foreign key violation: question {} does not exist",
                    answer.question_id
                )));
            }
        }

        let row = SubmissionRow {
            id: new.id,
            form_id: new.form_id,
            first_name: new.first_name.clone(),
            last_name: new.last_name.clone(),
            email: new.email.as_str().to_string(),
            phone: new.phone.clone(),
            submitted_at: new.submitted_at,
        };
        tables.submission_keys.insert(key);
        for answer in &new.answers {
            tables.answers.insert(
                answer.id,
                AnswerRow {
                    id: answer.id,
                    submission_id: new.id,
                    question_id: answer.question_id,
                    answer: answer.answer.clone(),
                },
            );
        }
        let submission = tables.hydrate(&row);
        tables.submissions.insert(row.id, row);
        Ok(submission)
    }

    async fn get_submission(&self, id: Uuid) -> StoreResult<Submission> {
        let tables = self.tables.read();
        tables
            .submissions
            .get(&id)
            .map(|row| tables.hydrate(row))
            .ok_or_else(|| StoreError::NotFound(format!("submission {id}")))
    }

    async fn list_submissions(&self, form_id: Uuid) -> StoreResult<Vec<Submission>> {
        let tables = self.tables.read();
        let rows = tables
            .submissions
            .values()
            .filter(|s| s.form_id == form_id)
            .cloned();
        Ok(tables.sorted_newest_first(rows))
    }

    async fn count_submissions(&self, form_id: Uuid) -> StoreResult<u64> {
        let tables = self.tables.read();
        Ok(tables.submissions.values().filter(|s| s.form_id == form_id).count() as u64)
    }

    async fn recent_submissions(&self, limit: usize) -> StoreResult<Vec<Submission>> {
        let tables = self.tables.read();
        let mut recent = tables.sorted_newest_first(tables.submissions.values().cloned());
        recent.truncate(limit);
        Ok(recent)
    }

    async fn delete_submission(&self, id: Uuid) -> StoreResult<()> {
        self.tables
            .write()
            .remove_submission(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("submission {id}")))
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        let tables = self.tables.read();
        Ok(StoreStats {
            events: tables.events.len() as u64,
            forms: tables.forms.len() as u64,
            active_forms: tables.forms.values().filter(|f| f.is_active).count() as u64,
            submissions: tables.submissions.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    async fn seeded() -> (InMemoryStore, VolunteerForm) {
        let store = InMemoryStore::new();
        let event = Event::create("Harvest Festival", Utc::now());
        store.insert_event(&event).await.unwrap();

        let mut form = VolunteerForm::create(event.id, "Setup crew");
        for order in [1, 0] {
            form.questions.push(Question {
                id: Uuid::new_v4(),
                form_id: form.id,
                question: format!("Question {order}"),
                question_type: QuestionType::Text,
                required: false,
                order,
                options: None,
            });
        }
        store.insert_form(&form).await.unwrap();
        let form = store.get_form(form.id).await.unwrap();
        (store, form)
    }

    fn new_submission(form: &VolunteerForm, email: &str) -> NewSubmission {
        NewSubmission {
            id: Uuid::new_v4(),
            form_id: form.id,
            first_name: "Grace".into(),
            last_name: "Hopper".into(),
            email: EmailAddress::parse(email).unwrap(),
            phone: None,
            submitted_at: Utc::now(),
            answers: form
                .questions
                .iter()
                .map(|q| NewAnswer {
                    id: Uuid::new_v4(),
                    question_id: q.id,
                    answer: format!("answer to {}", q.question),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_form_questions_are_ordered() {
        let (_store, form) = seeded().await;
        assert_eq!(form.questions[0].order, 0);
        assert_eq!(form.questions[1].order, 1);
    }

    #[tokio::test]
    async fn test_insert_and_find_submission() {
        let (store, form) = seeded().await;
        let new = new_submission(&form, "grace@example.com");

        let inserted = store.insert_submission(&new).await.unwrap();
        assert_eq!(inserted.answers.len(), 2);
        assert_eq!(inserted.answers[0].question.order, 0);

        let found = store.find_submission(form.id, &new.email).await.unwrap();
        assert_eq!(found.map(|s| s.id), Some(new.id));
    }

    #[tokio::test]
    async fn test_unique_key_on_form_and_email() {
        let (store, form) = seeded().await;
        store
            .insert_submission(&new_submission(&form, "grace@example.com"))
            .await
            .unwrap();

        let err = store
            .insert_submission(&new_submission(&form, "grace@example.com"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::UniqueViolation { constraint: SUBMISSION_KEY_CONSTRAINT.into() }
        );
        assert_eq!(store.list_submissions(form.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_answer_insert_leaves_nothing_behind() {
        let (store, form) = seeded().await;
        let mut new = new_submission(&form, "grace@example.com");
        new.answers.push(NewAnswer {
            id: Uuid::new_v4(),
            question_id: Uuid::new_v4(),
            answer: "orphan".into(),
        });

        assert!(matches!(
            store.insert_submission(&new).await,
            Err(StoreError::Backend(_))
        ));
        assert!(store.find_submission(form.id, &new.email).await.unwrap().is_none());
        assert_eq!(store.stats().await.unwrap().submissions, 0);

        // The key was never claimed, so a clean retry succeeds.
        new.answers.pop();
        store.insert_submission(&new).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_event_cascades() {
        let (store, form) = seeded().await;
        let submission = store
            .insert_submission(&new_submission(&form, "grace@example.com"))
            .await
            .unwrap();

        store.delete_event(form.event_id).await.unwrap();

        assert!(matches!(store.get_form(form.id).await, Err(StoreError::NotFound(_))));
        assert!(matches!(
            store.get_submission(submission.id).await,
            Err(StoreError::NotFound(_))
        ));
        assert_eq!(store.stats().await.unwrap(), StoreStats::default());
    }

    #[tokio::test]
    async fn test_replace_questions_drops_stale_answers() {
        let (store, form) = seeded().await;
        let submission = store
            .insert_submission(&new_submission(&form, "grace@example.com"))
            .await
            .unwrap();

        let kept = vec![form.questions[1].clone()];
        store.replace_questions(form.id, &kept).await.unwrap();

        let reloaded = store.get_submission(submission.id).await.unwrap();
        assert_eq!(reloaded.answers.len(), 1);
        assert_eq!(reloaded.answers[0].question_id, kept[0].id);
    }

    #[tokio::test]
    async fn test_duplicate_question_order_rejected() {
        let (store, form) = seeded().await;
        let mut questions = form.questions.clone();
        questions[1].order = questions[0].order;

        assert!(matches!(
            store.replace_questions(form.id, &questions).await,
            Err(StoreError::UniqueViolation { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_submission_frees_key() {
        let (store, form) = seeded().await;
        let first = store
            .insert_submission(&new_submission(&form, "grace@example.com"))
            .await
            .unwrap();
        store.delete_submission(first.id).await.unwrap();

        store
            .insert_submission(&new_submission(&form, "grace@example.com"))
            .await
            .unwrap();
    }
}
