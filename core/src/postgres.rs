//! PostgreSQL store
//!
//! Schema lives in `migrations/`. The unique constraint
//! `volunteer_submissions_form_email_key` is the source of truth for the
//! one-submission-per-email rule; SQLSTATE 23505 surfaces as
//! [`StoreError::UniqueViolation`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::*;
use crate::repository::{StoreError, StoreResult, VolunteerStore};

const UNIQUE_VIOLATION: &str = "23505";

fn store_err(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::RowNotFound => StoreError::NotFound("row".into()),
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            StoreError::UniqueViolation {
                constraint: db.constraint().unwrap_or_default().to_string(),
            }
        }
        _ => StoreError::Backend(err.to_string()),
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    location: Option<String>,
    starts_at: DateTime<Utc>,
    ends_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            location: row.location,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct FormRow {
    id: Uuid,
    event_id: Uuid,
    title: String,
    description: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl FormRow {
    fn into_form(self, questions: Vec<Question>) -> VolunteerForm {
        VolunteerForm {
            id: self.id,
            event_id: self.event_id,
            title: self.title,
            description: self.description,
            is_active: self.is_active,
            questions,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct QuestionRow {
    id: Uuid,
    volunteer_form_id: Uuid,
    question: String,
    question_type: String,
    required: bool,
    position: i32,
    options: Option<Json<Vec<String>>>,
}

impl TryFrom<QuestionRow> for Question {
    type Error = StoreError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        let question_type = row
            .question_type
            .parse()
            .map_err(|e: DomainError| StoreError::Backend(e.to_string()))?;
        Ok(Self {
            id: row.id,
            form_id: row.volunteer_form_id,
            question: row.question,
            question_type,
            required: row.required,
            order: row.position,
            options: row.options.map(|Json(options)| options),
        })
    }
}

#[derive(sqlx::FromRow)]
struct SubmissionRow {
    id: Uuid,
    volunteer_form_id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    phone: Option<String>,
    submitted_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct AnswerRow {
    answer_id: Uuid,
    submission_id: Uuid,
    answer: String,
    #[sqlx(flatten)]
    question: QuestionRow,
}

#[derive(sqlx::FromRow)]
struct StatsRow {
    events: i64,
    forms: i64,
    active_forms: i64,
    submissions: i64,
}

const QUESTION_COLUMNS: &str =
    "q.id, q.volunteer_form_id, q.question, q.question_type, q.required, q.position, q.options";

const SUBMISSION_COLUMNS: &str =
    "id, volunteer_form_id, first_name, last_name, email, phone, submitted_at";

/// PostgreSQL-backed [`VolunteerStore`]
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Open a connection pool
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(store_err)?;
        Ok(Self { pool })
    }

    /// Apply pending migrations
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn questions_for(&self, form_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, Vec<Question>>> {
        let sql = format!(
            "SELECT {QUESTION_COLUMNS} FROM volunteer_form_questions q \
             WHERE q.volunteer_form_id = ANY($1) ORDER BY q.position"
        );
        let rows: Vec<QuestionRow> = sqlx::query_as(&sql)
            .bind(form_ids.to_vec())
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;

        let mut by_form: HashMap<Uuid, Vec<Question>> = HashMap::new();
        for row in rows {
            let question = Question::try_from(row)?;
            by_form.entry(question.form_id).or_default().push(question);
        }
        Ok(by_form)
    }

    async fn forms_with_questions(&self, rows: Vec<FormRow>) -> StoreResult<Vec<VolunteerForm>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut questions = self.questions_for(&ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let qs = questions.remove(&row.id).unwrap_or_default();
                row.into_form(qs)
            })
            .collect())
    }

    async fn hydrate(&self, rows: Vec<SubmissionRow>) -> StoreResult<Vec<Submission>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let sql = format!(
            "SELECT a.id AS answer_id, a.submission_id, a.answer, {QUESTION_COLUMNS} \
             FROM volunteer_answers a \
             JOIN volunteer_form_questions q ON q.id = a.question_id \
             WHERE a.submission_id = ANY($1) ORDER BY q.position"
        );
        let answer_rows: Vec<AnswerRow> = sqlx::query_as(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;

        let mut answers: HashMap<Uuid, Vec<SubmittedAnswer>> = HashMap::new();
        for row in answer_rows {
            let question = Question::try_from(row.question)?;
            answers.entry(row.submission_id).or_default().push(SubmittedAnswer {
                id: row.answer_id,
                submission_id: row.submission_id,
                question_id: question.id,
                answer: row.answer,
                question,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| Submission {
                answers: answers.remove(&row.id).unwrap_or_default(),
                id: row.id,
                form_id: row.volunteer_form_id,
                first_name: row.first_name,
                last_name: row.last_name,
                email: row.email,
                phone: row.phone,
                submitted_at: row.submitted_at,
            })
            .collect())
    }

    /// Submissions newest first, optionally for one form and capped at `limit`
    async fn submissions_where(&self, form_id: Option<Uuid>, limit: Option<i64>) -> StoreResult<Vec<Submission>> {
        let mut query = submissions_query(form_id, limit);
        let rows = query
            .build_query_as::<SubmissionRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        self.hydrate(rows).await
    }
}

fn submissions_query(form_id: Option<Uuid>, limit: Option<i64>) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(format!("SELECT {SUBMISSION_COLUMNS} FROM volunteer_submissions"));
    if let Some(form_id) = form_id {
        query.push(" WHERE volunteer_form_id = ").push_bind(form_id);
    }
    query.push(" ORDER BY submitted_at DESC");
    if let Some(limit) = limit {
        query.push(" LIMIT ").push_bind(limit);
    }
    query
}

fn expect_one(rows_affected: u64, what: impl FnOnce() -> String) -> StoreResult<()> {
    if rows_affected == 0 {
        Err(StoreError::NotFound(what()))
    } else {
        Ok(())
    }
}

#[async_trait]
impl VolunteerStore for PgStore {
    async fn insert_event(&self, event: &Event) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO events (id, title, description, location, starts_at, ends_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.starts_at)
        .bind(event.ends_at)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn get_event(&self, id: Uuid) -> StoreResult<Event> {
        sqlx::query_as::<_, EventRow>("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?
            .map(Event::from)
            .ok_or_else(|| StoreError::NotFound(format!("event {id}")))
    }

    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        let rows = sqlx::query_as::<_, EventRow>("SELECT * FROM events ORDER BY starts_at")
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn update_event(&self, event: &Event) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE events SET title = $2, description = $3, location = $4, \
             starts_at = $5, ends_at = $6, updated_at = $7 WHERE id = $1",
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.starts_at)
        .bind(event.ends_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        expect_one(result.rows_affected(), || format!("event {}", event.id))
    }

    async fn delete_event(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        expect_one(result.rows_affected(), || format!("event {id}"))
    }

    async fn insert_form(&self, form: &VolunteerForm) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;
        sqlx::query(
            "INSERT INTO volunteer_forms (id, event_id, title, description, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(form.id)
        .bind(form.event_id)
        .bind(&form.title)
        .bind(&form.description)
        .bind(form.is_active)
        .bind(form.created_at)
        .bind(form.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;

        for q in &form.questions {
            upsert_question(&mut tx, form.id, q).await?;
        }
        tx.commit().await.map_err(store_err)
    }

    async fn get_form(&self, id: Uuid) -> StoreResult<VolunteerForm> {
        let row = sqlx::query_as::<_, FormRow>("SELECT * FROM volunteer_forms WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?
            .ok_or_else(|| StoreError::NotFound(format!("form {id}")))?;
        let mut forms = self.forms_with_questions(vec![row]).await?;
        forms
            .pop()
            .ok_or_else(|| StoreError::NotFound(format!("form {id}")))
    }

    async fn list_forms(&self, event_id: Uuid) -> StoreResult<Vec<VolunteerForm>> {
        let rows = sqlx::query_as::<_, FormRow>(
            "SELECT * FROM volunteer_forms WHERE event_id = $1 ORDER BY created_at",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        self.forms_with_questions(rows).await
    }

    async fn update_form(&self, form: &VolunteerForm) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE volunteer_forms SET title = $2, description = $3, is_active = $4, updated_at = $5 \
             WHERE id = $1",
        )
        .bind(form.id)
        .bind(&form.title)
        .bind(&form.description)
        .bind(form.is_active)
        .bind(form.updated_at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        expect_one(result.rows_affected(), || format!("form {}", form.id))
    }

    async fn replace_questions(&self, form_id: Uuid, questions: &[Question]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        let touched = sqlx::query("UPDATE volunteer_forms SET updated_at = now() WHERE id = $1")
            .bind(form_id)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;
        expect_one(touched.rows_affected(), || format!("form {form_id}"))?;

        let kept: Vec<Uuid> = questions.iter().map(|q| q.id).collect();
        sqlx::query(
            "DELETE FROM volunteer_form_questions \
             WHERE volunteer_form_id = $1 AND NOT (id = ANY($2))",
        )
        .bind(form_id)
        .bind(kept)
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;

        for q in questions {
            upsert_question(&mut tx, form_id, q).await?;
        }
        tx.commit().await.map_err(store_err)
    }

    async fn delete_form(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM volunteer_forms WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        expect_one(result.rows_affected(), || format!("form {id}"))
    }

    async fn find_submission(
        &self,
        form_id: Uuid,
        email: &EmailAddress,
    ) -> StoreResult<Option<Submission>> {
        let sql = format!(
            "SELECT {SUBMISSION_COLUMNS} FROM volunteer_submissions \
             WHERE volunteer_form_id = $1 AND email = $2"
        );
        let row = sqlx::query_as::<_, SubmissionRow>(&sql)
            .bind(form_id)
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    #[tracing::instrument(name = "insert volunteer submission", skip(self, new), fields(form_id = %new.form_id))]
    async fn insert_submission(&self, new: &NewSubmission) -> StoreResult<Submission> {
        // Rolled back on drop unless committed.
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        sqlx::query(
            "INSERT INTO volunteer_submissions \
             (id, volunteer_form_id, first_name, last_name, email, phone, submitted_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(new.id)
        .bind(new.form_id)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(new.email.as_str())
        .bind(&new.phone)
        .bind(new.submitted_at)
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;

        for answer in &new.answers {
            sqlx::query(
                "INSERT INTO volunteer_answers (id, submission_id, question_id, answer) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(answer.id)
            .bind(new.id)
            .bind(answer.question_id)
            .bind(&answer.answer)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;
        }

        let sql = format!(
            "SELECT {QUESTION_COLUMNS} FROM volunteer_form_questions q WHERE q.volunteer_form_id = $1"
        );
        let questions = sqlx::query_as::<_, QuestionRow>(&sql)
            .bind(new.form_id)
            .fetch_all(&mut *tx)
            .await
            .map_err(store_err)?
            .into_iter()
            .map(Question::try_from)
            .collect::<StoreResult<Vec<_>>>()?;
        let submission = new.to_submission(&questions).ok_or_else(|| {
            StoreError::Backend(format!("submission {} answers a question outside its form", new.id))
        })?;

        tx.commit().await.map_err(store_err)?;
        Ok(submission)
    }

    async fn get_submission(&self, id: Uuid) -> StoreResult<Submission> {
        let sql = format!("SELECT {SUBMISSION_COLUMNS} FROM volunteer_submissions WHERE id = $1");
        let row = sqlx::query_as::<_, SubmissionRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?
            .ok_or_else(|| StoreError::NotFound(format!("submission {id}")))?;
        self.hydrate(vec![row])
            .await?
            .pop()
            .ok_or_else(|| StoreError::NotFound(format!("submission {id}")))
    }

    async fn list_submissions(&self, form_id: Uuid) -> StoreResult<Vec<Submission>> {
        self.submissions_where(Some(form_id), None).await
    }

    async fn count_submissions(&self, form_id: Uuid) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM volunteer_submissions WHERE volunteer_form_id = $1",
        )
        .bind(form_id)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(count.max(0) as u64)
    }

    async fn recent_submissions(&self, limit: usize) -> StoreResult<Vec<Submission>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.submissions_where(None, Some(limit)).await
    }

    async fn delete_submission(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM volunteer_submissions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        expect_one(result.rows_affected(), || format!("submission {id}"))
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        let row = sqlx::query_as::<_, StatsRow>(
            "SELECT \
               (SELECT COUNT(*) FROM events) AS events, \
               (SELECT COUNT(*) FROM volunteer_forms) AS forms, \
               (SELECT COUNT(*) FROM volunteer_forms WHERE is_active) AS active_forms, \
               (SELECT COUNT(*) FROM volunteer_submissions) AS submissions",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(StoreStats {
            events: row.events.max(0) as u64,
            forms: row.forms.max(0) as u64,
            active_forms: row.active_forms.max(0) as u64,
            submissions: row.submissions.max(0) as u64,
        })
    }
}

async fn upsert_question(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    form_id: Uuid,
    q: &Question,
) -> StoreResult<()> {
    sqlx::query(
        "INSERT INTO volunteer_form_questions \
         (id, volunteer_form_id, question, question_type, required, position, options) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         ON CONFLICT (id) DO UPDATE SET \
           question = EXCLUDED.question, question_type = EXCLUDED.question_type, \
           required = EXCLUDED.required, position = EXCLUDED.position, options = EXCLUDED.options \
         WHERE volunteer_form_questions.volunteer_form_id = EXCLUDED.volunteer_form_id",
    )
    .bind(q.id)
    .bind(form_id)
    .bind(&q.question)
    .bind(q.question_type.as_str())
    .bind(q.required)
    .bind(q.order)
    .bind(q.options.clone().map(Json))
    .execute(&mut **tx)
    .await
    .map_err(store_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question_row(question_type: &str) -> QuestionRow {
        QuestionRow {
            id: Uuid::new_v4(),
            volunteer_form_id: Uuid::new_v4(),
            question: "Shift".into(),
            question_type: question_type.into(),
            required: true,
            position: 2,
            options: Some(Json(vec!["AM".into(), "PM".into()])),
        }
    }

    #[test]
    fn test_question_row_conversion() {
        let question = Question::try_from(question_row("MULTIPLE_CHOICE")).unwrap();
        assert_eq!(question.question_type, QuestionType::MultipleChoice);
        assert_eq!(question.order, 2);
        assert_eq!(question.options, Some(vec!["AM".to_string(), "PM".to_string()]));
    }

    #[test]
    fn test_unknown_question_type_is_backend_error() {
        assert!(matches!(
            Question::try_from(question_row("SLIDER")),
            Err(StoreError::Backend(_))
        ));
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert!(matches!(store_err(sqlx::Error::RowNotFound), StoreError::NotFound(_)));
    }

    #[test]
    fn test_submission_query_placeholders() {
        let for_form = submissions_query(Some(Uuid::new_v4()), None);
        assert!(for_form.sql().ends_with("WHERE volunteer_form_id = $1 ORDER BY submitted_at DESC"));

        let recent = submissions_query(None, Some(5));
        assert!(recent.sql().ends_with("FROM volunteer_submissions ORDER BY submitted_at DESC LIMIT $1"));

        let both = submissions_query(Some(Uuid::new_v4()), Some(5));
        assert!(both.sql().ends_with("= $1 ORDER BY submitted_at DESC LIMIT $2"));
    }
}
