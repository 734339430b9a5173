//! CSV export of form submissions
//!
//! Fixed respondent columns first, then one column per question in form
//! order. Fields are quoted per RFC 4180 when they contain a delimiter,
//! quote or line break.

use crate::domain::{Submission, VolunteerForm};

const FIXED_COLUMNS: [&str; 5] = ["First Name", "Last Name", "Email", "Phone", "Submitted At"];

/// Render submissions of `form` as CSV text
pub fn submissions_csv(form: &VolunteerForm, submissions: &[Submission]) -> String {
    let mut questions: Vec<_> = form.questions.iter().collect();
    questions.sort_by_key(|q| q.order);

    let mut out = String::new();
    let header = FIXED_COLUMNS
        .iter()
        .copied()
        .chain(questions.iter().map(|q| q.question.as_str()));
    write_record(&mut out, header);

    for submission in submissions {
        let submitted_at = submission.submitted_at.to_rfc3339();
        let fixed = [
            submission.first_name.as_str(),
            submission.last_name.as_str(),
            submission.email.as_str(),
            submission.phone.as_deref().unwrap_or(""),
            submitted_at.as_str(),
        ];
        let answers = questions
            .iter()
            .map(|q| submission.answer_to(q.id).unwrap_or(""));
        write_record(&mut out, fixed.into_iter().chain(answers));
    }
    out
}

fn write_record<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    for (i, field) in fields.enumerate() {
        if i > 0 {
            out.push(',');
        }
        push_field(out, field);
    }
    out.push_str("\r\n");
}

fn push_field(out: &mut String, field: &str) {
    if field.contains([',', '"', '\n', '\r']) {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}
