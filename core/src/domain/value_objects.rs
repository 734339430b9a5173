//! Value Objects - validated domain primitives
//!
//! Value Objects are:
//! - Immutable
//! - Comparable by value (not identity)
//! - Self-validating

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Domain validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    #[error("unknown question type: {0}")]
    UnknownQuestionType(String),

    #[error("{0}")]
    Invalid(String),
}

/// Submitter email address (Value Object)
///
/// The deduplication key of a submission. Stored trimmed and lowercased so
/// that `A@x.com` and `a@x.com` name the same respondent.
///
/// # Invariants
/// - Exactly one `@`
/// - Non-empty local part and domain
/// - No whitespace
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Parse and normalize an email address
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, DomainError> {
        let email = raw.as_ref().trim().to_lowercase();

        let Some((local, domain)) = email.split_once('@') else {
            return Err(DomainError::InvalidEmail(email));
        };
        if local.is_empty()
            || domain.is_empty()
            || domain.contains('@')
            || !domain.contains('.')
            || domain.starts_with('.')
            || domain.ends_with('.')
            || email.chars().any(char::is_whitespace)
        {
            return Err(DomainError::InvalidEmail(email));
        }

        Ok(Self(email))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

/// Question input kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
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

impl QuestionType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Textarea => "TEXTAREA",
            Self::Email => "EMAIL",
            Self::Phone => "PHONE",
            Self::MultipleChoice => "MULTIPLE_CHOICE",
            Self::Checkbox => "CHECKBOX",
            Self::Date => "DATE",
            Self::Time => "TIME",
        }
    }

    /// Choice questions must offer at least one option
    pub const fn has_options(&self) -> bool {
        matches!(self, Self::MultipleChoice | Self::Checkbox)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TEXT" => Ok(Self::Text),
            "TEXTAREA" => Ok(Self::Textarea),
            "EMAIL" => Ok(Self::Email),
            "PHONE" => Ok(Self::Phone),
            "MULTIPLE_CHOICE" => Ok(Self::MultipleChoice),
            "CHECKBOX" => Ok(Self::Checkbox),
            "DATE" => Ok(Self::Date),
            "TIME" => Ok(Self::Time),
            other => Err(DomainError::UnknownQuestionType(other.to_string())),
        }
    }
}

/// Trim a required text field, rejecting blanks
pub fn required_text(field: &str, value: &str) -> Result<String, DomainError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::Invalid(format!("{field} is required")));
    }
    Ok(value.to_string())
}

/// Trim an optional text field, mapping blanks to `None`
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
