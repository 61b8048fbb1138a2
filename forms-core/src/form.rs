use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fields::{Fields, Submission};
use crate::id::{FormId, PrincipalId, QuestionId, Slug};

/// A form owned by a principal.
///
/// The slug is assigned once at creation and never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Form {
    /// Internal identifier.
    pub id: FormId,
    /// Public identifier used in URLs.
    pub slug: Slug,
    /// The principal who created the form.
    pub owner_id: PrincipalId,
    /// Disabled forms read as absent to everyone.
    pub enabled: bool,
    /// When the form was created.
    pub created_at: DateTime<Utc>,
    /// When the form was last updated.
    pub updated_at: DateTime<Utc>,
    /// Pass-through attributes such as `title` and `description`.
    #[serde(flatten)]
    pub fields: Fields,
}

impl Form {
    /// Builds a new form owned by `owner`. `enabled` defaults to `true`.
    #[must_use]
    pub fn new(owner_id: PrincipalId, slug: Slug, submission: Submission) -> Self {
        let now = Utc::now();
        Self {
            id: FormId::new(),
            slug,
            owner_id,
            enabled: submission.enabled.unwrap_or(true),
            created_at: now,
            updated_at: now,
            fields: submission.fields,
        }
    }

    /// Applies an update. Identity, slug and owner are left untouched.
    pub fn apply(&mut self, submission: Submission) {
        if let Some(enabled) = submission.enabled {
            self.enabled = enabled;
        }
        self.fields.merge(submission.fields);
        self.updated_at = Utc::now();
    }
}

/// A question belonging to exactly one form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Question {
    /// Internal identifier.
    pub id: QuestionId,
    /// The containing form.
    pub form_id: FormId,
    /// Zero-based creation order within the form.
    pub position: u32,
    /// When the question was created.
    pub created_at: DateTime<Utc>,
    /// Pass-through attributes such as `title` and `kind`.
    #[serde(flatten)]
    pub fields: Fields,
}

impl Question {
    /// Builds a question at `position` inside `form_id`.
    #[must_use]
    pub fn new(form_id: FormId, position: u32, fields: Fields) -> Self {
        Self { id: QuestionId::new(), form_id, position, created_at: Utc::now(), fields }
    }
}

/// A form together with its questions, ordered by position.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[non_exhaustive]
pub struct FormDetail {
    #[serde(flatten)]
    pub form: Form,
    pub questions: Vec<Question>,
}

impl FormDetail {
    /// Pairs a form with its questions, sorting them by position.
    #[must_use]
    pub fn new(form: Form, mut questions: Vec<Question>) -> Self {
        questions.sort_by_key(|q| q.position);
        Self { form, questions }
    }
}
