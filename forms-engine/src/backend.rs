//! Storage abstraction traits.
//!
//! Lets the lifecycle service run against the in-memory store or any other
//! engine without changing its decision logic. Every mutation goes through a
//! [`UnitOfWork`], so the atomicity of a cascade never depends on what the
//! engine does with foreign keys.

use async_trait::async_trait;
use forms_core::{Form, FormDetail, FormId, PrincipalId, Question, Slug};

use crate::StoreError;

/// Read access to stored forms plus the entry point for writes.
///
/// Implementations must be `Send + Sync` to allow use across async tasks.
#[async_trait]
pub trait FormStore: Send + Sync {
    /// Look up a form by its exact slug.
    ///
    /// # Errors
    /// Returns [`StoreError::Backend`] if the lookup itself fails.
    async fn find_form_by_slug(&self, slug: &Slug) -> Result<Option<Form>, StoreError>;

    /// Look up a form and its questions as one consistent snapshot.
    ///
    /// # Errors
    /// Returns [`StoreError::Backend`] if the lookup itself fails.
    async fn find_form_detail(&self, slug: &Slug) -> Result<Option<FormDetail>, StoreError>;

    /// All forms owned by `owner`, in insertion order.
    ///
    /// # Errors
    /// Returns [`StoreError::Backend`] if the query fails.
    async fn list_forms_by_owner(&self, owner: &PrincipalId) -> Result<Vec<Form>, StoreError>;

    /// Open a unit of work. Dropping it without calling
    /// [`UnitOfWork::commit`] discards every staged change.
    ///
    /// # Errors
    /// Returns [`StoreError::Backend`] if a transaction cannot be started.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;
}

/// A scoped set of writes that is applied entirely or not at all.
///
/// Reads through a unit of work observe its own staged writes.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Look up a form by slug inside this unit of work.
    ///
    /// # Errors
    /// Returns [`StoreError::Backend`] if the lookup fails.
    async fn find_form_by_slug(&mut self, slug: &Slug) -> Result<Option<Form>, StoreError>;

    /// Questions of `form`, ordered by position.
    ///
    /// # Errors
    /// Returns [`StoreError::Backend`] if the query fails.
    async fn questions_of(&mut self, form: FormId) -> Result<Vec<Question>, StoreError>;

    /// Stage a new form.
    ///
    /// # Errors
    /// Returns [`StoreError::SlugConflict`] if the slug is already taken.
    async fn insert_form(&mut self, form: Form) -> Result<(), StoreError>;

    /// Stage a replacement of an existing form, matched by id.
    ///
    /// # Errors
    /// Returns [`StoreError::FormMissing`] if no form has that id.
    async fn replace_form(&mut self, form: Form) -> Result<(), StoreError>;

    /// Stage a new question.
    ///
    /// # Errors
    /// Returns [`StoreError::FormMissing`] if the parent form does not exist.
    async fn insert_question(&mut self, question: Question) -> Result<(), StoreError>;

    /// Stage removal of every question belonging to `form`. Returns how many
    /// were removed.
    ///
    /// # Errors
    /// Returns [`StoreError::Backend`] if the removal fails.
    async fn delete_questions_of(&mut self, form: FormId) -> Result<usize, StoreError>;

    /// Stage removal of the form itself.
    ///
    /// # Errors
    /// Returns [`StoreError::FormMissing`] if no form has that id.
    async fn delete_form(&mut self, form: FormId) -> Result<(), StoreError>;

    /// Apply every staged change atomically.
    ///
    /// # Errors
    /// Returns [`StoreError::Backend`] if the changes cannot be applied, in
    /// which case none of them are.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
