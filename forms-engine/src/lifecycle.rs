//! Form lifecycle service.
//!
//! Each operation is one ordered decision: the first failing step decides
//! the outcome. Existence is always settled before visibility or ownership,
//! so a missing slug reads as not found to every caller. Mutations locate
//! their target inside the same unit of work that writes it.

use std::sync::Arc;

use forms_core::{
    authorize_mutation, is_visible_to, CoreError, Form, FormDetail, ListScope, MutationAccess,
    Principal, Question, Slug, Submission,
};
use serde_json::{Map, Value};

use crate::{EngineError, FormStore, SlugProvider, StoreError, UnitOfWork};

/// Slug candidates tried before a create gives up.
pub const MAX_SLUG_ATTEMPTS: usize = 5;

/// Submitted attribute mapping, as decoded from a request body.
pub type Attributes = Map<String, Value>;

/// A request body as handed over by the transport: either the decoded
/// mapping or the reason it could not be decoded. Mutations only look at it
/// once the target form is known to exist and belong to the caller.
pub type Payload = Result<Attributes, CoreError>;

/// Orchestrates list, read, create, update and delete of forms.
///
/// Stateless between calls; all shared state lives in the store.
pub struct FormService {
    store: Arc<dyn FormStore>,
    slugs: Arc<dyn SlugProvider>,
    list_scope: ListScope,
}

impl FormService {
    /// Create a service over `store`, drawing slugs from `slugs`.
    #[must_use]
    pub fn new(store: Arc<dyn FormStore>, slugs: Arc<dyn SlugProvider>) -> Self {
        Self { store, slugs, list_scope: ListScope::default() }
    }

    /// Choose which owned forms [`FormService::list`] returns.
    #[must_use]
    pub fn with_list_scope(mut self, list_scope: ListScope) -> Self {
        self.list_scope = list_scope;
        self
    }

    /// The configured list scope.
    #[must_use]
    pub fn list_scope(&self) -> ListScope {
        self.list_scope
    }

    /// Forms owned by `principal`, in creation order, without questions.
    ///
    /// # Errors
    /// Returns [`EngineError::Operation`] if the store fails.
    pub async fn list(&self, principal: &Principal) -> Result<Vec<Form>, EngineError> {
        let forms = self
            .store
            .list_forms_by_owner(&principal.id)
            .await
            .map_err(|e| store_failure("list", e))?;
        Ok(forms.into_iter().filter(|f| self.list_scope.includes(f)).collect())
    }

    /// Locate a form by slug, regardless of visibility.
    ///
    /// # Errors
    /// Returns [`EngineError::NotFound`] if no form has this slug.
    pub async fn find_form_by_slug(&self, slug: &Slug) -> Result<Form, EngineError> {
        match self.store.find_form_by_slug(slug).await {
            Ok(Some(form)) => Ok(form),
            Ok(None) => Err(not_found(slug)),
            Err(e) => Err(store_failure("find", e)),
        }
    }

    /// Read a visible form together with its ordered questions.
    ///
    /// # Errors
    /// Returns [`EngineError::NotFound`] if the slug is absent or the form
    /// is disabled; the two cases are indistinguishable.
    pub async fn read(&self, principal: &Principal, slug: &Slug) -> Result<FormDetail, EngineError> {
        let detail = match self.store.find_form_detail(slug).await {
            Ok(Some(detail)) => detail,
            Ok(None) => return Err(not_found(slug)),
            Err(e) => return Err(store_failure("read", e)),
        };
        if !is_visible_to(&detail.form, Some(principal)) {
            tracing::debug!(%slug, principal = %principal.id, "form hidden by visibility");
            return Err(EngineError::NotFound(slug.clone()));
        }
        Ok(detail)
    }

    /// Create a form owned by `principal` under a freshly generated slug.
    ///
    /// # Errors
    /// Returns [`EngineError::Validation`] if the attributes are rejected,
    /// or [`EngineError::Operation`] if storing fails or no free slug is
    /// found within [`MAX_SLUG_ATTEMPTS`] candidates.
    pub async fn create(
        &self,
        principal: &Principal,
        payload: Payload,
    ) -> Result<Form, EngineError> {
        let submission = Submission::parse(payload?)?;
        submission.validate_new("form")?;

        for attempt in 1..=MAX_SLUG_ATTEMPTS {
            let form = Form::new(principal.id.clone(), self.slugs.generate(), submission.clone());
            let mut uow = self.store.begin().await.map_err(|e| store_failure("create", e))?;
            match uow.insert_form(form.clone()).await {
                Ok(()) => {
                    uow.commit().await.map_err(|e| store_failure("create", e))?;
                    tracing::info!(slug = %form.slug, principal = %principal.id, "form created");
                    return Ok(form);
                }
                Err(StoreError::SlugConflict(slug)) => {
                    tracing::debug!(%slug, attempt, "slug already taken, retrying");
                }
                Err(e) => return Err(store_failure("create", e)),
            }
        }

        Err(store_failure(
            "create",
            StoreError::Backend(format!("no free slug after {MAX_SLUG_ATTEMPTS} attempts")),
        ))
    }

    /// Apply `attributes` to a form the caller owns.
    ///
    /// Submitted `id`, `slug` and owner keys are ignored. An undecodable
    /// payload is only reported once existence and ownership are settled.
    ///
    /// # Errors
    /// In precedence order: [`EngineError::NotFound`],
    /// [`EngineError::Forbidden`], [`EngineError::Validation`],
    /// [`EngineError::Operation`].
    pub async fn update(
        &self,
        principal: &Principal,
        slug: &Slug,
        payload: Payload,
    ) -> Result<Form, EngineError> {
        let mut uow = self.store.begin().await.map_err(|e| store_failure("update", e))?;
        let mut form = locate_for_mutation(uow.as_mut(), principal, slug, "update").await?;

        let submission = Submission::parse(payload?)?;
        submission.validate_update()?;
        form.apply(submission);

        uow.replace_form(form.clone()).await.map_err(|e| store_failure("update", e))?;
        uow.commit().await.map_err(|e| store_failure("update", e))?;
        tracing::info!(%slug, principal = %principal.id, "form updated");
        Ok(form)
    }

    /// Delete a form the caller owns together with all of its questions.
    ///
    /// Returns the number of questions removed. The form and its questions
    /// go in one unit of work: on any failure nothing is removed.
    ///
    /// # Errors
    /// In precedence order: [`EngineError::NotFound`],
    /// [`EngineError::Forbidden`], [`EngineError::Operation`].
    pub async fn delete(&self, principal: &Principal, slug: &Slug) -> Result<usize, EngineError> {
        let mut uow = self.store.begin().await.map_err(|e| store_failure("delete", e))?;
        let form = locate_for_mutation(uow.as_mut(), principal, slug, "delete").await?;

        let removed =
            uow.delete_questions_of(form.id).await.map_err(|e| store_failure("delete", e))?;
        uow.delete_form(form.id).await.map_err(|e| store_failure("delete", e))?;
        uow.commit().await.map_err(|e| store_failure("delete", e))?;

        tracing::info!(%slug, principal = %principal.id, questions = removed, "form deleted");
        Ok(removed)
    }

    /// Append a question to a form the caller owns.
    ///
    /// # Errors
    /// In precedence order: [`EngineError::NotFound`],
    /// [`EngineError::Forbidden`], [`EngineError::Validation`],
    /// [`EngineError::Operation`].
    pub async fn add_question(
        &self,
        principal: &Principal,
        slug: &Slug,
        payload: Payload,
    ) -> Result<Question, EngineError> {
        let mut uow = self.store.begin().await.map_err(|e| store_failure("add_question", e))?;
        let form = locate_for_mutation(uow.as_mut(), principal, slug, "add_question").await?;

        let submission = Submission::parse(payload?)?;
        submission.validate_new("question")?;

        let existing =
            uow.questions_of(form.id).await.map_err(|e| store_failure("add_question", e))?;
        let position = existing.last().map_or(0, |q| q.position.saturating_add(1));
        let question = Question::new(form.id, position, submission.fields);

        uow.insert_question(question.clone())
            .await
            .map_err(|e| store_failure("add_question", e))?;
        uow.commit().await.map_err(|e| store_failure("add_question", e))?;
        tracing::info!(%slug, principal = %principal.id, position, "question added");
        Ok(question)
    }
}

/// Existence first, then ownership.
async fn locate_for_mutation(
    uow: &mut dyn UnitOfWork,
    principal: &Principal,
    slug: &Slug,
    operation: &'static str,
) -> Result<Form, EngineError> {
    let form = match uow.find_form_by_slug(slug).await {
        Ok(Some(form)) => form,
        Ok(None) => return Err(not_found(slug)),
        Err(e) => return Err(store_failure(operation, e)),
    };
    match authorize_mutation(principal, &form) {
        MutationAccess::Allowed => Ok(form),
        MutationAccess::Forbidden => {
            tracing::warn!(%slug, principal = %principal.id, operation, "mutation by non-owner refused");
            Err(EngineError::Forbidden(slug.clone()))
        }
    }
}

fn not_found(slug: &Slug) -> EngineError {
    tracing::debug!(%slug, "no form with this slug");
    EngineError::NotFound(slug.clone())
}

fn store_failure(operation: &'static str, err: StoreError) -> EngineError {
    tracing::error!(operation, error = %err, "store operation failed, changes rolled back");
    EngineError::Operation(err)
}
