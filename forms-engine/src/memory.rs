//! In-memory [`FormStore`] backend.
//!
//! State lives behind a single `tokio` `RwLock`. A unit of work holds the
//! write guard for its whole lifetime and applies changes in place, recording
//! how to undo each one. Dropping it uncommitted replays the undo log in
//! reverse, so concurrent readers see either the state before it or the state
//! after its commit, never anything in between.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use forms_core::{Form, FormDetail, FormId, PrincipalId, Question, QuestionId, Slug};
use indexmap::IndexMap;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use crate::{FormStore, StoreError, UnitOfWork};

#[derive(Debug, Default)]
struct StoreState {
    forms: IndexMap<FormId, Form>,
    slugs: HashMap<Slug, FormId>,
    /// Per-form question lists, ordered by position.
    questions: HashMap<FormId, Vec<Question>>,
}

impl StoreState {
    fn form_by_slug(&self, slug: &Slug) -> Option<&Form> {
        self.slugs.get(slug).and_then(|id| self.forms.get(id))
    }

    fn questions_of(&self, form: FormId) -> Vec<Question> {
        self.questions.get(&form).cloned().unwrap_or_default()
    }
}

/// Thread-safe in-memory store of forms and questions.
///
/// Cloning yields another handle to the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<StoreState>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored forms.
    pub async fn form_count(&self) -> usize {
        self.state.read().await.forms.len()
    }

    /// Number of stored questions across all forms.
    pub async fn question_count(&self) -> usize {
        self.state.read().await.questions.values().map(Vec::len).sum()
    }

    /// Number of questions stored for `form`.
    pub async fn question_count_of(&self, form: FormId) -> usize {
        self.state.read().await.questions.get(&form).map_or(0, Vec::len)
    }
}

#[async_trait]
impl FormStore for MemoryStore {
    async fn find_form_by_slug(&self, slug: &Slug) -> Result<Option<Form>, StoreError> {
        Ok(self.state.read().await.form_by_slug(slug).cloned())
    }

    async fn find_form_detail(&self, slug: &Slug) -> Result<Option<FormDetail>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .form_by_slug(slug)
            .map(|form| FormDetail::new(form.clone(), state.questions_of(form.id))))
    }

    async fn list_forms_by_owner(&self, owner: &PrincipalId) -> Result<Vec<Form>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .forms
            .values()
            .filter(|f| &f.owner_id == owner)
            .cloned()
            .collect())
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let guard = Arc::clone(&self.state).write_owned().await;
        Ok(Box::new(MemoryUnitOfWork { guard, undo: Vec::new() }))
    }
}

/// How to reverse one applied change.
#[derive(Debug)]
enum Undo {
    InsertedForm(FormId),
    ReplacedForm(Form),
    InsertedQuestion { form: FormId, id: QuestionId },
    DeletedQuestions { form: FormId, questions: Vec<Question> },
    DeletedForm { index: usize, form: Form },
}

impl Undo {
    fn revert(self, state: &mut StoreState) {
        match self {
            Self::InsertedForm(id) => {
                if let Some(form) = state.forms.shift_remove(&id) {
                    state.slugs.remove(&form.slug);
                }
            }
            Self::ReplacedForm(previous) => {
                if let Some(slot) = state.forms.get_mut(&previous.id) {
                    *slot = previous;
                }
            }
            Self::InsertedQuestion { form, id } => {
                if let Some(list) = state.questions.get_mut(&form) {
                    list.retain(|q| q.id != id);
                    if list.is_empty() {
                        state.questions.remove(&form);
                    }
                }
            }
            Self::DeletedQuestions { form, questions } => {
                state.questions.insert(form, questions);
            }
            Self::DeletedForm { index, form } => {
                state.slugs.insert(form.slug.clone(), form.id);
                state.forms.shift_insert(index, form.id, form);
            }
        }
    }
}

/// Writes against a [`MemoryStore`] under its write lock; reverted on drop
/// unless committed.
struct MemoryUnitOfWork {
    guard: OwnedRwLockWriteGuard<StoreState>,
    undo: Vec<Undo>,
}

impl Drop for MemoryUnitOfWork {
    fn drop(&mut self) {
        if self.undo.is_empty() {
            return;
        }
        tracing::debug!(changes = self.undo.len(), "rolling back uncommitted unit of work");
        while let Some(entry) = self.undo.pop() {
            entry.revert(&mut self.guard);
        }
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn find_form_by_slug(&mut self, slug: &Slug) -> Result<Option<Form>, StoreError> {
        Ok(self.guard.form_by_slug(slug).cloned())
    }

    async fn questions_of(&mut self, form: FormId) -> Result<Vec<Question>, StoreError> {
        Ok(self.guard.questions_of(form))
    }

    async fn insert_form(&mut self, form: Form) -> Result<(), StoreError> {
        if self.guard.slugs.contains_key(&form.slug) {
            return Err(StoreError::SlugConflict(form.slug));
        }
        self.guard.slugs.insert(form.slug.clone(), form.id);
        self.undo.push(Undo::InsertedForm(form.id));
        self.guard.forms.insert(form.id, form);
        Ok(())
    }

    async fn replace_form(&mut self, form: Form) -> Result<(), StoreError> {
        let Some(existing) = self.guard.forms.get_mut(&form.id) else {
            return Err(StoreError::FormMissing(form.id));
        };
        // The slug index is keyed on the original slug.
        if existing.slug != form.slug {
            return Err(StoreError::Backend(format!("slug of form {} is immutable", form.id)));
        }
        let previous = std::mem::replace(existing, form);
        self.undo.push(Undo::ReplacedForm(previous));
        Ok(())
    }

    async fn insert_question(&mut self, question: Question) -> Result<(), StoreError> {
        if !self.guard.forms.contains_key(&question.form_id) {
            return Err(StoreError::FormMissing(question.form_id));
        }
        self.undo.push(Undo::InsertedQuestion { form: question.form_id, id: question.id });
        let list = self.guard.questions.entry(question.form_id).or_default();
        let at = list.partition_point(|q| q.position <= question.position);
        list.insert(at, question);
        Ok(())
    }

    async fn delete_questions_of(&mut self, form: FormId) -> Result<usize, StoreError> {
        let Some(questions) = self.guard.questions.remove(&form) else {
            return Ok(0);
        };
        let removed = questions.len();
        self.undo.push(Undo::DeletedQuestions { form, questions });
        Ok(removed)
    }

    async fn delete_form(&mut self, form: FormId) -> Result<(), StoreError> {
        let Some((index, _, removed)) = self.guard.forms.shift_remove_full(&form) else {
            return Err(StoreError::FormMissing(form));
        };
        self.guard.slugs.remove(&removed.slug);
        self.undo.push(Undo::DeletedForm { index, form: removed });
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut uow = self;
        uow.undo.clear();
        Ok(())
    }
}
