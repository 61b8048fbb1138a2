//! Error types for the engine crate.

use forms_core::{CoreError, FormId, Slug};

/// Failures reported by a [`FormStore`](crate::FormStore) backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// Another form already holds this slug.
    #[error("slug already taken: {0}")]
    SlugConflict(Slug),

    /// The referenced form is not present in the store.
    #[error("form missing from store: {0}")]
    FormMissing(FormId),

    /// The backend itself failed.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Outcome of a lifecycle operation that did not succeed.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum EngineError {
    /// No visible form has this slug. Absent and disabled forms are
    /// deliberately reported the same way.
    #[error("form not found: {0}")]
    NotFound(Slug),

    /// The form exists but the caller does not own it.
    #[error("not the owner of form {0}")]
    Forbidden(Slug),

    /// The submitted attributes were rejected.
    #[error("validation failed: {0}")]
    Validation(#[from] CoreError),

    /// The storage step failed; nothing was applied.
    #[error("operation failed: {0}")]
    Operation(#[from] StoreError),
}
