//! Slug generation.
//!
//! The provider only proposes candidates. Uniqueness is enforced by the
//! store, which rejects a taken slug with
//! [`StoreError::SlugConflict`](crate::StoreError::SlugConflict).

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use forms_core::Slug;
use uuid::Uuid;

/// Random bytes drawn per slug; encodes to 16 URL-safe characters.
const SLUG_BYTES: usize = 12;

/// Source of candidate slugs for new forms.
pub trait SlugProvider: Send + Sync {
    /// Propose a fresh slug.
    fn generate(&self) -> Slug;
}

/// Generates random URL-safe base64 slugs.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSlugProvider;

impl RandomSlugProvider {
    /// Create a provider.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl SlugProvider for RandomSlugProvider {
    fn generate(&self) -> Slug {
        let bytes = Uuid::new_v4().into_bytes();
        Slug::new(URL_SAFE_NO_PAD.encode(&bytes[..SLUG_BYTES]))
    }
}
