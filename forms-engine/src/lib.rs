//! Storage seam and lifecycle service for the forms API.
//!
//! Locates forms by slug, applies the visibility and ownership rules from
//! `forms-core`, and runs every mutation inside a unit of work so a form
//! and its questions are always removed together.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod backend;
pub mod error;
pub mod lifecycle;
pub mod memory;
pub mod slug;

pub use backend::{FormStore, UnitOfWork};
pub use error::{EngineError, StoreError};
pub use lifecycle::{Attributes, FormService, Payload, MAX_SLUG_ATTEMPTS};
pub use memory::MemoryStore;
pub use slug::{RandomSlugProvider, SlugProvider};
