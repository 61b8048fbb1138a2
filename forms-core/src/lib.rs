//! Core types for the forms API.
//!
//! Defines forms, questions, principals and their identifiers, the parsing
//! of submitted attributes, and the visibility and ownership rules that
//! decide whether a request may see or change a form.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod fields;
pub mod form;
pub mod id;
pub mod policy;
pub mod principal;

pub use error::CoreError;
pub use fields::{Fields, Submission};
pub use form::{Form, FormDetail, Question};
pub use id::{FormId, PrincipalId, QuestionId, Slug};
pub use policy::{authorize_mutation, is_visible_to, ListScope, MutationAccess};
pub use principal::Principal;
