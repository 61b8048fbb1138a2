//! Visibility and ownership rules for forms.
//!
//! Callers evaluate these only after the form is known to exist: an absent
//! slug is reported as not found before either rule runs.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::form::Form;
use crate::principal::Principal;

/// Whether `form` may be read by `principal` through a single-form lookup.
///
/// Only the enabled flag decides: a disabled form is hidden from every
/// reader, its owner included, and an enabled form is visible to anyone
/// who authenticated.
#[must_use]
pub fn is_visible_to(form: &Form, _principal: Option<&Principal>) -> bool {
    form.enabled
}

/// Outcome of an ownership check for update and delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationAccess {
    Allowed,
    Forbidden,
}

/// Allows a mutation iff `principal` owns `form`.
#[must_use]
pub fn authorize_mutation(principal: &Principal, form: &Form) -> MutationAccess {
    if form.owner_id == principal.id {
        MutationAccess::Allowed
    } else {
        MutationAccess::Forbidden
    }
}

/// Which of the caller's forms the list operation returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListScope {
    /// Every form the caller owns, disabled ones included.
    #[default]
    Owned,
    /// Only the caller's enabled forms.
    OwnedEnabled,
}

impl ListScope {
    /// Returns `true` if an owned `form` belongs in the listing.
    #[must_use]
    pub fn includes(self, form: &Form) -> bool {
        match self {
            Self::Owned => true,
            Self::OwnedEnabled => form.enabled,
        }
    }
}

impl FromStr for ListScope {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owned" => Ok(Self::Owned),
            "owned-enabled" => Ok(Self::OwnedEnabled),
            other => Err(CoreError::UnknownListScope { value: other.to_owned() }),
        }
    }
}

impl fmt::Display for ListScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Owned => f.write_str("owned"),
            Self::OwnedEnabled => f.write_str("owned-enabled"),
        }
    }
}
