use serde::{Deserialize, Serialize};

use crate::id::PrincipalId;

/// An authenticated actor making a request.
///
/// Produced only by successful identity resolution; this crate never
/// constructs one from unverified input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Principal {
    /// Identity-service id of the actor.
    pub id: PrincipalId,
}

impl Principal {
    /// Creates a principal for the given id.
    #[must_use]
    pub fn new(id: PrincipalId) -> Self {
        Self { id }
    }
}
