/// Errors produced by the `forms-core` crate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum CoreError {
    /// The submitted attribute mapping carried no keys at all.
    #[error("no attributes submitted for {resource}")]
    EmptyAttributes { resource: &'static str },

    /// A field required for this operation was not submitted.
    #[error("missing required field '{field}'")]
    MissingField { field: &'static str },

    /// A submitted field failed validation.
    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// The request body was not a JSON object.
    #[error("malformed body: {reason}")]
    MalformedBody { reason: String },

    /// A list scope name did not match any known scope.
    #[error("unknown list scope '{value}': expected 'owned' or 'owned-enabled'")]
    UnknownListScope { value: String },
}

impl CoreError {
    /// Name of the offending field, reported back to the caller.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::EmptyAttributes { resource } => resource,
            Self::MissingField { field } | Self::InvalidField { field, .. } => field,
            Self::MalformedBody { .. } => "body",
            Self::UnknownListScope { .. } => "list_scope",
        }
    }
}
