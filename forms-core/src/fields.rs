//! Free-form attributes submitted for forms and questions.
//!
//! The API treats titles, descriptions and the like as pass-through data.
//! Only `title` and the `enabled` flag are interpreted; keys owned by the
//! system are dropped on the way in so a payload can never overwrite them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;

/// Keys that are never stored as free-form fields.
pub const RESERVED_KEYS: &[&str] = &[
    "id",
    "slug",
    "owner_id",
    "enabled",
    "enable",
    "questions",
    "form_id",
    "position",
    "created_at",
    "updated_at",
];

/// Maximum length of a title, in characters.
pub const MAX_TITLE_LEN: usize = 255;

const ENABLED_KEYS: [&str; 2] = ["enabled", "enable"];

/// Ordered mapping of pass-through attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fields(Map<String, Value>);

impl Fields {
    /// Creates an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the `title` field when it is a string.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.0.get("title").and_then(Value::as_str)
    }

    /// Number of stored attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no attributes are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overwrites existing keys and appends new ones, keeping insertion order.
    pub fn merge(&mut self, other: Fields) {
        for (key, value) in other.0 {
            self.0.insert(key, value);
        }
    }

    /// Iterates over the stored attributes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

/// Attributes parsed from a create or update request body.
#[derive(Debug, Clone, Default, PartialEq)]
#[non_exhaustive]
pub struct Submission {
    /// Requested visibility, if the caller supplied one.
    pub enabled: Option<bool>,
    /// Pass-through attributes with reserved keys removed.
    pub fields: Fields,
    submitted: usize,
}

impl Submission {
    /// Parses a submitted JSON object.
    ///
    /// Reserved keys are discarded. `enabled` (or its alias `enable`) is
    /// extracted and must be a boolean.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidField`] if `enabled` is not a boolean.
    pub fn parse(map: Map<String, Value>) -> Result<Self, CoreError> {
        let submitted = map.len();
        let mut enabled = None;
        let mut fields = Map::new();

        for (key, value) in map {
            if ENABLED_KEYS.contains(&key.as_str()) {
                let Value::Bool(flag) = value else {
                    return Err(CoreError::InvalidField {
                        field: "enabled",
                        reason: "must be a boolean".to_owned(),
                    });
                };
                enabled = Some(flag);
                continue;
            }
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            fields.insert(key, value);
        }

        Ok(Self { enabled, fields: Fields(fields), submitted })
    }

    /// Returns `true` if the caller submitted no keys at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.submitted == 0
    }

    /// Checks the rules for creating a new `resource` (`"form"` or `"question"`).
    ///
    /// # Errors
    /// Returns [`CoreError::EmptyAttributes`] for an empty mapping,
    /// [`CoreError::MissingField`] without a title, or
    /// [`CoreError::InvalidField`] for a malformed title.
    pub fn validate_new(&self, resource: &'static str) -> Result<(), CoreError> {
        if self.is_empty() {
            return Err(CoreError::EmptyAttributes { resource });
        }
        match self.fields.get("title") {
            Some(title) => validate_title(title),
            None => Err(CoreError::MissingField { field: "title" }),
        }
    }

    /// Checks the rules for updating an existing form.
    ///
    /// # Errors
    /// Returns [`CoreError::EmptyAttributes`] for an empty mapping, or
    /// [`CoreError::InvalidField`] if a submitted title is malformed.
    pub fn validate_update(&self) -> Result<(), CoreError> {
        if self.is_empty() {
            return Err(CoreError::EmptyAttributes { resource: "form" });
        }
        if let Some(title) = self.fields.get("title") {
            validate_title(title)?;
        }
        Ok(())
    }
}

fn validate_title(value: &Value) -> Result<(), CoreError> {
    let Some(title) = value.as_str() else {
        return Err(CoreError::InvalidField { field: "title", reason: "must be a string".to_owned() });
    };
    if title.trim().is_empty() {
        return Err(CoreError::InvalidField { field: "title", reason: "must not be blank".to_owned() });
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(CoreError::InvalidField {
            field: "title",
            reason: format!("must be at most {MAX_TITLE_LEN} characters"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected a JSON object, got {other}"),
        }
    }

    fn parse(value: Value) -> Submission {
        match Submission::parse(object(value)) {
            Ok(s) => s,
            Err(e) => panic!("unexpected parse error: {e}"),
        }
    }

    #[test]
    fn submission_drops_reserved_keys() {
        let s = parse(json!({
            "id": "x", "slug": "mine", "owner_id": "eve", "questions": [],
            "title": "T", "description": "D"
        }));
        assert_eq!(s.fields.len(), 2, "only title and description survive");
        assert_eq!(s.fields.title(), Some("T"));
        assert!(s.fields.get("slug").is_none(), "slug must never be stored as a field");
    }

    #[test]
    fn submission_extracts_enabled_and_alias() {
        assert_eq!(parse(json!({"title": "T", "enabled": false})).enabled, Some(false));
        assert_eq!(parse(json!({"title": "T", "enable": true})).enabled, Some(true));
        assert_eq!(parse(json!({"title": "T"})).enabled, None);
    }

    #[test]
    fn submission_rejects_non_boolean_enabled() {
        let err = Submission::parse(object(json!({"enabled": "yes"})));
        assert!(
            matches!(err, Err(CoreError::InvalidField { field: "enabled", .. })),
            "string enabled must be rejected, got {err:?}"
        );
    }

    #[test]
    fn validate_new_requires_non_empty_mapping() {
        let s = parse(json!({}));
        assert_eq!(s.validate_new("form"), Err(CoreError::EmptyAttributes { resource: "form" }));
    }

    #[test]
    fn validate_new_requires_title() {
        let s = parse(json!({"description": "D"}));
        assert_eq!(s.validate_new("form"), Err(CoreError::MissingField { field: "title" }));
    }

    #[test]
    fn validate_new_rejects_blank_and_oversized_titles() {
        assert!(parse(json!({"title": "   "})).validate_new("form").is_err());
        assert!(parse(json!({"title": 7})).validate_new("form").is_err());
        let long = "x".repeat(MAX_TITLE_LEN + 1);
        assert!(parse(json!({"title": long})).validate_new("form").is_err());
        let max = "x".repeat(MAX_TITLE_LEN);
        assert!(parse(json!({"title": max})).validate_new("form").is_ok());
    }

    #[test]
    fn validate_update_allows_partial_mapping() {
        assert!(parse(json!({"description": "new"})).validate_update().is_ok());
        assert!(parse(json!({"enabled": false})).validate_update().is_ok());
        assert!(parse(json!({"title": ""})).validate_update().is_err());
        assert!(parse(json!({})).validate_update().is_err());
    }

    #[test]
    fn fields_merge_overwrites_and_appends() {
        let mut base = parse(json!({"title": "old", "description": "D"})).fields;
        base.merge(parse(json!({"title": "new", "kind": "survey"})).fields);
        let keys: Vec<&str> = base.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["title", "description", "kind"]);
        assert_eq!(base.title(), Some("new"));
    }
}
