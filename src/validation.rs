//! Declarative field validation for incoming JSON documents.
//!
//! Every resource describes its fields once as a [`Schema`]: a list of
//! named fields, each with an ordered list of [`Rule`]s. Normalising rules
//! (`Trim`, `Lowercase`) rewrite the value in place; checking rules record a
//! message. Evaluation never stops at the first bad field, so a client gets
//! the full list of problems in one response.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use validator::ValidateEmail;

/// A single validation or normalisation step for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// The field must be present (and not null) when creating a document.
    Required,
    /// The value must be a JSON string.
    Text,
    /// The value must be a JSON boolean.
    Boolean,
    /// The value must be a JSON integer.
    Integer,
    /// Strip leading and trailing whitespace.
    Trim,
    /// Lower-case the value.
    Lowercase,
    /// The string must not be empty.
    NonEmpty,
    /// The string must be a syntactically valid e-mail address.
    Email,
    /// The string must have at least this many characters.
    MinLength(usize),
    /// The string must not contain this substring, ignoring case.
    Forbids(&'static str),
    /// The integer must be zero or greater.
    NonNegative,
}

/// Rules for one named field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub rules: &'static [Rule],
}

/// Whether a document is being created or patched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// All `Required` fields must be present.
    Create,
    /// Only the fields present in the input are checked.
    Patch,
}

/// The full set of fields a resource accepts.
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub resource: &'static str,
    pub fields: &'static [FieldSpec],
}

/// Structured validation failure listing every violated field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    message: String,
    fields: BTreeMap<String, Vec<String>>,
}

impl Default for ValidationErrors {
    fn default() -> Self {
        Self {
            message: "Validation failed".to_string(),
            fields: BTreeMap::new(),
        }
    }
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// An error carrying one field and a specific top-level message.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut errors = Self {
            message: message.clone(),
            fields: BTreeMap::new(),
        };
        errors.add(field, message);
        errors
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn fields(&self) -> &BTreeMap<String, Vec<String>> {
        &self.fields
    }

    /// Whether a given field has at least one violation.
    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.fields.keys().map(String::as_str).collect();
        write!(f, "{}: {}", self.message, names.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Reject a patch whose keys are not all in `allowed`.
///
/// Nothing is written when this fails; an empty patch always passes.
pub fn ensure_updatable(
    input: &Map<String, Value>,
    allowed: &[&str],
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new().with_message("Invalid updates!");
    for key in input.keys() {
        if !allowed.contains(&key.as_str()) {
            errors.add(key, "is not an updatable field");
        }
    }
    errors.into_result()
}

impl Schema {
    /// Normalise `input` in place and check it against every field's rules.
    pub fn validate(&self, input: &mut Map<String, Value>, mode: Mode) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        for spec in self.fields {
            let required = spec.rules.contains(&Rule::Required);
            match input.get(spec.name) {
                None => {
                    if required && mode == Mode::Create {
                        errors.add(spec.name, "is required");
                    }
                    continue;
                }
                Some(Value::Null) => {
                    if required {
                        errors.add(spec.name, "is required");
                    } else {
                        input.remove(spec.name);
                    }
                    continue;
                }
                Some(_) => {}
            }

            if let Some(value) = input.get_mut(spec.name) {
                apply_rules(spec, value, &mut errors);
            }
        }

        if !errors.is_empty() {
            tracing::debug!("Rejected {} payload: {}", self.resource, errors);
        }
        errors.into_result()
    }

    /// Keep only the fields this schema knows about.
    ///
    /// Anything else in the payload (for example a client-supplied `owner`)
    /// is dropped before the document reaches storage.
    pub fn project(&self, input: Map<String, Value>) -> Map<String, Value> {
        input
            .into_iter()
            .filter(|(key, _)| self.fields.iter().any(|spec| spec.name == key))
            .collect()
    }
}

fn apply_rules(spec: &FieldSpec, value: &mut Value, errors: &mut ValidationErrors) {
    for rule in spec.rules {
        match rule {
            Rule::Required => {}
            Rule::Text => {
                if !value.is_string() {
                    errors.add(spec.name, "must be a string");
                    return;
                }
            }
            Rule::Boolean => {
                if !value.is_boolean() {
                    errors.add(spec.name, "must be a boolean");
                    return;
                }
            }
            Rule::Integer => {
                if value.as_i64().is_none() {
                    errors.add(spec.name, "must be an integer");
                    return;
                }
            }
            Rule::Trim => {
                if let Some(s) = value.as_str() {
                    *value = Value::String(s.trim().to_string());
                }
            }
            Rule::Lowercase => {
                if let Some(s) = value.as_str() {
                    *value = Value::String(s.to_lowercase());
                }
            }
            Rule::NonEmpty => {
                if value.as_str().is_some_and(str::is_empty) {
                    errors.add(spec.name, "must not be empty");
                }
            }
            Rule::Email => {
                if value.as_str().is_some_and(|s| !s.validate_email()) {
                    errors.add(spec.name, "must be a valid email address");
                }
            }
            Rule::MinLength(min) => {
                if value.as_str().is_some_and(|s| s.chars().count() < *min) {
                    errors.add(spec.name, format!("must be at least {} characters", min));
                }
            }
            Rule::Forbids(needle) => {
                if value
                    .as_str()
                    .is_some_and(|s| s.to_lowercase().contains(&needle.to_lowercase()))
                {
                    errors.add(spec.name, format!("must not contain '{}'", needle));
                }
            }
            Rule::NonNegative => {
                if value.as_i64().is_some_and(|n| n < 0) {
                    errors.add(spec.name, "must be a non-negative number");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE: Schema = Schema {
        resource: "sample",
        fields: &[
            FieldSpec {
                name: "name",
                rules: &[Rule::Required, Rule::Text, Rule::Trim, Rule::NonEmpty],
            },
            FieldSpec {
                name: "email",
                rules: &[Rule::Required, Rule::Text, Rule::Trim, Rule::Lowercase, Rule::Email],
            },
            FieldSpec {
                name: "secret",
                rules: &[Rule::Text, Rule::Trim, Rule::MinLength(7), Rule::Forbids("password")],
            },
            FieldSpec {
                name: "age",
                rules: &[Rule::Integer, Rule::NonNegative],
            },
        ],
    };

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_normalises_in_place() {
        let mut input = object(json!({"name": "  Ann ", "email": " Ann@X.com "}));
        SAMPLE.validate(&mut input, Mode::Create).unwrap();
        assert_eq!(input["name"], "Ann");
        assert_eq!(input["email"], "ann@x.com");
    }

    #[test]
    fn test_reports_every_violated_field() {
        let mut input = object(json!({
            "name": "   ",
            "email": "not-an-email",
            "secret": "MyPassWord1",
            "age": -3
        }));
        let errors = SAMPLE.validate(&mut input, Mode::Create).unwrap_err();
        assert!(errors.has("name"));
        assert!(errors.has("email"));
        assert!(errors.has("secret"));
        assert!(errors.has("age"));
        assert_eq!(errors.fields().len(), 4);
    }

    #[test]
    fn test_required_only_in_create_mode() {
        let mut input = Map::new();
        let errors = SAMPLE.validate(&mut input, Mode::Create).unwrap_err();
        assert!(errors.has("name"));
        assert!(errors.has("email"));
        assert!(!errors.has("age"));

        let mut input = Map::new();
        assert!(SAMPLE.validate(&mut input, Mode::Patch).is_ok());
    }

    #[test]
    fn test_null_required_field_rejected_in_patch() {
        let mut input = object(json!({"name": null}));
        let errors = SAMPLE.validate(&mut input, Mode::Patch).unwrap_err();
        assert!(errors.has("name"));
    }

    #[test]
    fn test_null_optional_field_is_dropped() {
        let mut input = object(json!({"name": "a", "email": "a@b.co", "age": null}));
        SAMPLE.validate(&mut input, Mode::Create).unwrap();
        assert!(!input.contains_key("age"));
    }

    #[test]
    fn test_min_length_measured_after_trim() {
        let mut input = object(json!({"secret": "  abc12  "}));
        let errors = SAMPLE.validate(&mut input, Mode::Patch).unwrap_err();
        assert!(errors.has("secret"));
    }

    #[test]
    fn test_type_mismatch_stops_field_rules() {
        let mut input = object(json!({"age": "thirty"}));
        let errors = SAMPLE.validate(&mut input, Mode::Patch).unwrap_err();
        assert_eq!(errors.fields()["age"], vec!["must be an integer".to_string()]);
    }

    #[test]
    fn test_ensure_updatable() {
        let patch = object(json!({"name": "x", "owner": "someone"}));
        let errors = ensure_updatable(&patch, &["name", "email"]).unwrap_err();
        assert_eq!(errors.message(), "Invalid updates!");
        assert!(errors.has("owner"));
        assert!(!errors.has("name"));

        assert!(ensure_updatable(&Map::new(), &["name"]).is_ok());
    }

    #[test]
    fn test_project_drops_unknown_fields() {
        let input = object(json!({"name": "a", "owner": "b", "tokens": []}));
        let projected = SAMPLE.project(input);
        assert_eq!(projected.len(), 1);
        assert!(projected.contains_key("name"));
    }
}
