//! Validation of raw request input into typed DTOs.
//!
//! A DTO is any type that can be deserialized from JSON and checked with
//! [`validator::Validate`]. [`validate`] runs the whole pipeline:
//!
//! 1. field preprocessing and declared coercion (serde adapters in [`coerce`])
//! 2. structural parsing, enum membership and defaults (serde)
//! 3. per-field rules (`#[validate(...)]` attributes)
//!
//! Any failure yields a [`ValidationFailure`] whose issues use the JSON
//! (camelCase) field names.

use std::borrow::Cow;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Message carried by every validation failure.
pub const VALIDATION_FAILED: &str = "Validation failed";

/// A validated payload type.
///
/// Implemented automatically for every type that deserializes, validates and
/// serializes. The `Serialize` impl is the DTO's JSON projection.
pub trait Dto: DeserializeOwned + Validate + Serialize + Send + Sync + 'static {}

impl<T> Dto for T where T: DeserializeOwned + Validate + Serialize + Send + Sync + 'static {}

/// One problem found in the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Dotted path of the offending field; empty for the whole input.
    pub path: String,
    /// Machine-readable issue code (e.g. `too_small`, `invalid_url`).
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl ValidationIssue {
    /// Creates a new issue.
    #[must_use]
    pub fn new(
        path: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Input failed validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}: {} issue(s)", issues.len())]
pub struct ValidationFailure {
    /// Summary message.
    pub message: String,
    /// Structured per-field issues.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationFailure {
    /// Creates a failure with the standard message.
    #[must_use]
    pub fn new(issues: Vec<ValidationIssue>) -> Self {
        Self {
            message: VALIDATION_FAILED.to_string(),
            issues,
        }
    }

    /// Returns the issues reported for a field path.
    pub fn issues_for<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a ValidationIssue> {
        self.issues.iter().filter(move |issue| issue.path == path)
    }
}

/// Parses and validates raw input into `T`.
///
/// # Example
///
/// ```
/// use galleria_core::validate;
/// use serde::{Deserialize, Serialize};
/// use validator::Validate;
///
/// #[derive(Debug, Deserialize, Serialize, Validate)]
/// struct Rename {
///     #[validate(length(min = 1, message = "Name is required"))]
///     name: String,
/// }
///
/// let ok: Rename = validate(serde_json::json!({"name": "Trip"})).unwrap();
/// assert_eq!(ok.name, "Trip");
///
/// let err = validate::<Rename>(serde_json::json!({"name": ""})).unwrap_err();
/// assert_eq!(err.issues[0].path, "name");
/// ```
pub fn validate<T: Dto>(raw: serde_json::Value) -> Result<T, ValidationFailure> {
    let value: T = serde_path_to_error::deserialize(raw).map_err(|err| {
        let path = err.path().to_string();
        ValidationFailure::new(vec![issue_from_serde(&path, &err.inner().to_string())])
    })?;

    value
        .validate()
        .map_err(|errors| ValidationFailure::new(issues_from_validator(&errors)))?;

    Ok(value)
}

fn issue_from_serde(path: &str, message: &str) -> ValidationIssue {
    let path = if path == "." { "" } else { path };

    if let Some(field) = message
        .strip_prefix("missing field `")
        .and_then(|rest| rest.split('`').next())
    {
        return ValidationIssue::new(join_path(path, field), "required", "Required");
    }

    let code = if message.starts_with("unknown variant") {
        "invalid_enum_value"
    } else {
        "invalid_type"
    };
    ValidationIssue::new(path, code, message)
}

fn issues_from_validator(errors: &ValidationErrors) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    collect_issues("", errors, &mut issues);
    issues.sort_by(|a, b| a.path.cmp(&b.path));
    issues
}

fn collect_issues(prefix: &str, errors: &ValidationErrors, issues: &mut Vec<ValidationIssue>) {
    for (field, kind) in errors.errors() {
        let path = join_path(prefix, &camel_case(field));
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let message = error
                        .message
                        .as_ref()
                        .map_or_else(|| format!("Invalid value for {path}"), ToString::to_string);
                    issues.push(ValidationIssue::new(path.clone(), issue_code(error), message));
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_issues(&path, nested, issues),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_issues(&format!("{path}.{index}"), nested, issues);
                }
            }
        }
    }
}

// Maps validator rule names onto the issue codes clients see.
fn issue_code(error: &validator::ValidationError) -> String {
    let code: &str = &error.code;
    match code {
        "url" => "invalid_url".to_string(),
        "length" => "too_small".to_string(),
        "range" => {
            let value = error.params.get("value").and_then(serde_json::Value::as_f64);
            let max = error.params.get("max").and_then(serde_json::Value::as_f64);
            match (value, max) {
                (Some(value), Some(max)) if value > max => "too_big".to_string(),
                _ => "too_small".to_string(),
            }
        }
        other => other.to_string(),
    }
}

fn join_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

fn camel_case(field: &str) -> Cow<'_, str> {
    if !field.contains('_') {
        return Cow::Borrowed(field);
    }

    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for ch in field.chars() {
        if ch == '_' {
            upper = true;
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    Cow::Owned(out)
}

/// Serde adapters for preprocessing and coercing raw input.
///
/// Query string values arrive as strings; these adapters accept either the
/// native JSON type or its string form.
pub mod coerce {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        String(String),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        String(String),
    }

    /// Optional string where `""` becomes `None`.
    pub fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.filter(|s| !s.is_empty()))
    }

    /// Present-or-absent nullable string for partial updates.
    ///
    /// Use with `#[serde(default)]`: absent yields `None`, `null` or `""`
    /// yield `Some(None)`, anything else `Some(Some(value))`.
    pub fn nullable_string<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        empty_string_as_none(deserializer).map(Some)
    }

    /// Optional unsigned integer, accepting numeric strings.
    pub fn option_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<NumberOrString>::deserialize(deserializer)? {
            None => Ok(None),
            Some(NumberOrString::Number(n)) => u32::try_from(n)
                .map(Some)
                .map_err(|_| D::Error::custom("expected a positive integer")),
            Some(NumberOrString::String(s)) if s.is_empty() => Ok(None),
            Some(NumberOrString::String(s)) => s
                .trim()
                .parse::<u32>()
                .map(Some)
                .map_err(|_| D::Error::custom("expected a positive integer")),
        }
    }

    /// Boolean accepting `true`/`false`/`1`/`0` strings; absent is `false`.
    pub fn bool_or_string<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<BoolOrString>::deserialize(deserializer)? {
            None => Ok(false),
            Some(BoolOrString::Bool(b)) => Ok(b),
            Some(BoolOrString::String(s)) => match s.to_lowercase().as_str() {
                "true" | "1" => Ok(true),
                "false" | "0" | "" => Ok(false),
                _ => Err(D::Error::custom("expected a boolean")),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, Serialize, Validate)]
    #[serde(rename_all = "camelCase")]
    struct Profile {
        #[validate(length(min = 1, message = "Name is required"))]
        display_name: String,
        #[serde(default, deserialize_with = "coerce::empty_string_as_none")]
        #[validate(url(message = "Must be a valid URL"))]
        avatar_url: Option<String>,
        #[serde(default, deserialize_with = "coerce::option_u32")]
        #[validate(range(min = 1, max = 100, message = "Out of range"))]
        limit: Option<u32>,
        #[serde(default, deserialize_with = "coerce::bool_or_string")]
        archived: bool,
    }

    #[test]
    fn test_valid_input() {
        let profile: Profile = validate(json!({
            "displayName": "Ada",
            "avatarUrl": "https://example.com/a.png",
            "limit": "20",
            "archived": "true"
        }))
        .unwrap();

        assert_eq!(profile.display_name, "Ada");
        assert_eq!(profile.limit, Some(20));
        assert!(profile.archived);
    }

    #[test]
    fn test_empty_string_becomes_none() {
        let profile: Profile = validate(json!({"displayName": "Ada", "avatarUrl": ""})).unwrap();
        assert_eq!(profile.avatar_url, None);
    }

    #[test]
    fn test_rule_violations_use_json_names() {
        let failure = validate::<Profile>(json!({
            "displayName": "",
            "avatarUrl": "not a url"
        }))
        .unwrap_err();

        assert_eq!(failure.message, VALIDATION_FAILED);
        let paths: Vec<_> = failure.issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["avatarUrl", "displayName"]);
        assert_eq!(failure.issues_for("avatarUrl").next().unwrap().code, "invalid_url");
        assert_eq!(failure.issues_for("displayName").next().unwrap().message, "Name is required");
    }

    #[test]
    fn test_range_codes() {
        let too_big = validate::<Profile>(json!({"displayName": "a", "limit": 101})).unwrap_err();
        assert_eq!(too_big.issues[0].code, "too_big");

        let too_small = validate::<Profile>(json!({"displayName": "a", "limit": "0"})).unwrap_err();
        assert_eq!(too_small.issues[0].code, "too_small");
    }

    #[test]
    fn test_missing_field_is_required() {
        let failure = validate::<Profile>(json!({})).unwrap_err();
        assert_eq!(
            failure.issues,
            vec![ValidationIssue::new("displayName", "required", "Required")]
        );
    }

    #[test]
    fn test_coercion_failure_reports_path() {
        let failure = validate::<Profile>(json!({"displayName": "a", "limit": "ten"})).unwrap_err();
        assert_eq!(failure.issues[0].path, "limit");
        assert_eq!(failure.issues[0].code, "invalid_type");
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("cover_photo_url"), "coverPhotoUrl");
        assert_eq!(camel_case("name"), "name");
        assert_eq!(camel_case("sortBy"), "sortBy");
    }

    proptest! {
        #[test]
        fn prop_numeric_strings_coerce(limit in 1u32..=100) {
            let profile: Profile = validate(json!({"displayName": "a", "limit": limit.to_string()})).unwrap();
            prop_assert_eq!(profile.limit, Some(limit));
        }

        #[test]
        fn prop_limits_above_max_fail(limit in 101u32..10_000) {
            let failure = validate::<Profile>(json!({"displayName": "a", "limit": limit})).unwrap_err();
            prop_assert_eq!(failure.issues[0].code.as_str(), "too_big");
        }
    }
}
