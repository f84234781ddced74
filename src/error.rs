use serde_json::Value;
use std::collections::BTreeMap;

/// Field name -> message. Client-side validators and server 400 bodies both
/// land here so they render the same way.
pub type FieldErrors = BTreeMap<String, String>;

pub const NON_FIELD_ERRORS: &str = "non_field_errors";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Session expired, please sign in again")]
    Unauthorized,

    #[error("Request rejected: {}", summarize(.0))]
    Validation(FieldErrors),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Local storage error: {0}")]
    Store(String),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Store(format!("{:#}", err))
    }
}

impl ApiError {
    /// Field errors carried by the failure, if any.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            ApiError::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    /// Message for the `error`/`detail` keys DRF views return.
    pub fn detail(&self) -> Option<String> {
        match self {
            ApiError::Validation(errors) => ["error", "detail", NON_FIELD_ERRORS]
                .iter()
                .find_map(|k| errors.get(*k).cloned()),
            _ => None,
        }
    }
}

/// Flattens a DRF error body into `FieldErrors`.
///
/// `{"title": ["This field is required."]}` becomes `title -> "This field is
/// required."`; nested objects are keyed by their parent; anything that is
/// not an object falls back to a single generic entry.
pub fn parse_field_errors(body: &str) -> FieldErrors {
    let mut errors = FieldErrors::new();
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) if !map.is_empty() => {
            for (field, value) in map {
                if let Some(message) = first_message(&value) {
                    errors.insert(field, message);
                }
            }
        }
        _ => {}
    }
    if errors.is_empty() {
        errors.insert(
            NON_FIELD_ERRORS.to_string(),
            "An error occurred. Please check the form.".to_string(),
        );
    }
    errors
}

fn first_message(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(first_message),
        Value::Object(map) => map.values().find_map(first_message),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn summarize(errors: &FieldErrors) -> String {
    errors
        .iter()
        .map(|(k, v)| format!("{}: {}", k, v))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field_errors_drf_lists() {
        let errors = parse_field_errors(
            r#"{"title": ["This field is required."], "salary_min": ["A valid number is required."]}"#,
        );
        assert_eq!(errors.get("title").unwrap(), "This field is required.");
        assert_eq!(errors.get("salary_min").unwrap(), "A valid number is required.");
    }

    #[test]
    fn test_parse_field_errors_detail_string() {
        let errors = parse_field_errors(r#"{"detail": "You have already applied for this job."}"#);
        let err = ApiError::Validation(errors);
        assert_eq!(err.detail().as_deref(), Some("You have already applied for this job."));
    }

    #[test]
    fn test_parse_field_errors_unrecognized_shape() {
        for body in ["<html>Bad Request</html>", "[]", "{}", ""] {
            let errors = parse_field_errors(body);
            assert_eq!(errors.len(), 1);
            assert!(errors.contains_key(NON_FIELD_ERRORS));
        }
    }
}
