//! Error taxonomy shared by all fetchers.
//!
//! Backend failures map to a uniform notification shape the views can
//! display: a `{field, message}` list for inline validation errors plus
//! one generic toast line.

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use cineclub_core::CoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not logged in")]
    NotLoggedIn,

    /// The session was dropped (401 or failed refresh). The caller must
    /// send the user back to login.
    #[error("session expired, please log in again")]
    AuthRequired,

    #[error("{}", .message.as_deref().unwrap_or("validation failed"))]
    Validation {
        errors: Vec<FieldError>,
        message: Option<String>,
    },

    #[error("request failed ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ApiError {
    /// Reject a form value before any request is sent.
    pub fn rejected(field: &str, message: &str) -> Self {
        ApiError::Validation {
            errors: vec![FieldError {
                field: field.into(),
                message: message.into(),
            }],
            message: None,
        }
    }

    /// Per-field validation messages, for inline display next to inputs.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            ApiError::Validation { errors, .. } => errors,
            _ => &[],
        }
    }

    /// One-line user-visible message (the toast).
    pub fn toast(&self) -> String {
        match self {
            ApiError::Validation {
                message: Some(m), ..
            } => m.clone(),
            ApiError::Validation { errors, .. } => errors
                .first()
                .map(|e| format!("{}: {}", e.field, e.message))
                .unwrap_or_else(|| "validation failed".into()),
            ApiError::Network(_) => "connection failed, please try again".into(),
            other => other.to_string(),
        }
    }

    /// Map a non-2xx response body to the taxonomy. DRF sends per-field
    /// lists (`{"email": ["msg"]}`) plus `non_field_errors`, `detail`
    /// or `error` for generic text.
    pub fn from_body(status: StatusCode, body: &Value) -> Self {
        let mut errors = Vec::new();
        let mut message = None;

        if let Some(map) = body.as_object() {
            for (key, value) in map {
                match key.as_str() {
                    "non_field_errors" => {
                        if let Some(first) = first_string(value) {
                            message = Some(first);
                        }
                    }
                    "detail" | "error" | "message" => {
                        if message.is_none() {
                            message = value.as_str().map(String::from);
                        }
                    }
                    _ => {
                        if let Some(first) = first_string(value) {
                            errors.push(FieldError {
                                field: key.clone(),
                                message: first,
                            });
                        }
                    }
                }
            }
        }

        if !errors.is_empty() {
            ApiError::Validation { errors, message }
        } else if status == StatusCode::BAD_REQUEST && message.is_some() {
            ApiError::Validation {
                errors: Vec::new(),
                message,
            }
        } else {
            ApiError::Status {
                status: status.as_u16(),
                message: message.unwrap_or_else(|| format!("request failed ({status})")),
            }
        }
    }
}

fn first_string(value: &Value) -> Option<String> {
    value
        .as_array()
        .and_then(|a| a.first())
        .and_then(|v| v.as_str())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_lists_become_field_errors() {
        let body = json!({
            "email": ["enter a valid email"],
            "password": ["too short"],
            "non_field_errors": ["invalid credentials"],
        });
        let err = ApiError::from_body(StatusCode::BAD_REQUEST, &body);
        let fields = err.field_errors();
        assert_eq!(fields.len(), 2);
        assert!(fields
            .iter()
            .any(|f| f.field == "email" && f.message == "enter a valid email"));
        assert_eq!(err.toast(), "invalid credentials");
    }

    #[test]
    fn detail_only_body_is_a_status_error() {
        let body = json!({ "detail": "not found" });
        let err = ApiError::from_body(StatusCode::NOT_FOUND, &body);
        match err {
            ApiError::Status { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "not found");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn error_key_with_bad_request_is_validation() {
        let body = json!({ "error": "Nota deve estar entre 0 e 10" });
        let err = ApiError::from_body(StatusCode::BAD_REQUEST, &body);
        match &err {
            ApiError::Validation { message, errors } => {
                assert!(errors.is_empty());
                assert_eq!(message.as_deref(), Some("Nota deve estar entre 0 e 10"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_body_falls_back_to_status_line() {
        let err = ApiError::from_body(StatusCode::INTERNAL_SERVER_ERROR, &Value::Null);
        match err {
            ApiError::Status { status, .. } => assert_eq!(status, 500),
            other => panic!("unexpected {other:?}"),
        }
    }
}
