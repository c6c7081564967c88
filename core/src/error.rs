//! Error types for the panel API client.
//!
//! # Design
//! `NotFound` gets a dedicated variant because callers frequently distinguish
//! "the resource does not exist" from "the panel rejected the request." When
//! the panel answers with its structured `{"errors": [...]}` body the entries
//! are kept in `Panel`; any other non-2xx response lands in `Http` with the
//! raw status code and body for debugging.
//!
//! A relation missing from a response is not an error. A relation that is
//! present but has the wrong shape surfaces as `Deserialization`.

use serde::Deserialize;

/// Errors returned by `PanelClient` and the decoding helpers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Client configuration is unusable (empty panel URL or API key).
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),

    /// The panel returned 404.
    #[error("resource not found")]
    NotFound,

    /// The panel returned a non-2xx status with its structured error body.
    #[error("panel returned HTTP {status}: {}", summarize(.errors))]
    Panel { status: u16, errors: Vec<PanelError> },

    /// The panel returned a non-2xx status with a body that is not an error
    /// document.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The response body did not have the expected envelope shape.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// An update descriptor carried no fields to send.
    #[error("no {0} fields specified")]
    MissingFields(&'static str),

    /// A query string could not be decoded.
    #[error("invalid query string: {0}")]
    InvalidQuery(String),
}

/// One entry of the panel's `errors` array.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PanelError {
    pub code: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub detail: String,
}

#[derive(Deserialize)]
pub(crate) struct PanelErrorBody {
    pub errors: Vec<PanelError>,
}

fn summarize(errors: &[PanelError]) -> String {
    errors
        .iter()
        .map(|e| {
            if e.detail.is_empty() {
                e.code.clone()
            } else {
                format!("{}: {}", e.code, e.detail)
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Deserialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_error_display_joins_entries() {
        let err = ApiError::Panel {
            status: 422,
            errors: vec![
                PanelError {
                    code: "ValidationException".to_string(),
                    status: "422".to_string(),
                    detail: "The email field is required.".to_string(),
                },
                PanelError {
                    code: "ValidationException".to_string(),
                    status: "422".to_string(),
                    detail: String::new(),
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "panel returned HTTP 422: ValidationException: The email field is required.; ValidationException"
        );
    }

    #[test]
    fn missing_fields_names_the_descriptor() {
        assert_eq!(
            ApiError::MissingFields("details").to_string(),
            "no details fields specified"
        );
    }
}
