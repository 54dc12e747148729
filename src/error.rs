//! Error types for the caching layer
//!
//! Cache misses, capacity pressure and rate-limit denials are ordinary
//! outcomes and never show up here.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Error Enum ==
/// Unified error type for the caching layer and its admin API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Non-positive TTL, window, capacity or request budget
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Language tag other than `zh` or `en`
    #[error("Unsupported language: {0}")]
    InvalidLanguage(String),

    /// Malformed admin request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Nothing stored for the requested subject
    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Builds an `InvalidConfig` error for a parameter that must be positive.
    pub(crate) fn non_positive(field: &str) -> Self {
        Error::InvalidConfig(format!("{} must be greater than zero", field))
    }

    /// Builds an `InvalidConfig` error for a duration too large to express
    /// in milliseconds.
    pub(crate) fn out_of_range(field: &str) -> Self {
        Error::InvalidConfig(format!("{} is too large", field))
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::InvalidConfig(_) | Error::InvalidLanguage(_) | Error::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::NotFound(_) => StatusCode::NOT_FOUND,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the caching layer.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_positive_message() {
        let err = Error::non_positive("ttl_secs");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: ttl_secs must be greater than zero"
        );
    }

    #[test]
    fn test_error_status_codes() {
        let cases = vec![
            (Error::InvalidConfig("x".into()), StatusCode::BAD_REQUEST),
            (Error::InvalidLanguage("fr".into()), StatusCode::BAD_REQUEST),
            (Error::InvalidRequest("bad".into()), StatusCode::BAD_REQUEST),
            (Error::NotFound("u1".into()), StatusCode::NOT_FOUND),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
