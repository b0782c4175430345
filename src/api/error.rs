//! HTTP Error Mapping
//!
//! Converts core errors into status codes and the `{success:false, error}`
//! body. Storage failures are logged here and never shown to the caller.

use crate::errors::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

/// Message returned for every storage failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Failure of an admin endpoint, already reduced to what the caller may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Input was rejected; carries the message shown to the caller
    Validation(String),
    /// The addressed machine does not exist
    NotFound(String),
    /// No unique slug could be settled
    Conflict(String),
    /// Database or blob store failure, already logged
    Storage,
    /// No admin user behind the request
    Unauthorized,
    /// CSRF token missing or wrong
    Forbidden,
    /// Known action sent with a method other than POST
    MethodNotAllowed,
    /// `action` missing or not one of the supported names
    UnknownAction,
}

impl ApiError {
    /// HTTP status for JSON-mode responses.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::UnknownAction => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short code used in the `err=` query flag of HTML-mode redirects.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "invalid",
            Self::NotFound(_) => "notfound",
            Self::Conflict(_) => "conflict",
            Self::Storage => "server",
            Self::Unauthorized => "auth",
            Self::Forbidden => "csrf",
            Self::MethodNotAllowed => "method",
            Self::UnknownAction => "action",
        }
    }

    /// Text placed in the `error` field of the JSON body.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(message) | Self::NotFound(message) | Self::Conflict(message) => {
                message
            }
            Self::Storage => INTERNAL_ERROR_MESSAGE,
            Self::Unauthorized => "Authentication required",
            Self::Forbidden => "Invalid CSRF token",
            Self::MethodNotAllowed => "Method not allowed",
            Self::UnknownAction => "Unsupported action",
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation { message } => Self::Validation(message),
            Error::MachineNotFound { .. } => Self::NotFound(err.to_string()),
            Error::SlugConflict { .. } => Self::Conflict(err.to_string()),
            other if other.is_storage() => {
                error!("Storage failure: {}", other);
                Self::Storage
            }
            other => {
                error!("Request failed: {}", other);
                Self::Storage
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(json!({ "success": false, "error": self.message() })),
        )
            .into_response()
    }
}
