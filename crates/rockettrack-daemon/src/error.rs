//! API error taxonomy and its HTTP mapping.
//!
//! The taxonomy is small and flat: validation failure, not-found,
//! processing reject, internal. Each error knows its status code and
//! renders as a `{code, message, details}` JSON body; data-driven
//! anomalies (a late gap-filler, a transition the state machine refuses)
//! travel through [`ApiError::Reject`] as 422, never as exceptions.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use rockettrack_core::{MessageKind, RejectReason};

use crate::wire::WireError;

/// Errors returned by the HTTP surface.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request failed field validation.
    #[error("validation error for field '{field}': {message}")]
    Validation {
        /// The offending field, in wire spelling.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// The requested rocket does not exist (or has not materialized yet).
    #[error("rocket not found: {0}")]
    NotFound(String),

    /// The engine rejected the message: it cannot take effect now and
    /// never will.
    #[error("message {message_number} on channel {channel} rejected")]
    Reject {
        /// Channel the message was addressed to.
        channel: String,
        /// The rejected message number.
        message_number: u64,
        /// The message kind.
        kind: MessageKind,
        /// Why the engine refused it.
        reason: RejectReason,
    },

    /// Unexpected failure; the request cannot be blamed.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// The HTTP status this error maps to.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Reject { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<WireError> for ApiError {
    fn from(err: WireError) -> Self {
        Self::Validation {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

/// JSON body for error responses.
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: u16,
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (message, details) = match &self {
            Self::Validation { .. } => ("request validation failed", Some(self.to_string())),
            Self::NotFound(id) => ("rocket not found", Some(format!("no rocket found with id: {id}"))),
            Self::Reject {
                channel,
                message_number,
                kind,
                reason,
            } => {
                let why = match reason {
                    RejectReason::StaleNumber => {
                        "message number is behind the reconciliation cursor"
                    },
                    RejectReason::FailedTransition => {
                        "the transition is not valid for the rocket's current state"
                    },
                };
                (
                    "message processing failed",
                    Some(format!(
                        "message {message_number} ({kind}) on channel {channel}: {why}"
                    )),
                )
            },
            Self::Internal(_) => ("internal server error", None),
        };

        let body = ErrorBody {
            code: status.as_u16(),
            message,
            details,
        };
        (status, Json(body)).into_response()
    }
}
