//! Typed fault taxonomy and per-request verdicts
//!
//! Every way a request can fail validation is a [`ValidationFault`] variant,
//! and a whole request resolves to exactly one [`ValidationResult`]. Nothing
//! in this crate throws past the pipeline boundary: faults are collected in
//! step order and folded into the verdict, and the calling layer decides what
//! HTTP response a failed verdict becomes.
//!
//! Fault messages are stable: callers can relay them as field-level feedback
//! without re-deriving anything.

use axum::Json;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use std::fmt;

use crate::scan::ThreatCategory;

/// One of the four independently validated parts of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Target {
    Body,
    Query,
    Params,
    Headers,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Body => write!(f, "Body"),
            Target::Query => write!(f, "Query"),
            Target::Params => write!(f, "Params"),
            Target::Headers => write!(f, "Headers"),
        }
    }
}

/// A single reason a request failed validation.
///
/// Rendered messages follow a fixed format per variant; see [`fmt::Display`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationFault {
    /// The request method is not in the route's allow-list.
    MethodNotAllowed { method: Method },

    /// Declared or actual body size exceeds the configured cap.
    BodyTooLarge { limit: usize, declared: Option<u64> },

    /// The body could not be decoded for its declared content type.
    MalformedBody { message: String },

    /// A string leaf matched an injection-attack heuristic.
    SecurityFinding { category: ThreatCategory, path: String },

    /// A configured schema rejected the target's data.
    SchemaViolation {
        target: Target,
        path: String,
        message: String,
    },

    /// Anything unanticipated; the pipeline answers with a structured
    /// rejection instead of propagating the failure.
    Internal { message: String },
}

impl fmt::Display for ValidationFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationFault::MethodNotAllowed { method } => {
                write!(f, "Method {} not allowed", method)
            }
            ValidationFault::BodyTooLarge { limit, declared } => match declared {
                Some(declared) => write!(
                    f,
                    "Request body of {} bytes exceeds maximum size of {} bytes",
                    declared, limit
                ),
                None => write!(f, "Request body exceeds maximum size of {} bytes", limit),
            },
            ValidationFault::MalformedBody { message } => {
                write!(f, "Malformed request body: {}", message)
            }
            ValidationFault::SecurityFinding { category, path } => {
                write!(f, "Potential {} detected in {}", category, path)
            }
            ValidationFault::SchemaViolation {
                target,
                path,
                message,
            } => {
                write!(f, "{} validation: {} - {}", target, path, message)
            }
            ValidationFault::Internal { message } => {
                write!(f, "Validation error: {}", message)
            }
        }
    }
}

impl std::error::Error for ValidationFault {}

impl ValidationFault {
    /// The HTTP status a caller would typically map this fault to.
    ///
    /// The pipeline itself never picks a status; this is advisory for the
    /// axum-facing wrapper.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ValidationFault::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ValidationFault::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ValidationFault::MalformedBody { .. } => StatusCode::BAD_REQUEST,
            ValidationFault::SecurityFinding { .. } => StatusCode::BAD_REQUEST,
            ValidationFault::SchemaViolation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ValidationFault::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for programmatic handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            ValidationFault::MethodNotAllowed { .. } => "METHOD_NOT_ALLOWED",
            ValidationFault::BodyTooLarge { .. } => "BODY_TOO_LARGE",
            ValidationFault::MalformedBody { .. } => "MALFORMED_BODY",
            ValidationFault::SecurityFinding { .. } => "SECURITY_FINDING",
            ValidationFault::SchemaViolation { .. } => "SCHEMA_VIOLATION",
            ValidationFault::Internal { .. } => "INTERNAL_VALIDATION_FAULT",
        }
    }
}

// =============================================================================
// Verdict
// =============================================================================

/// Post-verdict data for the targets the route configured.
///
/// Targets without a configured schema stay `None`; business logic only ever
/// sees what passed through a schema.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct ValidatedData {
    pub body: Option<Value>,
    pub query: Option<Value>,
    pub params: Option<Value>,
    pub headers: Option<Value>,
}

/// The terminal, consumed-once outcome of validating one request.
///
/// Invariant: the verdict is valid if and only if no faults were collected,
/// and data is only present on a valid verdict. Both are enforced by the
/// constructors.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    data: Option<ValidatedData>,
    faults: Vec<ValidationFault>,
}

impl ValidationResult {
    /// A passing verdict carrying the post-validation data.
    pub fn valid(data: ValidatedData) -> Self {
        Self {
            data: Some(data),
            faults: Vec::new(),
        }
    }

    /// A failing verdict. Faults must be non-empty and keep step order.
    pub fn invalid(faults: Vec<ValidationFault>) -> Self {
        debug_assert!(!faults.is_empty(), "invalid verdict requires faults");
        Self { data: None, faults }
    }

    pub fn is_valid(&self) -> bool {
        self.faults.is_empty()
    }

    /// Faults in the order the pipeline steps ran.
    pub fn faults(&self) -> &[ValidationFault] {
        &self.faults
    }

    /// Rendered fault messages, suitable for relaying to clients verbatim.
    pub fn messages(&self) -> Vec<String> {
        self.faults.iter().map(ToString::to_string).collect()
    }

    pub fn data(&self) -> Option<&ValidatedData> {
        self.data.as_ref()
    }

    pub fn into_data(self) -> Option<ValidatedData> {
        self.data
    }
}

impl IntoResponse for ValidationResult {
    /// Maps a failed verdict to a client error carrying the messages
    /// verbatim. A valid verdict has no response shape of its own and maps
    /// to 204; callers normally consume the data instead.
    fn into_response(self) -> Response {
        if self.is_valid() {
            return StatusCode::NO_CONTENT.into_response();
        }

        let status = match self.faults.as_slice() {
            [single] => single.status_code(),
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        };

        let body = Json(serde_json::json!({
            "error": "Validation failed",
            "errors": self.messages(),
        }));

        (status, body).into_response()
    }
}

// =============================================================================
// Tests
// =============================================================================
