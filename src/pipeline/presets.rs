//! Ready-made configurations for the common route shapes.
//!
//! These encode the house defaults: mutation routes sanitize for HTML sinks,
//! uploads get a bigger cap without sanitization, and auth routes keep
//! passwords byte-for-byte intact.

use axum::http::Method;

use crate::schema::Schema;

use super::config::ValidationConfig;

/// POST with a body schema and HTML-context sanitization.
pub fn create(schema: impl Schema + 'static) -> ValidationConfig {
    ValidationConfig::new()
        .with_body_schema(schema)
        .with_sanitization()
        .with_allowed_methods(vec![Method::POST])
}

/// GET with no body handling at all.
pub fn read() -> ValidationConfig {
    ValidationConfig::new().with_allowed_methods(vec![Method::GET])
}

/// PUT/PATCH with a body schema and HTML-context sanitization.
pub fn update(schema: impl Schema + 'static) -> ValidationConfig {
    ValidationConfig::new()
        .with_body_schema(schema)
        .with_sanitization()
        .with_allowed_methods(vec![Method::PUT, Method::PATCH])
}

/// DELETE with no body handling.
pub fn delete() -> ValidationConfig {
    ValidationConfig::new().with_allowed_methods(vec![Method::DELETE])
}

/// Multipart uploads: 25 MiB cap, no sanitization so file bytes stay intact.
pub fn upload(schema: impl Schema + 'static) -> ValidationConfig {
    ValidationConfig::new()
        .with_body_schema(schema)
        .with_max_body_size(25 * 1024 * 1024)
        .with_allowed_methods(vec![Method::POST])
}

/// Credential submission: small cap, and never sanitization — a password is
/// checked, not rewritten.
pub fn auth(schema: impl Schema + 'static) -> ValidationConfig {
    ValidationConfig::new()
        .with_body_schema(schema)
        .with_max_body_size(64 * 1024)
        .with_allowed_methods(vec![Method::POST])
}
