//! # Gatehouse
//!
//! Boundary validation and sanitization for axum services: everything a
//! request carries is checked, scanned and cleaned before a handler sees it.
//!
//! ## Features
//!
//! - **One verdict per request**: method gate, size gate, body decoding,
//!   injection scan, sanitization and schema checks fold into a single
//!   [`ValidationResult`](fault::ValidationResult)
//! - **Content-type aware bodies**: JSON, urlencoded and multipart decode
//!   into one normalized tree, with zero-copy file handles
//! - **Injection scanning**: SQL, XSS, path traversal and shell patterns
//!   reported per field path
//! - **Sink-specific sanitizers**: HTML allow-listing, plain text, file
//!   names, URLs and search queries
//! - **Schemas three ways**: declarative field rules, serde types, or plain
//!   closures
//! - **Handler integration**: the [`Vetted`](pipeline::Vetted) extractor runs
//!   the pipeline per route
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gatehouse::prelude::*;
//! use std::sync::{Arc, OnceLock};
//!
//! struct CreateUser;
//!
//! impl GuardedRoute for CreateUser {
//!     fn validation_config() -> Arc<ValidationConfig> {
//!         static CONFIG: OnceLock<Arc<ValidationConfig>> = OnceLock::new();
//!         Arc::clone(CONFIG.get_or_init(|| {
//!             Arc::new(presets::create(
//!                 FieldRules::new()
//!                     .field("name", Rule::Required)
//!                     .field("name", Rule::MinLength(2))
//!                     .field("email", Rule::Email),
//!             ))
//!         }))
//!     }
//! }
//!
//! async fn create_user(vetted: Vetted<CreateUser>) -> impl IntoResponse {
//!     let body = vetted.body().cloned().unwrap_or_default();
//!     // body passed the schema, carries no injection patterns, and its
//!     // strings are sanitized for HTML sinks.
//!     Json(body)
//! }
//! ```

pub mod body;
pub mod fault;
pub mod pipeline;
pub mod sanitize;
pub mod scan;
pub mod schema;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Verdicts ===
    pub use crate::fault::{Target, ValidatedData, ValidationFault, ValidationResult};

    // === Pipeline ===
    pub use crate::pipeline::{GuardedRoute, ValidationConfig, Vetted, presets, validate};

    // === Body decoding ===
    pub use crate::body::{BodyValue, ContentKind, FileRef};

    // === Scanning ===
    pub use crate::scan::{Finding, ThreatCategory, scan, scan_json};

    // === Sanitization ===
    pub use crate::sanitize::{
        HtmlOptions, SafeHtml, create_safe_html, safe_highlight, sanitize_file_name,
        sanitize_html, sanitize_object, sanitize_search_query, sanitize_text, sanitize_url,
    };

    // === Schemas ===
    pub use crate::schema::{FieldRules, Rule, Schema, SchemaIssue, TypedSchema, ValueKind};

    // === External dependencies ===
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{Value, json};

    // === Axum ===
    pub use axum::{
        Json,
        http::{Method, StatusCode},
        response::IntoResponse,
    };
}
