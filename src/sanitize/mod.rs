//! Output-focused sanitization
//!
//! Where the scanner (see [`crate::scan`]) only reports, this module rewrites:
//! given hostile input it returns a safe value instead of an error. Every
//! function here is pure, total and deterministic.
//!
//! Sinks get dedicated entry points — [`sanitize_html`] for rich text,
//! [`sanitize_text`] for plain text, [`sanitize_file_name`] for disk paths,
//! [`sanitize_url`] for links, [`sanitize_search_query`] for search backends.
//! [`sanitize_object`] applies the HTML-context default across a whole JSON
//! tree.

mod html;
mod text;
mod url;

use serde_json::{Map, Value};

use crate::body::BodyValue;

pub use html::{HtmlOptions, SafeHtml, create_safe_html, safe_highlight, sanitize_html};
pub use text::{sanitize_file_name, sanitize_search_query, sanitize_text};
pub use self::url::{MAX_URL_LENGTH, sanitize_url};

/// How far [`sanitize_object`] descends by default.
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// Recursively sanitizes a JSON tree for an HTML sink: string values go
/// through [`sanitize_html`] with default options, object keys through
/// [`sanitize_text`]. Numbers, booleans and null pass through.
///
/// Descent stops at `max_depth` container levels; a string reached at the
/// limit is still sanitized, but containers past it are returned unchanged
/// rather than walked, so adversarial nesting costs nothing extra. Use
/// [`DEFAULT_MAX_DEPTH`] unless the payload shape demands otherwise.
pub fn sanitize_object(value: &Value, max_depth: usize) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_html(s, &HtmlOptions::default())),
        Value::Array(items) if max_depth > 0 => Value::Array(
            items
                .iter()
                .map(|item| sanitize_object(item, max_depth - 1))
                .collect(),
        ),
        Value::Object(map) if max_depth > 0 => {
            let mut out = Map::new();
            for (key, item) in map {
                out.insert(
                    sanitize_text(key, None),
                    sanitize_object(item, max_depth - 1),
                );
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

/// [`sanitize_object`] over a parsed body tree. File parts pass through
/// untouched; sanitization applies to text fields, not upload content.
pub(crate) fn sanitize_body_value(value: &BodyValue, max_depth: usize) -> BodyValue {
    match value {
        BodyValue::String(s) => BodyValue::String(sanitize_html(s, &HtmlOptions::default())),
        BodyValue::Array(items) if max_depth > 0 => BodyValue::Array(
            items
                .iter()
                .map(|item| sanitize_body_value(item, max_depth - 1))
                .collect(),
        ),
        BodyValue::Object(map) if max_depth > 0 => BodyValue::Object(
            map.iter()
                .map(|(key, item)| {
                    (sanitize_text(key, None), sanitize_body_value(item, max_depth - 1))
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

// =============================================================================
// Tests
// =============================================================================
