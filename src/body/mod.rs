//! Content-type-dispatched request body decoding
//!
//! A request body is decoded into a [`BodyValue`] tree according to its
//! declared `Content-Type`, resolved once into a [`ContentKind`] variant.
//! Decoding never panics: every malformed payload becomes a [`BodyError`]
//! that the pipeline folds into a single validation fault.
//!
//! File parts are never buffered separately: a [`FileRef`] holds a zero-copy
//! [`Bytes`] slice of the one size-capped body buffer, so validating
//! unrelated fields never touches file content.

mod form;
mod multipart;

use bytes::Bytes;
use indexmap::IndexMap;
use serde_json::{Map, Number, Value};
use std::fmt;

pub(crate) use form::{pairs_to_json, parse_pairs};
pub(crate) use multipart::MAX_MULTIPART_PARTS;

/// How the body will be decoded, resolved from the `Content-Type` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentKind {
    Json,
    Multipart { boundary: String },
    UrlEncoded,
    /// Missing or unrecognized content type: decodes to an empty object so
    /// downstream indexing stays uniform.
    Empty,
}

impl ContentKind {
    /// Dispatches on the declared content type. Unknown types are [`Empty`],
    /// not an error; only a multipart declaration without a boundary fails.
    ///
    /// [`Empty`]: ContentKind::Empty
    pub fn from_header(content_type: Option<&str>) -> Result<Self, BodyError> {
        let Some(raw) = content_type else {
            return Ok(ContentKind::Empty);
        };

        // Parameters (charset etc.) do not affect dispatch.
        let essence = raw.split(';').next().unwrap_or("").trim().to_ascii_lowercase();

        match essence.as_str() {
            "application/json" => Ok(ContentKind::Json),
            "application/x-www-form-urlencoded" => Ok(ContentKind::UrlEncoded),
            "multipart/form-data" => match multipart::extract_boundary(raw) {
                Some(boundary) => Ok(ContentKind::Multipart { boundary }),
                None => Err(BodyError::NoBoundary),
            },
            _ => Ok(ContentKind::Empty),
        }
    }
}

/// Why a body could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no boundary parameter in Content-Type")]
    NoBoundary,

    #[error("invalid multipart format")]
    InvalidMultipart,

    #[error("too many multipart parts (max: {MAX_MULTIPART_PARTS})")]
    TooManyParts,

    #[error("request body is not valid UTF-8")]
    NotUtf8,
}

/// An uploaded file: metadata plus a lazy content handle.
///
/// `content` is a ref-counted slice of the request's single body buffer;
/// cloning and passing it around copies nothing.
#[derive(Clone, PartialEq, Eq)]
pub struct FileRef {
    pub file_name: String,
    pub size: usize,
    pub content_type: Option<String>,
    content: Bytes,
}

impl FileRef {
    pub(crate) fn new(file_name: String, content_type: Option<String>, content: Bytes) -> Self {
        Self {
            file_name,
            size: content.len(),
            content_type,
            content,
        }
    }

    /// The file bytes. Cheap: this clones a handle, not the content.
    pub fn content(&self) -> Bytes {
        self.content.clone()
    }
}

impl fmt::Debug for FileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never dump file content into logs.
        f.debug_struct("FileRef")
            .field("file_name", &self.file_name)
            .field("size", &self.size)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Normalized body tree: JSON-shaped, with ordered objects and first-class
/// file parts.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<BodyValue>),
    Object(IndexMap<String, BodyValue>),
    File(FileRef),
}

impl BodyValue {
    pub fn empty_object() -> Self {
        BodyValue::Object(IndexMap::new())
    }

    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => BodyValue::Null,
            Value::Bool(b) => BodyValue::Bool(b),
            Value::Number(n) => BodyValue::Number(n),
            Value::String(s) => BodyValue::String(s),
            Value::Array(items) => {
                BodyValue::Array(items.into_iter().map(BodyValue::from_json).collect())
            }
            Value::Object(map) => BodyValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, BodyValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Projects the tree into plain JSON for schema validation. File parts
    /// become their metadata, so schemas can check uploads without the
    /// pipeline ever walking file content.
    pub fn to_json(&self) -> Value {
        match self {
            BodyValue::Null => Value::Null,
            BodyValue::Bool(b) => Value::Bool(*b),
            BodyValue::Number(n) => Value::Number(n.clone()),
            BodyValue::String(s) => Value::String(s.clone()),
            BodyValue::Array(items) => Value::Array(items.iter().map(BodyValue::to_json).collect()),
            BodyValue::Object(map) => {
                let mut out = Map::new();
                for (k, v) in map {
                    out.insert(k.clone(), v.to_json());
                }
                Value::Object(out)
            }
            BodyValue::File(file) => serde_json::json!({
                "file_name": file.file_name,
                "size": file.size,
                "content_type": file.content_type,
            }),
        }
    }
}

/// Decodes the buffered body bytes according to the resolved [`ContentKind`].
pub fn parse_body(kind: &ContentKind, bytes: &Bytes) -> Result<BodyValue, BodyError> {
    match kind {
        ContentKind::Json => {
            let value: Value = serde_json::from_slice(bytes)?;
            Ok(BodyValue::from_json(value))
        }
        ContentKind::Multipart { boundary } => {
            let fields = multipart::parse_multipart(bytes, boundary)?;
            let mut out: IndexMap<String, BodyValue> = IndexMap::new();
            for field in fields {
                let value = match field.file_name {
                    Some(file_name) => BodyValue::File(FileRef::new(
                        file_name,
                        field.content_type,
                        field.content,
                    )),
                    // Non-file fields become strings; lossy decoding keeps a
                    // hostile part from aborting the whole parse.
                    None => BodyValue::String(
                        String::from_utf8_lossy(&field.content).into_owned(),
                    ),
                };
                insert_coalescing(&mut out, &field.name, value);
            }
            Ok(BodyValue::Object(out))
        }
        ContentKind::UrlEncoded => {
            let text = std::str::from_utf8(bytes).map_err(|_| BodyError::NotUtf8)?;
            let mut out: IndexMap<String, BodyValue> = IndexMap::new();
            for (key, value) in parse_pairs(text) {
                insert_coalescing(&mut out, &key, BodyValue::String(value));
            }
            Ok(BodyValue::Object(out))
        }
        ContentKind::Empty => Ok(BodyValue::empty_object()),
    }
}

/// `name[]` keys coalesce into one ordered array under `name`, preserving
/// submission order. Plain repeated keys keep the last value.
fn insert_coalescing(map: &mut IndexMap<String, BodyValue>, key: &str, value: BodyValue) {
    if let Some(base) = key.strip_suffix("[]") {
        match map.get_mut(base) {
            Some(BodyValue::Array(items)) => items.push(value),
            _ => {
                map.insert(base.to_string(), BodyValue::Array(vec![value]));
            }
        }
    } else {
        map.insert(key.to_string(), value);
    }
}

// =============================================================================
// Tests
// =============================================================================
