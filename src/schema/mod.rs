//! Structural validation of decoded request data.
//!
//! A [`Schema`] inspects a JSON value and either accepts it (possibly
//! transformed) or reports every problem it found. Validation is total per
//! call: all issues come back at once, so clients fix a payload in one round
//! trip instead of replaying it per field.
//!
//! Three ways to get a schema:
//! - [`FieldRules`] for declarative per-field rules,
//! - [`TypedSchema`] to validate by deserializing into a serde type,
//! - any `Fn(&Value) -> Result<Value, Vec<SchemaIssue>>` closure for
//!   everything else.

mod rules;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;

pub use rules::{FieldRules, Rule, ValueKind};

/// One problem found during validation. `path` is `key.nested[index]`
/// relative to the validated value, or `$` for whole-value issues.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SchemaIssue {
    pub path: String,
    pub message: String,
}

impl SchemaIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A structure check over decoded data.
///
/// `parse` returns the accepted value so a schema may normalize while
/// validating (defaults, coercions); most implementations return the input
/// unchanged. On failure it reports every issue, not just the first.
pub trait Schema: Send + Sync {
    fn parse(&self, value: &Value) -> Result<Value, Vec<SchemaIssue>>;
}

/// Ad-hoc schemas from closures.
impl<F> Schema for F
where
    F: Fn(&Value) -> Result<Value, Vec<SchemaIssue>> + Send + Sync,
{
    fn parse(&self, value: &Value) -> Result<Value, Vec<SchemaIssue>> {
        self(value)
    }
}

/// Validates by round-tripping through a serde type: the value must
/// deserialize into `T`, and the accepted value is `T` re-serialized. Extra
/// fields and representation quirks are normalized away by the type itself.
pub struct TypedSchema<T> {
    // fn() -> T instead of T keeps the schema Send + Sync without requiring
    // it of T.
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedSchema<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for TypedSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Schema for TypedSchema<T>
where
    T: DeserializeOwned + Serialize,
{
    fn parse(&self, value: &Value) -> Result<Value, Vec<SchemaIssue>> {
        let typed: T = serde_json::from_value(value.clone())
            .map_err(|e| vec![SchemaIssue::new("$", e.to_string())])?;
        serde_json::to_value(&typed)
            .map_err(|e| vec![SchemaIssue::new("$", format!("reserialization failed: {e}"))])
    }
}

// =============================================================================
// Tests
// =============================================================================
