//! Declarative per-field rules.
//!
//! [`FieldRules`] is the workhorse schema for handlers that do not want a
//! dedicated serde type: name a field by dotted path, attach rules, done.
//! Rules are checked in declaration order and every violation is reported.
//!
//! Rules are lenient about types: a string rule on a non-string field is
//! skipped rather than failed, so one field gets one kind of complaint. Add
//! an explicit [`Rule::TypeOf`] when the type itself must be enforced.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fmt;

use super::{Schema, SchemaIssue};

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")
        .unwrap_or_else(|e| panic!("invalid email pattern: {e}"))
});

/// JSON type names for [`Rule::TypeOf`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl ValueKind {
    fn matches(self, value: &Value) -> bool {
        match self {
            ValueKind::String => value.is_string(),
            ValueKind::Number => value.is_number(),
            ValueKind::Boolean => value.is_boolean(),
            ValueKind::Array => value.is_array(),
            ValueKind::Object => value.is_object(),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::Boolean => "boolean",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        };
        f.write_str(name)
    }
}

/// One constraint on one field.
#[derive(Debug, Clone)]
pub enum Rule {
    /// The field must be present and non-null. Every other rule is skipped
    /// for absent fields.
    Required,
    TypeOf(ValueKind),
    /// Char count lower bound, for strings.
    MinLength(usize),
    /// Char count upper bound, for strings.
    MaxLength(usize),
    MinValue(f64),
    MaxValue(f64),
    Pattern(Regex),
    OneOf(Vec<String>),
    Email,
    Uuid,
    Url,
    /// A `chrono` format string, e.g. `%Y-%m-%d`.
    DateFormat(&'static str),
}

impl Rule {
    /// `None` when the value satisfies (or is exempt from) the rule.
    fn check(&self, value: &Value) -> Option<String> {
        match self {
            // Presence is handled by the caller; a present value passes.
            Rule::Required => value.is_null().then(|| "is required".to_string()),
            Rule::TypeOf(kind) => {
                (!kind.matches(value)).then(|| format!("must be of type {kind}"))
            }
            Rule::MinLength(min) => {
                let s = value.as_str()?;
                (s.chars().count() < *min)
                    .then(|| format!("must be at least {min} characters"))
            }
            Rule::MaxLength(max) => {
                let s = value.as_str()?;
                (s.chars().count() > *max)
                    .then(|| format!("must be at most {max} characters"))
            }
            Rule::MinValue(min) => {
                let n = value.as_f64()?;
                (n < *min).then(|| format!("must be at least {min}"))
            }
            Rule::MaxValue(max) => {
                let n = value.as_f64()?;
                (n > *max).then(|| format!("must be at most {max}"))
            }
            Rule::Pattern(pattern) => {
                let s = value.as_str()?;
                (!pattern.is_match(s)).then(|| "has an invalid format".to_string())
            }
            Rule::OneOf(options) => {
                let s = value.as_str()?;
                (!options.iter().any(|o| o == s))
                    .then(|| format!("must be one of: {}", options.join(", ")))
            }
            Rule::Email => {
                let s = value.as_str()?;
                (!EMAIL.is_match(s)).then(|| "must be a valid email address".to_string())
            }
            Rule::Uuid => {
                let s = value.as_str()?;
                uuid::Uuid::parse_str(s)
                    .is_err()
                    .then(|| "must be a valid UUID".to_string())
            }
            Rule::Url => {
                let s = value.as_str()?;
                url::Url::parse(s)
                    .is_err()
                    .then(|| "must be a valid URL".to_string())
            }
            Rule::DateFormat(format) => {
                let s = value.as_str()?;
                let ok = chrono::NaiveDate::parse_from_str(s, format).is_ok()
                    || chrono::NaiveDateTime::parse_from_str(s, format).is_ok();
                (!ok).then(|| format!("must match date format {format}"))
            }
        }
    }
}

/// A schema built from `(path, rule)` entries.
///
/// ```
/// use gatehouse::schema::{FieldRules, Rule, ValueKind};
///
/// let schema = FieldRules::new()
///     .field("name", Rule::Required)
///     .field("name", Rule::MinLength(2))
///     .field("contact.email", Rule::Email)
///     .field("role", Rule::OneOf(vec!["admin".into(), "member".into()]));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FieldRules {
    rules: Vec<(String, Rule)>,
}

impl FieldRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, path: impl Into<String>, rule: Rule) -> Self {
        self.rules.push((path.into(), rule));
        self
    }
}

impl Schema for FieldRules {
    fn parse(&self, value: &Value) -> Result<Value, Vec<SchemaIssue>> {
        let mut issues = Vec::new();

        for (path, rule) in &self.rules {
            match lookup(value, path) {
                Some(field) => {
                    if let Some(message) = rule.check(field) {
                        issues.push(SchemaIssue::new(path.clone(), message));
                    }
                }
                None => {
                    if matches!(rule, Rule::Required) {
                        issues.push(SchemaIssue::new(path.clone(), "is required"));
                    }
                }
            }
        }

        if issues.is_empty() {
            Ok(value.clone())
        } else {
            Err(issues)
        }
    }
}

/// Resolves a `key.nested[index]` path against a JSON tree.
fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        let (name, indexes) = split_indexes(segment)?;
        if !name.is_empty() {
            current = current.get(name)?;
        }
        for index in indexes {
            current = current.get(index)?;
        }
    }
    Some(current)
}

/// `"tags[0][1]"` into `("tags", [0, 1])`. Malformed brackets resolve to no
/// field rather than a panic.
fn split_indexes(segment: &str) -> Option<(&str, Vec<usize>)> {
    let Some(bracket) = segment.find('[') else {
        return Some((segment, Vec::new()));
    };

    let name = &segment[..bracket];
    let mut indexes = Vec::new();
    let mut rest = &segment[bracket..];

    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let close = inner.find(']')?;
        indexes.push(inner[..close].parse().ok()?);
        rest = &inner[close + 1..];
    }

    Some((name, indexes))
}

// =============================================================================
// Tests
// =============================================================================
