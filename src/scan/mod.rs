//! Recursive injection-pattern scanner
//!
//! Walks an arbitrary value tree and reports a [`Finding`] for every string
//! leaf that resembles a known injection-attack pattern. The scanner is pure
//! and deterministic, performs no I/O, and never fails: a leaf it cannot
//! judge simply produces no finding. Policy lives with the caller — the
//! pipeline treats any finding as a hard failure, but the scanner itself only
//! reports.
//!
//! The heuristics are intentionally coarse (high recall, some false
//! positives). This is a defense-in-depth gate, not the sole defense;
//! downstream code must still use parameterized queries and output escaping.

mod patterns;

use serde_json::Value;
use std::fmt;
use tracing::debug;

use crate::body::BodyValue;
use patterns::THREAT_PATTERNS;

/// The class of attack a string leaf resembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum ThreatCategory {
    SqlInjection,
    Xss,
    PathTraversal,
    CommandInjection,
}

impl fmt::Display for ThreatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreatCategory::SqlInjection => write!(f, "SQL injection"),
            ThreatCategory::Xss => write!(f, "XSS"),
            ThreatCategory::PathTraversal => write!(f, "path traversal"),
            ThreatCategory::CommandInjection => write!(f, "command injection"),
        }
    }
}

/// An advisory detection. Never mutates input; `path` addresses the leaf in
/// `key.nested[index]` form.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Finding {
    pub category: ThreatCategory,
    pub path: String,
}

/// Scans a parsed body tree. Strings are leaf-tested, arrays recurse as
/// `path[i]`, objects as `path.key`; other primitives (and file parts) are
/// skipped.
pub fn scan(value: &BodyValue, path_prefix: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    // Explicit work-stack: adversarial nesting must not become a stack
    // overflow. Children are pushed in reverse so findings keep document
    // order.
    let mut stack: Vec<(String, &BodyValue)> = vec![(path_prefix.to_string(), value)];

    while let Some((path, node)) = stack.pop() {
        match node {
            BodyValue::String(s) => check_leaf(s, &path, &mut findings),
            BodyValue::Array(items) => {
                for (i, item) in items.iter().enumerate().rev() {
                    stack.push((format!("{}[{}]", path, i), item));
                }
            }
            BodyValue::Object(map) => {
                for (key, item) in map.iter().rev() {
                    stack.push((join_path(&path, key), item));
                }
            }
            _ => {}
        }
    }

    findings
}

/// [`scan`] over a plain JSON tree, for the query/params targets and
/// standalone use.
pub fn scan_json(value: &Value, path_prefix: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    let mut stack: Vec<(String, &Value)> = vec![(path_prefix.to_string(), value)];

    while let Some((path, node)) = stack.pop() {
        match node {
            Value::String(s) => check_leaf(s, &path, &mut findings),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate().rev() {
                    stack.push((format!("{}[{}]", path, i), item));
                }
            }
            Value::Object(map) => {
                for (key, item) in map.iter().rev() {
                    stack.push((join_path(&path, key), item));
                }
            }
            _ => {}
        }
    }

    findings
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

/// At most one finding per leaf: categories are probed in precedence order
/// (see the pattern table) and the first hit wins.
fn check_leaf(leaf: &str, path: &str, findings: &mut Vec<Finding>) {
    for row in THREAT_PATTERNS.iter() {
        if row.pattern.is_match(leaf) {
            debug!(category = %row.category, path, "threat pattern matched");
            findings.push(Finding {
                category: row.category,
                path: path.to_string(),
            });
            return;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
