//! Heuristic threat-pattern table.
//!
//! One row per category, compiled lazily. Rows are probed in table order and
//! the first hit wins for a given leaf, so XSS outranks the SQL `script`
//! keyword and the command-injection metacharacters that obfuscated payloads
//! also contain. New detection rules are new rows, not new control flow.

use once_cell::sync::Lazy;
use regex::Regex;

use super::ThreatCategory;

pub(crate) struct ThreatPattern {
    pub category: ThreatCategory,
    pub pattern: Regex,
}

pub(crate) static THREAT_PATTERNS: Lazy<Vec<ThreatPattern>> = Lazy::new(|| {
    vec![
        // Script tags, script-scheme URLs and inline event handlers.
        ThreatPattern {
            category: ThreatCategory::Xss,
            pattern: compile(r"(?i)<\s*script|javascript\s*:|vbscript\s*:|\bon(?:load|error|click|mouseover)\s*="),
        },
        // SQL keywords, quote characters and comment tokens.
        ThreatPattern {
            category: ThreatCategory::SqlInjection,
            pattern: compile(
                r#"(?i)\b(?:select|insert|update|delete|drop|create|alter|exec|union|script)\b|['"]|--|/\*|\*/"#,
            ),
        },
        // Dot-dot segments in either slash direction, including URL-encoded
        // dots and mixed literal-dot/encoded-slash forms.
        ThreatPattern {
            category: ThreatCategory::PathTraversal,
            pattern: compile(r"(?i)\.\.[/\\]|\.\.%2f|\.\.%5c|%2e%2e"),
        },
        // Shell metacharacters.
        ThreatPattern {
            category: ThreatCategory::CommandInjection,
            pattern: compile(r"[;&|`$(){}\[\]\\]"),
        },
    ]
});

fn compile(pattern: &str) -> Regex {
    // Static patterns; a failure here is a programming error caught by tests.
    #[allow(clippy::expect_used)]
    Regex::new(pattern).expect("threat pattern must compile")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_patterns_compile() {
        assert_eq!(THREAT_PATTERNS.len(), 4);
    }

    #[test]
    fn test_table_order_is_precedence_order() {
        let categories: Vec<ThreatCategory> =
            THREAT_PATTERNS.iter().map(|p| p.category).collect();
        assert_eq!(
            categories,
            vec![
                ThreatCategory::Xss,
                ThreatCategory::SqlInjection,
                ThreatCategory::PathTraversal,
                ThreatCategory::CommandInjection,
            ]
        );
    }
}
