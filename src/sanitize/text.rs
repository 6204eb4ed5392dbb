//! Plain-text and file-name cleanup.
//!
//! These produce values for non-HTML sinks: log lines, search backends, file
//! systems. They are idempotent, so re-sanitizing stored data is harmless.

use once_cell::sync::Lazy;
use regex::Regex;

/// Characters file systems reject or that enable path tricks.
const FILE_NAME_SPECIALS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

const MAX_FILE_NAME_CHARS: usize = 255;
const MAX_SEARCH_QUERY_CHARS: usize = 200;

/// Plain-text normalization: markup removed (inner text kept), control
/// characters removed, whitespace collapsed to single spaces and trimmed,
/// then truncated per char.
pub fn sanitize_text(input: &str, max_length: Option<usize>) -> String {
    let stripped = super::html::strip_markup(input);

    let cleaned: String = stripped.chars().filter(|c| !c.is_control()).collect();

    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    match max_length {
        Some(max) if collapsed.chars().count() > max => {
            let truncated: String = collapsed.chars().take(max).collect();
            truncated.trim_end().to_string()
        }
        _ => collapsed,
    }
}

/// Reduces a search query to word characters, whitespace, hyphens and dots,
/// capped at 200 chars. Quotes, angle brackets and SQL-ish punctuation never
/// reach the search backend.
pub fn sanitize_search_query(query: &str) -> String {
    static ALLOWED: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"[\w\s.-]+").unwrap_or_else(|e| panic!("invalid search pattern: {e}"))
    });

    let kept: String = ALLOWED
        .find_iter(query)
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    sanitize_text(&kept, Some(MAX_SEARCH_QUERY_CHARS))
}

/// Makes an attacker-supplied file name safe to write to disk: separator and
/// special characters become `_`, `..` sequences are removed until none
/// remain, leading dots are stripped, `_` runs collapse, and the result is
/// capped at 255 chars. Never returns an empty string.
pub fn sanitize_file_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if FILE_NAME_SPECIALS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    // Removal can create new ".." pairs ("...." -> ".."), so loop to a fixed
    // point.
    let mut no_dots = replaced;
    loop {
        let next = no_dots.replace("..", "");
        if next == no_dots {
            break;
        }
        no_dots = next;
    }

    let trimmed = no_dots.trim_start_matches('.');

    let mut collapsed = String::with_capacity(trimmed.len());
    let mut previous_underscore = false;
    for c in trimmed.chars() {
        if c == '_' {
            if previous_underscore {
                continue;
            }
            previous_underscore = true;
        } else {
            previous_underscore = false;
        }
        collapsed.push(c);
    }

    let capped: String = collapsed.chars().take(MAX_FILE_NAME_CHARS).collect();

    if capped.is_empty() {
        "untitled".to_string()
    } else {
        capped
    }
}

// =============================================================================
// Tests
// =============================================================================
