//! Allow-list HTML sanitization.
//!
//! A small tag tokenizer rather than regex stripping: markup is parsed,
//! checked against an allow-list, and re-emitted. Only explicitly permitted
//! tags and attributes survive; everything else is dropped while inner text
//! is kept. All functions here run directly on attacker-controlled input and
//! degrade to a safe value instead of failing.
//!
//! The default output denies `href`/`src`, so it is unsuitable for rendering
//! links or media; pair with [`crate::sanitize::sanitize_url`] for that.

use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::fmt;

/// Options for [`sanitize_html`]. The defaults are immutable and shared;
/// build a value once per use case and pass it by reference.
#[derive(Debug, Clone, Default)]
pub struct HtmlOptions {
    /// Replaces the default tag allow-list when set.
    pub allowed_tags: Option<HashSet<String>>,
    /// Replaces the default attribute allow-list when set. `on*` handlers
    /// stay denied regardless; listing `href`/`src` here is the only way to
    /// re-enable them.
    pub allowed_attributes: Option<HashSet<String>>,
    /// Remove all markup, keeping inner text only.
    pub strip_tags: bool,
    /// Truncate (per char, appending an ellipsis) before sanitizing.
    pub max_length: Option<usize>,
}

/// Small inline/structural subset; no links, media or forms.
static DEFAULT_ALLOWED_TAGS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "b", "i", "em", "strong", "u", "span", "div", "p", "br", "ul", "ol", "li", "h1", "h2",
        "h3", "h4", "h5", "h6", "blockquote", "pre", "code", "mark", "small", "del", "ins",
    ]
    .into_iter()
    .collect()
});

/// Stripped unconditionally, never re-emitted even if allow-listed.
const FORBIDDEN_TAGS: &[&str] = &["script", "object", "embed", "link", "style", "meta"];

const DEFAULT_ALLOWED_ATTRIBUTES: &[&str] = &["class", "id", "title"];

/// Sanitizes `input` against the allow-list. Unknown tags are dropped with
/// their content kept; `script`/`style` bodies are dropped entirely; stray
/// `<` becomes `&lt;`.
pub fn sanitize_html(input: &str, options: &HtmlOptions) -> String {
    let truncated;
    let text = match options.max_length {
        Some(max) => {
            truncated = truncate_with_ellipsis(input, max);
            truncated.as_str()
        }
        None => input,
    };

    rewrite(text, options, true)
}

/// Markup removal for plain-text contexts: tags and comments dropped, inner
/// text kept, stray `<` kept literally so the result is already stable.
pub(crate) fn strip_markup(input: &str) -> String {
    static STRIP: Lazy<HtmlOptions> = Lazy::new(|| HtmlOptions {
        strip_tags: true,
        ..HtmlOptions::default()
    });
    rewrite(input, &STRIP, false)
}

fn rewrite(text: &str, options: &HtmlOptions, escape_stray_lt: bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find('<') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        match parse_tag(tail) {
            Some(Token::Markup { consumed }) => {
                rest = &tail[consumed..];
            }
            Some(Token::Element {
                name,
                closing,
                self_closing,
                attributes,
                consumed,
            }) => {
                rest = &tail[consumed..];
                if FORBIDDEN_TAGS.contains(&name.as_str()) {
                    // script/style content is active, not text; skip it.
                    if !closing && (name == "script" || name == "style") {
                        rest = skip_past_closing(rest, &name);
                    }
                } else if !options.strip_tags && tag_allowed(&name, options) {
                    emit_tag(&mut out, &name, closing, self_closing, &attributes, options);
                }
                // Disallowed tag: dropped, inner text continues.
            }
            None => {
                if escape_stray_lt {
                    out.push_str("&lt;");
                } else {
                    out.push('<');
                }
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn tag_allowed(name: &str, options: &HtmlOptions) -> bool {
    match &options.allowed_tags {
        Some(set) => set.contains(name),
        None => DEFAULT_ALLOWED_TAGS.contains(name),
    }
}

fn attribute_allowed(name: &str, options: &HtmlOptions) -> bool {
    // Event handlers are never emitted, allow-listed or not.
    if name.starts_with("on") {
        return false;
    }
    match &options.allowed_attributes {
        Some(set) => set.contains(name),
        None => {
            name != "href"
                && name != "src"
                && (DEFAULT_ALLOWED_ATTRIBUTES.contains(&name)
                    || name.starts_with("data-")
                    || name.starts_with("aria-"))
        }
    }
}

/// Rejects values that smuggle a script scheme through case or whitespace
/// obfuscation.
fn safe_attribute_value(value: &str) -> bool {
    let normalized: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_lowercase();
    !(normalized.contains("javascript:")
        || normalized.contains("vbscript:")
        || normalized.contains("data:"))
}

fn emit_tag(
    out: &mut String,
    name: &str,
    closing: bool,
    self_closing: bool,
    attributes: &[(String, Option<String>)],
    options: &HtmlOptions,
) {
    if closing {
        out.push_str("</");
        out.push_str(name);
        out.push('>');
        return;
    }

    out.push('<');
    out.push_str(name);
    for (attr, value) in attributes {
        if !attribute_allowed(attr, options) {
            continue;
        }
        match value {
            Some(v) if safe_attribute_value(v) => {
                out.push(' ');
                out.push_str(attr);
                out.push_str("=\"");
                out.push_str(&escape_attribute(v));
                out.push('"');
            }
            Some(_) => {}
            None => {
                out.push(' ');
                out.push_str(attr);
            }
        }
    }
    if self_closing {
        out.push_str(" />");
    } else {
        out.push('>');
    }
}

fn escape_attribute(value: &str) -> String {
    value.replace('"', "&quot;").replace('<', "&lt;")
}

enum Token {
    /// Comment, doctype or processing instruction: consumed and dropped.
    Markup { consumed: usize },
    Element {
        name: String,
        closing: bool,
        self_closing: bool,
        attributes: Vec<(String, Option<String>)>,
        consumed: usize,
    },
}

/// Parses the tag starting at `tail[0] == '<'`. Returns `None` when the text
/// is not actually a tag, in which case the `<` is treated as literal text.
fn parse_tag(tail: &str) -> Option<Token> {
    let bytes = tail.as_bytes();

    if tail.starts_with("<!--") {
        let consumed = tail.find("-->").map_or(tail.len(), |p| p + 3);
        return Some(Token::Markup { consumed });
    }
    if tail.starts_with("<!") || tail.starts_with("<?") {
        let consumed = tail.find('>').map_or(tail.len(), |p| p + 1);
        return Some(Token::Markup { consumed });
    }

    let mut i = 1;
    let closing = bytes.get(i) == Some(&b'/');
    if closing {
        i += 1;
    }

    // Tag names start with a letter; anything else is literal text.
    if !bytes.get(i)?.is_ascii_alphabetic() {
        return None;
    }
    let name_start = i;
    while matches!(bytes.get(i), Some(b) if b.is_ascii_alphanumeric() || *b == b'-') {
        i += 1;
    }
    let name = tail[name_start..i].to_ascii_lowercase();

    let mut attributes = Vec::new();
    let mut self_closing = false;

    loop {
        // Skip whitespace; remember a trailing slash.
        while matches!(bytes.get(i), Some(b) if b.is_ascii_whitespace() || *b == b'/') {
            self_closing = bytes[i] == b'/';
            i += 1;
        }
        match bytes.get(i) {
            Some(b'>') => {
                return Some(Token::Element {
                    name,
                    closing,
                    self_closing,
                    attributes,
                    consumed: i + 1,
                });
            }
            Some(_) => {}
            // Unterminated tag: not markup.
            None => return None,
        }

        self_closing = false;

        // Attribute name.
        let attr_start = i;
        while matches!(bytes.get(i), Some(b) if !b.is_ascii_whitespace() && !matches!(*b, b'=' | b'>' | b'/')) {
            i += 1;
        }
        if i == attr_start {
            // Defensive: guarantees progress on malformed input.
            i += 1;
            continue;
        }
        let attr_name = tail[attr_start..i].to_ascii_lowercase();

        while matches!(bytes.get(i), Some(b) if b.is_ascii_whitespace()) {
            i += 1;
        }

        if bytes.get(i) == Some(&b'=') {
            i += 1;
            while matches!(bytes.get(i), Some(b) if b.is_ascii_whitespace()) {
                i += 1;
            }
            let value = match bytes.get(i) {
                Some(&(quote @ (b'"' | b'\''))) => {
                    i += 1;
                    let value_start = i;
                    while matches!(bytes.get(i), Some(b) if *b != quote) {
                        i += 1;
                    }
                    let value = tail.get(value_start..i)?.to_string();
                    if bytes.get(i).is_none() {
                        return None;
                    }
                    i += 1; // closing quote
                    value
                }
                Some(_) => {
                    let value_start = i;
                    while matches!(bytes.get(i), Some(b) if !b.is_ascii_whitespace() && *b != b'>') {
                        i += 1;
                    }
                    tail[value_start..i].to_string()
                }
                None => return None,
            };
            attributes.push((attr_name, Some(value)));
        } else {
            attributes.push((attr_name, None));
        }
    }
}

/// Advances past the matching close tag, case-insensitively. If it never
/// closes, the remainder is active content and is dropped whole.
fn skip_past_closing<'a>(rest: &'a str, name: &str) -> &'a str {
    let pattern = format!("</{name}");
    let haystack = rest.as_bytes();
    let needle = pattern.as_bytes();

    let mut i = 0;
    while i + needle.len() <= haystack.len() {
        if haystack[i..i + needle.len()].eq_ignore_ascii_case(needle) {
            let after = &rest[i + needle.len()..];
            return match after.find('>') {
                Some(pos) => &after[pos + 1..],
                None => "",
            };
        }
        i += 1;
    }
    ""
}

fn truncate_with_ellipsis(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }
    let mut out: String = input.chars().take(max_chars).collect();
    out.push('…');
    out
}

// =============================================================================
// Safe-by-construction wrapper
// =============================================================================

/// A string that has been through [`sanitize_html`]. Rendering layers can
/// require this type instead of trusting call sites.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SafeHtml(String);

impl SafeHtml {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SafeHtml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sanitizes and wraps in one step.
pub fn create_safe_html(input: &str, options: &HtmlOptions) -> SafeHtml {
    SafeHtml(sanitize_html(input, options))
}

// =============================================================================
// Highlighting
// =============================================================================

/// Wraps already-sanitized text in `<span class="...">` markers at the given
/// inclusive byte ranges.
///
/// Invalid ranges (out of bounds, start past end, or not on char boundaries)
/// are silently dropped. Spans are applied in descending start order so
/// inserting markup never invalidates offsets that have not been applied
/// yet. The class name is restricted to `[a-zA-Z0-9_-]`.
pub fn safe_highlight(text: &str, matches: &[(usize, usize)], class_name: &str) -> String {
    let class: String = class_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();

    let mut spans: Vec<(usize, usize)> = matches
        .iter()
        .copied()
        .filter(|&(start, end)| {
            start <= end
                && end < text.len()
                && text.is_char_boundary(start)
                && text.is_char_boundary(end + 1)
        })
        .collect();
    spans.sort_by(|a, b| b.0.cmp(&a.0));

    let open = format!("<span class=\"{class}\">");
    let mut out = text.to_string();
    for (start, end) in spans {
        out.insert_str(end + 1, "</span>");
        out.insert_str(start, &open);
    }
    out
}

// =============================================================================
// Tests
// =============================================================================
