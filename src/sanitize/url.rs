//! URL validation for user-supplied links.
//!
//! Parsing is delegated to [`url::Url`]; this module only decides whether the
//! parsed result is acceptable. Rejection returns `None` rather than an
//! error: a bad link is dropped, never stored.

use once_cell::sync::Lazy;
use regex::Regex;
use url::{Host, Url};

/// Longer than any legitimate link; also bounds parse work.
pub const MAX_URL_LENGTH: usize = 2048;

const ALLOWED_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Dotted-quad prefixes of RFC 1918, loopback and link-local ranges, for
/// hosts that are private addresses spelled as domain-ish strings.
static PRIVATE_HOST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:10\.|127\.|169\.254\.|192\.168\.|172\.(?:1[6-9]|2\d|3[01])\.)")
        .unwrap_or_else(|e| panic!("invalid private-host pattern: {e}"))
});

/// Returns the normalized URL when it is safe to follow, `None` otherwise.
///
/// Accepted: `http`/`https` to a public host, and `mailto`. Rejected:
/// anything else — unparseable input, other schemes (`javascript:`, `file:`,
/// `ftp:`...), loopback, link-local, unspecified and RFC 1918 addresses,
/// `localhost`, and hosts with empty labels. The returned string is the
/// parser's normalization, not the raw input.
pub fn sanitize_url(input: &str) -> Option<String> {
    if input.len() > MAX_URL_LENGTH {
        return None;
    }

    let parsed = Url::parse(input.trim()).ok()?;

    if !ALLOWED_SCHEMES.contains(&parsed.scheme()) {
        return None;
    }

    match parsed.host() {
        Some(Host::Ipv4(addr)) => {
            if addr.is_loopback()
                || addr.is_private()
                || addr.is_link_local()
                || addr.is_unspecified()
            {
                return None;
            }
        }
        Some(Host::Ipv6(addr)) => {
            if addr.is_loopback() || addr.is_unspecified() {
                return None;
            }
        }
        Some(Host::Domain(domain)) => {
            let domain = domain.to_ascii_lowercase();
            if domain == "localhost"
                || domain.contains("..")
                || PRIVATE_HOST.is_match(&domain)
            {
                return None;
            }
        }
        // Only mailto legitimately has no host part.
        None => {
            if parsed.scheme() != "mailto" {
                return None;
            }
        }
    }

    Some(parsed.to_string())
}

// =============================================================================
// Tests
// =============================================================================
