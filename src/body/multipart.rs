//! `multipart/form-data` decoding (RFC 7578).
//!
//! Byte-oriented so binary uploads survive: part headers must be UTF-8 but
//! part content is handed out as zero-copy [`Bytes`] slices of the original
//! buffer. Parts missing a `Content-Disposition` name are skipped, matching
//! what browsers never send and servers never rely on.

use bytes::Bytes;

use super::BodyError;

/// Hard cap on parts per request; a field-spam payload fails fast instead of
/// allocating per part.
pub(crate) const MAX_MULTIPART_PARTS: usize = 128;

/// One decoded part, before field coalescing.
pub(crate) struct MultipartField {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub content: Bytes,
}

/// Pulls the boundary parameter out of a `multipart/form-data` content type,
/// handling the quoted form.
pub(crate) fn extract_boundary(content_type: &str) -> Option<String> {
    for param in content_type.split(';').skip(1) {
        let param = param.trim();
        let Some(prefix) = param.get(..9) else {
            continue;
        };
        if !prefix.eq_ignore_ascii_case("boundary=") {
            continue;
        }
        let value = param[9..].trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        if value.is_empty() {
            return None;
        }
        return Some(value.to_string());
    }
    None
}

/// Splits the body at boundary markers and decodes each part.
pub(crate) fn parse_multipart(
    body: &Bytes,
    boundary: &str,
) -> Result<Vec<MultipartField>, BodyError> {
    let marker = format!("--{boundary}").into_bytes();
    let mut fields = Vec::new();

    // Skip any preamble before the first boundary.
    let mut cursor = match find_bytes(body, &marker, 0) {
        Some(pos) => pos + marker.len(),
        None => return Err(BodyError::InvalidMultipart),
    };

    loop {
        let rest = body.get(cursor..).unwrap_or(&[]);

        // "--" directly after a boundary marks the end of the stream.
        if rest.starts_with(b"--") || rest.is_empty() {
            break;
        }

        // Line break that terminates the boundary line.
        if rest.starts_with(b"\r\n") {
            cursor += 2;
        } else if rest.starts_with(b"\n") {
            cursor += 1;
        }

        if fields.len() >= MAX_MULTIPART_PARTS {
            return Err(BodyError::TooManyParts);
        }

        let part_end = find_bytes(body, &marker, cursor).unwrap_or(body.len());
        if let Some(field) = parse_part(body, cursor, part_end) {
            fields.push(field);
        }

        match find_bytes(body, &marker, cursor) {
            Some(pos) => cursor = pos + marker.len(),
            None => break,
        }
    }

    Ok(fields)
}

/// Decodes one part between two boundary markers. Returns `None` for parts
/// with unreadable headers or no field name.
fn parse_part(body: &Bytes, start: usize, end: usize) -> Option<MultipartField> {
    let slice = body.get(start..end)?;

    // Header block ends at the first blank line.
    let (header_bytes, sep_len, header_len) =
        if let Some(pos) = find_bytes(slice, b"\r\n\r\n", 0) {
            (&slice[..pos], 4, pos)
        } else if let Some(pos) = find_bytes(slice, b"\n\n", 0) {
            (&slice[..pos], 2, pos)
        } else {
            return None;
        };

    let headers = std::str::from_utf8(header_bytes).ok()?;

    let mut name: Option<String> = None;
    let mut file_name: Option<String> = None;
    let mut content_type: Option<String> = None;

    for line in headers.lines() {
        let line = line.trim();
        if let Some(value) = strip_header(line, "content-disposition:") {
            for param in value.split(';') {
                let param = param.trim();
                if let Some(v) = disposition_param(param, "name=") {
                    name = Some(v.to_string());
                } else if let Some(v) = disposition_param(param, "filename=") {
                    file_name = Some(v.to_string());
                }
            }
        } else if let Some(value) = strip_header(line, "content-type:") {
            content_type = Some(value.trim().to_string());
        }
    }

    let name = name?;

    // Drop the line break that separates content from the next boundary.
    let mut data_start = start + header_len + sep_len;
    let mut data_end = end;
    let data = body.get(data_start..data_end)?;
    if data.ends_with(b"\r\n") {
        data_end -= 2;
    } else if data.ends_with(b"\n") {
        data_end -= 1;
    }
    data_start = data_start.min(data_end);

    Some(MultipartField {
        name,
        file_name,
        content_type,
        content: body.slice(data_start..data_end),
    })
}

fn strip_header<'a>(line: &'a str, header: &str) -> Option<&'a str> {
    let prefix = line.get(..header.len())?;
    if prefix.eq_ignore_ascii_case(header) {
        Some(line[header.len()..].trim())
    } else {
        None
    }
}

/// Handles both `name="value"` and `name=value` disposition parameters.
fn disposition_param<'a>(param: &'a str, key: &str) -> Option<&'a str> {
    let prefix = param.get(..key.len())?;
    if !prefix.eq_ignore_ascii_case(key) {
        return None;
    }
    let value = &param[key.len()..];
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        Some(&value[1..value.len() - 1])
    } else {
        Some(value)
    }
}

fn find_bytes(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() || needle.is_empty() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

// =============================================================================
// Tests
// =============================================================================
