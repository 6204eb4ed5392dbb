//! Query-string syntax decoding.
//!
//! Shared by the urlencoded body parser and the query target: splits on `&`,
//! percent-decodes keys and values (`+` as space), and keeps pairs in
//! submission order so `name[]` coalescing stays ordered.

use serde_json::{Map, Value};

/// Decoded `key=value` pairs in submission order. Pairs without `=` decode to
/// an empty value; empty segments are skipped.
pub(crate) fn parse_pairs(input: &str) -> Vec<(String, String)> {
    input
        .split('&')
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.split_once('=') {
            Some((key, value)) => (percent_decode(key), percent_decode(value)),
            None => (percent_decode(segment), String::new()),
        })
        .collect()
}

/// Pairs as a JSON object with `name[]` keys coalesced into ordered arrays.
/// Plain repeated keys keep the last value.
pub(crate) fn pairs_to_json(pairs: &[(String, String)]) -> Value {
    let mut out = Map::new();
    for (key, value) in pairs {
        if let Some(base) = key.strip_suffix("[]") {
            match out.get_mut(base) {
                Some(Value::Array(items)) => items.push(Value::String(value.clone())),
                _ => {
                    out.insert(base.to_string(), Value::Array(vec![Value::String(value.clone())]));
                }
            }
        } else {
            out.insert(key.clone(), Value::String(value.clone()));
        }
    }
    Value::Object(out)
}

/// Percent-decoding with `+` as space. Malformed escapes are kept literally
/// rather than rejected; this runs on attacker-controlled input and must
/// always produce something.
pub(crate) fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' => match decode_hex_pair(bytes.get(i + 1), bytes.get(i + 2)) {
                Some(byte) => {
                    out.push(byte);
                    i += 3;
                }
                None => {
                    out.push(b'%');
                    i += 1;
                }
            },
            other => {
                out.push(other);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn decode_hex_pair(high: Option<&u8>, low: Option<&u8>) -> Option<u8> {
    let high = (*high? as char).to_digit(16)?;
    let low = (*low? as char).to_digit(16)?;
    Some((high * 16 + low) as u8)
}
