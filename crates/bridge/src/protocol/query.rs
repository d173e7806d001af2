//! Query component decoding.
//!
//! The router needs to tell `a=1&a=2` apart from `a=2`, so the decoded query is
//! an ordered list and never a map.

use std::slice;
use std::string::FromUtf8Error;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed percent escape at byte {position}")]
    MalformedEscape { position: usize },

    #[error("decoded value is not utf-8: {source}")]
    InvalidUtf8 {
        #[from]
        source: FromUtf8Error,
    },
}

/// Ordered `(key, decoded value)` pairs of one request's query component.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryVector {
    entries: Vec<(String, String)>,
}

impl QueryVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    /// First value recorded for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn get_all<'a, 'k>(&'a self, key: &'k str) -> impl Iterator<Item = &'a str> + use<'a, 'k> {
        self.entries.iter().filter(move |(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> slice::Iter<'_, (String, String)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<'a> IntoIterator for &'a QueryVector {
    type Item = &'a (String, String);
    type IntoIter = slice::Iter<'a, (String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Decodes `raw` and appends every pair to `qvec`.
///
/// Keys are taken verbatim, only values are percent-decoded. Empty segments
/// are skipped and a segment without `=` gets an empty value. On error the
/// pairs decoded so far stay in `qvec`; the caller drops the whole request.
pub fn decode_query(raw: &str, qvec: &mut QueryVector) -> Result<(), DecodeError> {
    for kv in raw.split('&').filter(|kv| !kv.is_empty()) {
        let (key, value) = kv.split_once('=').unwrap_or((kv, ""));
        qvec.push(key, percent_decode(value)?);
    }
    Ok(())
}

/// Strict URI percent-decoding: every `%` must start a two hex digit escape,
/// and `+` stays a plus.
pub fn percent_decode(s: &str) -> Result<String, DecodeError> {
    if !s.contains('%') {
        return Ok(s.to_owned());
    }

    let bytes = s.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hi = bytes.get(i + 1).copied().and_then(hex_digit);
            let lo = bytes.get(i + 2).copied().and_then(hex_digit);
            match (hi, lo) {
                (Some(hi), Some(lo)) => {
                    result.push((hi << 4) | lo);
                    i += 3;
                }
                _ => return Err(DecodeError::MalformedEscape { position: i }),
            }
        } else {
            result.push(bytes[i]);
            i += 1;
        }
    }

    Ok(String::from_utf8(result)?)
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
