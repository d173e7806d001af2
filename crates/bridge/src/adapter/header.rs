//! Inbound header canonicalization.

use http::HeaderMap;
use tracing::trace;

use crate::protocol::{BridgeError, CanonicalParams};

const HEADER_PREFIX: &str = "HTTP_";

/// `HTTP_` followed by `name` upper-cased, with every `-` turned into `_`.
pub fn canonical_header_name(name: &str) -> String {
    let mut canonical = String::with_capacity(HEADER_PREFIX.len() + name.len());
    canonical.push_str(HEADER_PREFIX);
    canonical.extend(name.chars().map(|c| if c == '-' { '_' } else { c.to_ascii_uppercase() }));
    canonical
}

/// Copies one header into `params` under its canonical name.
///
/// The value is not decoded. Bytes that are not valid UTF-8 are replaced.
pub fn normalize_header(params: &mut CanonicalParams, name: &str, value: &[u8]) -> Result<(), BridgeError> {
    let value = String::from_utf8_lossy(value);
    trace!(name, value = %value, "inbound header");
    params.set(canonical_header_name(name), value)
}

/// Runs [`normalize_header`] over every header; a later duplicate name wins.
pub fn normalize_headers(params: &mut CanonicalParams, headers: &HeaderMap) -> Result<(), BridgeError> {
    for (name, value) in headers {
        normalize_header(params, name.as_str(), value.as_bytes())?;
    }
    Ok(())
}
