//! The canonical parameter set handed to the resource router.

use std::collections::HashMap;
use std::collections::hash_map;

use crate::protocol::BridgeError;

pub const REQUEST_METHOD: &str = "REQUEST_METHOD";
pub const REQUEST_URI: &str = "REQUEST_URI";
pub const HTTPS: &str = "HTTPS";
pub const SSL_CN: &str = "SSL_CN";
pub const HTTP_UPGRADE: &str = "HTTP_UPGRADE";
pub const HTTP_HTTP2_SETTINGS: &str = "HTTP_HTTP2_SETTINGS";

/// Transport independent `name -> value` view of one request.
///
/// Owned by the request being served and passed to the router by reference;
/// nothing is shared between requests or connections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalParams {
    inner: HashMap<String, String>,
}

impl CanonicalParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites `name`.
    ///
    /// Capacity is reserved fallibly so that running out of memory surfaces as
    /// [`BridgeError::Allocation`] instead of aborting the process.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<(), BridgeError> {
        self.inner.try_reserve(1)?;
        self.inner.insert(name.into(), value.into());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.inner.remove(name)
    }

    /// Drops every parameter, the end-of-request operation.
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Request method as set by the translator.
    pub fn method(&self) -> Option<&str> {
        self.get(REQUEST_METHOD)
    }

    /// Request path as set by the translator.
    pub fn uri(&self) -> Option<&str> {
        self.get(REQUEST_URI)
    }
}

impl IntoIterator for CanonicalParams {
    type Item = (String, String);
    type IntoIter = hash_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

/// What happens to the parameter set once a request is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamsDisposition {
    /// The set was cleared, the normal end of a request.
    Cleared,
    /// The set outlives the request; the upgraded transport still needs it.
    Retained(CanonicalParams),
}

impl ParamsDisposition {
    #[inline]
    pub fn is_retained(&self) -> bool {
        matches!(self, ParamsDisposition::Retained(_))
    }

    pub fn retained(&self) -> Option<&CanonicalParams> {
        match self {
            ParamsDisposition::Retained(params) => Some(params),
            ParamsDisposition::Cleared => None,
        }
    }

    pub fn into_retained(self) -> Option<CanonicalParams> {
        match self {
            ParamsDisposition::Retained(params) => Some(params),
            ParamsDisposition::Cleared => None,
        }
    }
}
