//! Per-request bookkeeping.
//!
//! HTTP/1.x serves one request per connection at a time, so a connection owns
//! exactly one [`StreamState`] and reuses it for every exchange.

use bytes::{Bytes, BytesMut};
use http::{HeaderName, HeaderValue, StatusCode};

use crate::protocol::{BridgeError, ProtocolVersion, QueryVector};

/// Outbound headers in emission order, names kept in the case they were given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyHeaders {
    entries: Vec<(String, HeaderValue)>,
}

impl ReplyHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header after validating its name and value.
    pub fn append(&mut self, name: impl Into<String>, value: impl AsRef<str>) -> Result<(), BridgeError> {
        let name = name.into();
        let value = value.as_ref();
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            return Err(BridgeError::internal(format!("invalid reply header name {name:?}")));
        }
        let value = HeaderValue::from_str(value)
            .map_err(|e| BridgeError::internal(format!("invalid value for reply header {name}: {e}")))?;
        self.entries.push((name, value));
        Ok(())
    }

    /// First value of `name`, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.entries.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Removes every entry named `name`, compared case-insensitively.
    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
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

    pub(crate) fn push_unchecked(&mut self, name: &'static str, value: HeaderValue) {
        self.entries.push((name.to_owned(), value));
    }
}

/// Where the stream stands in a transport upgrade negotiation.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum UpgradeState {
    #[default]
    NoUpgrade,
    /// `101 Switching Protocols` was produced; the upper transport takes over.
    Switched,
    /// The requested token was refused with a client error.
    ErrorSent,
}

/// Everything the reply framer needs, detached from the stream.
#[derive(Debug, Clone)]
pub struct Reply {
    pub version: ProtocolVersion,
    pub keep_alive: bool,
    pub status: StatusCode,
    pub headers: ReplyHeaders,
    pub body: Bytes,
}

impl Reply {
    /// A reply with no headers and an empty body, used by the engine and the
    /// error fallback.
    pub fn bare(version: ProtocolVersion, keep_alive: bool, status: StatusCode) -> Self {
        Self { version, keep_alive, status, headers: ReplyHeaders::new(), body: Bytes::new() }
    }
}

/// Mutable record of one request/response exchange.
#[derive(Debug, Default)]
pub struct StreamState {
    version: ProtocolVersion,
    keep_alive: bool,
    status: Option<StatusCode>,
    headers: ReplyHeaders,
    body: BytesMut,
    inbound: Bytes,
    qvec: QueryVector,
    upgrade: UpgradeState,
    settings: Option<Bytes>,
}

impl StreamState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new exchange, dropping whatever the previous one left behind.
    pub fn begin(&mut self, version: ProtocolVersion, keep_alive: bool, inbound: Bytes) {
        self.reset();
        self.version = version;
        self.keep_alive = keep_alive;
        self.inbound = inbound;
    }

    pub fn reset(&mut self) {
        self.version = ProtocolVersion::Unknown;
        self.keep_alive = false;
        self.status = None;
        self.headers.clear();
        self.body.clear();
        self.inbound = Bytes::new();
        self.qvec.clear();
        self.upgrade = UpgradeState::NoUpgrade;
        self.settings = None;
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Pending status code, `None` until someone produced a reply.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    pub fn headers(&self) -> &ReplyHeaders {
        &self.headers
    }

    pub fn add_header(&mut self, name: impl Into<String>, value: impl AsRef<str>) -> Result<(), BridgeError> {
        self.headers.append(name, value)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut BytesMut {
        &mut self.body
    }

    /// Sets status and body in one go; the body replaces anything buffered.
    pub fn reply(&mut self, status: StatusCode, body: &[u8]) {
        self.status = Some(status);
        self.body.clear();
        self.body.extend_from_slice(body);
    }

    /// The request body as received.
    pub fn inbound(&self) -> &Bytes {
        &self.inbound
    }

    pub fn query(&self) -> &QueryVector {
        &self.qvec
    }

    pub fn query_mut(&mut self) -> &mut QueryVector {
        &mut self.qvec
    }

    pub fn upgrade(&self) -> UpgradeState {
        self.upgrade
    }

    #[inline]
    pub fn is_upgraded(&self) -> bool {
        self.upgrade == UpgradeState::Switched
    }

    pub(crate) fn mark_upgraded(&mut self, settings: Option<Bytes>) {
        self.upgrade = UpgradeState::Switched;
        self.settings = settings;
    }

    pub(crate) fn mark_upgrade_rejected(&mut self) {
        self.upgrade = UpgradeState::ErrorSent;
    }

    /// Settings payload the client sent along with an accepted upgrade.
    pub fn settings(&self) -> Option<&Bytes> {
        self.settings.as_ref()
    }

    pub fn take_settings(&mut self) -> Option<Bytes> {
        self.settings.take()
    }

    /// Moves the pending reply out of the stream, `None` if no status was set.
    pub fn take_reply(&mut self) -> Option<Reply> {
        let status = self.status.take()?;
        Some(Reply {
            version: self.version,
            keep_alive: self.keep_alive,
            status,
            headers: std::mem::take(&mut self.headers),
            body: self.body.split().freeze(),
        })
    }
}
