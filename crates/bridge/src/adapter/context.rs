use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::adapter::fallback::LastError;
use crate::protocol::{StreamState, TlsSession};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a transport connection.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Per-connection state the adapter works against.
///
/// HTTP/1.x has one request in flight per connection, so the context holds a
/// single [`StreamState`] reused across requests.
#[derive(Debug)]
pub struct ConnectionContext {
    id: ConnectionId,
    tls: Option<TlsSession>,
    stream: StreamState,
    last_error: LastError,
    exit: bool,
}

impl ConnectionContext {
    /// Context for a clear-text connection.
    pub fn new() -> Self {
        Self { id: ConnectionId::next(), tls: None, stream: StreamState::new(), last_error: LastError::new(), exit: false }
    }

    /// Context for a connection that completed a TLS handshake.
    pub fn with_tls(tls: TlsSession) -> Self {
        Self { tls: Some(tls), ..Self::new() }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn tls(&self) -> Option<&TlsSession> {
        self.tls.as_ref()
    }

    pub fn stream(&self) -> &StreamState {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut StreamState {
        &mut self.stream
    }

    pub fn last_error(&self) -> &LastError {
        &self.last_error
    }

    pub fn last_error_mut(&mut self) -> &mut LastError {
        &mut self.last_error
    }

    /// Asks the engine to close the connection once the current reply is out.
    pub fn request_exit(&mut self) {
        self.exit = true;
    }

    pub fn should_exit(&self) -> bool {
        self.exit
    }

    /// Split borrow of the pieces a request works on at the same time.
    pub(crate) fn parts_mut(&mut self) -> (Option<&TlsSession>, &mut StreamState, &mut LastError) {
        (self.tls.as_ref(), &mut self.stream, &mut self.last_error)
    }
}

impl Default for ConnectionContext {
    fn default() -> Self {
        Self::new()
    }
}
