//! Last-resort replies for failures the adapter cannot resolve.

use std::fmt::Display;

use http::StatusCode;
use tracing::error;

use crate::protocol::StreamState;

/// Diagnostic text of the most recent unrecoverable failure on a connection.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LastError {
    reason: String,
}

impl LastError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the recorded diagnostic.
    pub fn record(&mut self, reason: impl Display) {
        self.reason.clear();
        self.reason.push_str(&reason.to_string());
    }

    pub fn reason(&self) -> Option<&str> {
        if self.reason.is_empty() { None } else { Some(&self.reason) }
    }

    pub fn is_empty(&self) -> bool {
        self.reason.is_empty()
    }

    /// Moves the diagnostic out, leaving the state reset.
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.reason)
    }
}

/// Turns an aborted request into a `500 Internal Server Error`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ErrorFallback;

impl ErrorFallback {
    /// Replaces whatever the stream holds with a `500` whose body is the last
    /// recorded error, or empty if there is none. The record is always reset.
    pub fn respond(&self, last_error: &mut LastError, stream: &mut StreamState) {
        let reason = last_error.take();
        error!(cause = %reason, "request aborted by internal error");

        let version = stream.version();
        let keep_alive = stream.keep_alive();
        let inbound = stream.inbound().clone();
        stream.begin(version, keep_alive, inbound);
        stream.reply(StatusCode::INTERNAL_SERVER_ERROR, reason.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::protocol::{BridgeError, ProtocolVersion};

    #[test]
    fn last_error_becomes_the_body() {
        let mut last_error = LastError::new();
        last_error.record(BridgeError::internal("backend unreachable"));

        let mut stream = StreamState::new();
        stream.begin(ProtocolVersion::Http11, true, Bytes::new());
        stream.add_header("Content-Type", "application/yang-data+json").unwrap();
        stream.reply(StatusCode::OK, b"{\"partial\":");

        ErrorFallback.respond(&mut last_error, &mut stream);

        assert_eq!(stream.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(stream.body(), b"internal error: backend unreachable");
        assert!(stream.headers().is_empty());
        assert_eq!(stream.version(), ProtocolVersion::Http11);
        assert!(stream.keep_alive());
        assert!(last_error.is_empty());
    }

    #[test]
    fn empty_last_error_gives_empty_500() {
        let mut last_error = LastError::new();
        let mut stream = StreamState::new();

        ErrorFallback.respond(&mut last_error, &mut stream);
        assert_eq!(stream.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(stream.body().is_empty());
    }

    #[test]
    fn diagnostic_is_emitted_once() {
        let mut last_error = LastError::new();
        last_error.record("first");
        let mut stream = StreamState::new();

        ErrorFallback.respond(&mut last_error, &mut stream);
        assert_eq!(stream.body(), b"first");

        ErrorFallback.respond(&mut last_error, &mut stream);
        assert!(stream.body().is_empty());
    }
}
