//! Reply framing: serializes a [`Reply`] into HTTP/1.x wire bytes.
//!
//! # Wire format
//!
//! ```text
//! HTTP/<major>.<minor> <code> <reason>\r\n
//! Name: Value\r\n        (zero or more, in insertion order)
//! \r\n
//! <body>
//! ```
//!
//! - the version comes from the stream; an unknown version is answered as 1.0
//! - `Content-Length` is added for every final status except `204`, and never
//!   sent with `204` or an informational status
//! - a `Connection` header reflects the client's keep-alive intent where the
//!   version default differs from it

use bytes::{BufMut, BytesMut};
use http::header::{CONNECTION, CONTENT_LENGTH};
use http::{HeaderValue, StatusCode};
use std::io;
use std::io::Write;
use tokio_util::codec::Encoder;
use tracing::trace;

use crate::protocol::{ProtocolVersion, Reply, SendError};

/// Initial buffer size reserved for the status line and headers
const INIT_HEADER_SIZE: usize = 1024;

const KEEP_ALIVE: HeaderValue = HeaderValue::from_static("keep-alive");
const CLOSE: HeaderValue = HeaderValue::from_static("close");

/// What to advertise to an HTTP/1.1 client that asked to close.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum KeepAlivePolicy {
    /// `Connection: close`.
    #[default]
    Standard,
    /// `Connection: keep-alive`, the behavior of older deployments.
    LegacyEcho,
}

/// Encoder for complete replies implementing the [`Encoder`] trait.
#[derive(Debug, Default)]
pub struct ReplyEncoder {
    keep_alive_policy: KeepAlivePolicy,
}

impl ReplyEncoder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_policy(keep_alive_policy: KeepAlivePolicy) -> Self {
        Self { keep_alive_policy }
    }

    fn connection_value(&self, version: ProtocolVersion, keep_alive: bool) -> Option<HeaderValue> {
        match (version, keep_alive) {
            // unknown versions are answered on an HTTP/1.0 status line
            (ProtocolVersion::Http10 | ProtocolVersion::Unknown, true) => Some(KEEP_ALIVE),
            (ProtocolVersion::Http11, false) => match self.keep_alive_policy {
                KeepAlivePolicy::Standard => Some(CLOSE),
                KeepAlivePolicy::LegacyEcho => Some(KEEP_ALIVE),
            },
            _ => None,
        }
    }
}

/// Whether a reply with `status` carries a `Content-Length`.
#[inline]
pub fn allows_content_length(status: StatusCode) -> bool {
    status != StatusCode::NO_CONTENT && !status.is_informational()
}

impl Encoder<Reply> for ReplyEncoder {
    type Error = SendError;

    fn encode(&mut self, item: Reply, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let Reply { version, keep_alive, status, mut headers, body } = item;

        headers.remove(CONTENT_LENGTH.as_str());
        if allows_content_length(status) {
            headers.push_unchecked("Content-Length", HeaderValue::from(body.len()));
        } else if !body.is_empty() {
            return Err(SendError::invalid_header(format!("status {} must not carry a body", status.as_u16())));
        }

        if !headers.contains(CONNECTION.as_str()) {
            if let Some(value) = self.connection_value(version, keep_alive) {
                headers.push_unchecked("Connection", value);
            }
        }

        let (major, minor) = version.wire();
        dst.reserve(INIT_HEADER_SIZE + body.len());
        write!(
            FastWrite(dst),
            "HTTP/{}.{} {} {}\r\n",
            major,
            minor,
            status.as_str(),
            status.canonical_reason().unwrap_or("Unknown")
        )?;

        for (name, value) in headers.iter() {
            dst.put_slice(name.as_bytes());
            dst.put_slice(b": ");
            dst.put_slice(value.as_bytes());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
        dst.put_slice(&body);

        trace!(status = status.as_u16(), body_size = body.len(), "framed reply");
        Ok(())
    }
}

/// Writer over an already reserved [`BytesMut`].
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
