//! Request decoding for the hosting engine.
//!
//! The adapter never waits for I/O, so the engine hands it complete requests:
//! this decoder parses the head with `httparse`, then buffers the
//! `Content-Length` body before yielding an [`InboundRequest`].
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum header size: 8KB
//! - Body size: [`BridgeConfig::max_body_bytes`](crate::BridgeConfig::max_body_bytes)
//! - Chunked request bodies are refused as unsupported
//!
//! A request whose version is not `HTTP/1.x` is still decoded, headers and
//! body included, so that the translator can answer it with a structured error
//! instead of a bare `400` and the connection can go on.

use bytes::{Buf, Bytes, BytesMut};
use http::header::{CONTENT_LENGTH, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};
use httparse::Status;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{HttpProto, InboundRequest, InboundRequestBuilder, ParseError};

/// Maximum number of headers allowed in a request
const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the entire header section
const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Decoder turning a byte stream into complete [`InboundRequest`]s.
///
/// # State Machine
///
/// - `pending == None`: parsing a request head
/// - `pending == Some(_)`: head parsed, waiting for `length` body bytes
#[derive(Debug)]
pub struct RequestDecoder {
    max_body_bytes: usize,
    pending: Option<PendingBody>,
}

#[derive(Debug)]
struct PendingBody {
    builder: InboundRequestBuilder,
    length: usize,
}

impl RequestDecoder {
    pub fn new(max_body_bytes: usize) -> Self {
        Self { max_body_bytes, pending: None }
    }

    fn decode_head(&self, src: &mut BytesMut) -> Result<Option<PendingBody>, ParseError> {
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let mut req = httparse::Request::new(&mut headers);

        let status = match req.parse(src) {
            Ok(status) => status,
            Err(httparse::Error::Version) => return decode_foreign_version(src, self.max_body_bytes),
            Err(httparse::Error::TooManyHeaders) => return Err(ParseError::too_many_headers(MAX_HEADER_NUM)),
            Err(e) => return Err(ParseError::invalid_header(e)),
        };

        let body_offset = match status {
            Status::Complete(body_offset) => body_offset,
            Status::Partial => {
                ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                return Ok(None);
            }
        };
        trace!(header_size = body_offset, "parsed request head");
        ensure!(body_offset <= MAX_HEADER_BYTES, ParseError::too_large_header(body_offset, MAX_HEADER_BYTES));

        let method = req.method.ok_or(ParseError::InvalidMethod)?;
        let method = Method::from_bytes(method.as_bytes()).map_err(|_e| ParseError::InvalidMethod)?;
        let uri = req.path.ok_or(ParseError::InvalidUri)?;
        let uri = Uri::try_from(uri).map_err(|_e| ParseError::InvalidUri)?;
        let proto = match req.version {
            Some(0) => HttpProto::HTTP_10,
            _ => HttpProto::HTTP_11,
        };

        let header_map = to_header_map(req.headers)?;

        let length = body_length(&header_map, self.max_body_bytes)?;
        src.advance(body_offset);

        let builder = InboundRequest::builder().method(method).uri(uri).proto(proto).headers(header_map);
        Ok(Some(PendingBody { builder, length }))
    }
}

impl Decoder for RequestDecoder {
    type Item = InboundRequest;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.pending.is_none() {
            match self.decode_head(src)? {
                Some(pending) => self.pending = Some(pending),
                None => return Ok(None),
            }
        }

        let Some(PendingBody { length, .. }) = &self.pending else {
            return Ok(None);
        };
        let length = *length;
        if src.len() < length {
            src.reserve(length - src.len());
            return Ok(None);
        }

        let body = if length == 0 { Bytes::new() } else { src.split_to(length).freeze() };
        Ok(self.pending.take().map(|pending| pending.builder.body(body).build()))
    }
}

/// Determines the body length from `Content-Length` / `Transfer-Encoding`.
///
/// refer: https://www.rfc-editor.org/rfc/rfc9112.html#name-message-body-length
fn body_length(headers: &HeaderMap, max_body_bytes: usize) -> Result<usize, ParseError> {
    let te_header = headers.get(TRANSFER_ENCODING);
    let cl_header = headers.get(CONTENT_LENGTH);

    match (te_header, cl_header) {
        (None, None) => Ok(0),

        (Some(te_value), None) => {
            let encoding = te_value.to_str().unwrap_or("<opaque>");
            Err(ParseError::unsupported_transfer_encoding(encoding))
        }

        (None, Some(cl_value)) => {
            let cl_str = cl_value.to_str().map_err(|_e| ParseError::invalid_content_length("value can't to_str"))?;
            let length = cl_str
                .trim()
                .parse::<u64>()
                .map_err(|_e| ParseError::invalid_content_length(format!("value {cl_str} is not u64")))?;

            match usize::try_from(length) {
                Ok(length) if length <= max_body_bytes => Ok(length),
                _ => Err(ParseError::TooLargeBody { declared: length, max_size: max_body_bytes }),
            }
        }

        (Some(_), Some(_)) => {
            Err(ParseError::invalid_content_length("transfer_encoding and content_length both present in headers"))
        }
    }
}

fn to_header_map(headers: &[httparse::Header<'_>]) -> Result<HeaderMap, ParseError> {
    let mut header_map = HeaderMap::with_capacity(headers.len());
    for header in headers {
        let name = HeaderName::from_bytes(header.name.as_bytes()).map_err(ParseError::invalid_header)?;
        let value = HeaderValue::from_bytes(header.value).map_err(ParseError::invalid_header)?;
        header_map.append(name, value);
    }
    Ok(header_map)
}

/// Decodes a head whose version `httparse` refused.
///
/// The request line is split by hand, the headers go through
/// [`httparse::parse_headers`] and the body is framed as for any other request.
fn decode_foreign_version(src: &mut BytesMut, max_body_bytes: usize) -> Result<Option<PendingBody>, ParseError> {
    let Some(line_end) = src.windows(2).position(|w| w == b"\r\n") else {
        ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
        return Ok(None);
    };
    let line = std::str::from_utf8(&src[..line_end]).map_err(ParseError::invalid_header)?;

    let mut parts = line.split(' ');
    let (Some(method), Some(target), Some(version), None) = (parts.next(), parts.next(), parts.next(), parts.next()) else {
        return Err(ParseError::invalid_header(format!("malformed request line {line:?}")));
    };

    let method = Method::from_bytes(method.as_bytes()).map_err(|_e| ParseError::InvalidMethod)?;
    let uri = Uri::try_from(target).map_err(|_e| ParseError::InvalidUri)?;
    let proto = parse_version(version).ok_or_else(|| ParseError::invalid_header(format!("invalid http version {version:?}")))?;

    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
    let (head_size, header_map) = match httparse::parse_headers(&src[line_end + 2..], &mut headers) {
        Ok(Status::Complete((size, parsed))) => (line_end + 2 + size, to_header_map(parsed)?),
        Ok(Status::Partial) => {
            ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
            return Ok(None);
        }
        Err(httparse::Error::TooManyHeaders) => return Err(ParseError::too_many_headers(MAX_HEADER_NUM)),
        Err(e) => return Err(ParseError::invalid_header(e)),
    };
    ensure!(head_size <= MAX_HEADER_BYTES, ParseError::too_large_header(head_size, MAX_HEADER_BYTES));

    let length = body_length(&header_map, max_body_bytes)?;
    src.advance(head_size);
    trace!(%proto, header_size = head_size, body_size = length, "decoded request with foreign version");

    let builder = InboundRequest::builder().method(method).uri(uri).proto(proto).headers(header_map);
    Ok(Some(PendingBody { builder, length }))
}

fn parse_version(version: &str) -> Option<HttpProto> {
    let (major, minor) = version.strip_prefix("HTTP/")?.split_once('.')?;
    Some(HttpProto::new(major.parse().ok()?, minor.parse().ok()?))
}
