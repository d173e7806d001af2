use std::collections::TryReserveError;
use std::io;

use http::StatusCode;
use thiserror::Error;

use crate::protocol::DecodeError;

/// Top-level error of a served connection.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },
}

/// Failures of the hosting engine while turning bytes into an [`InboundRequest`](crate::protocol::InboundRequest).
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid http method")]
    InvalidMethod,

    #[error("invalid http uri")]
    InvalidUri,

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("body size too large, declared: {declared} exceed the limit {max_size}")]
    TooLargeBody { declared: u64, max_size: usize },

    #[error("unsupported transfer encoding: {encoding}")]
    UnsupportedTransferEncoding { encoding: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn unsupported_transfer_encoding<S: ToString>(str: S) -> Self {
        Self::UnsupportedTransferEncoding { encoding: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    /// Status of the bare reply the engine sends before closing the connection.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::TooLargeBody { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedTransferEncoding { .. } => StatusCode::NOT_IMPLEMENTED,
            Self::TooLargeHeader { .. } | Self::TooManyHeaders { .. } => StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

/// Errors raised while translating one request or framing its reply.
///
/// The first four variants are caused by the client and are answered with a
/// structured client error; the connection stays open. `Allocation` and
/// `InternalFatal` escalate to the error fallback, which answers `500`.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("malformed uri: {reason}")]
    MalformedUri { reason: &'static str },

    #[error("invalid http version {major}.{minor}")]
    ProtocolVersion { major: u8, minor: u8 },

    #[error("query decode error: {source}")]
    Decode {
        #[from]
        source: DecodeError,
    },

    #[error("invalid upgrade token: {token}")]
    UpgradeToken { token: String },

    #[error("allocation failed: {source}")]
    Allocation {
        #[from]
        source: TryReserveError,
    },

    #[error("internal error: {reason}")]
    InternalFatal { reason: String },
}

impl BridgeError {
    pub fn malformed_uri(reason: &'static str) -> Self {
        Self::MalformedUri { reason }
    }

    pub fn upgrade_token<S: ToString>(token: S) -> Self {
        Self::UpgradeToken { token: token.to_string() }
    }

    pub fn internal<S: ToString>(str: S) -> Self {
        Self::InternalFatal { reason: str.to_string() }
    }

    /// True for errors caused by the request itself rather than by the server.
    #[inline]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::MalformedUri { .. } | Self::ProtocolVersion { .. } | Self::Decode { .. } | Self::UpgradeToken { .. })
    }
}

impl From<SendError> for BridgeError {
    fn from(e: SendError) -> Self {
        Self::InternalFatal { reason: e.to_string() }
    }
}
