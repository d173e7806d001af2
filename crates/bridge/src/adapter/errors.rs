//! Structured error replies.
//!
//! Client errors carry a machine readable RESTCONF `errors` document. The
//! document is produced behind the [`ErrorResponder`] seam so that a host with
//! its own serializer can plug it in; [`RestconfErrors`] is the default.

use std::fmt::Write;

use http::StatusCode;
use mime::Mime;
use serde::Serialize;

use crate::protocol::{BridgeError, StreamState};

pub const YANG_DATA_JSON: &str = "application/yang-data+json";
pub const YANG_DATA_XML: &str = "application/yang-data+xml";

const RESTCONF_NAMESPACE: &str = "urn:ietf:params:xml:ns:yang:ietf-restconf";

/// Encoding of a structured error document.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum ErrorEncoding {
    #[default]
    Json,
    Xml,
}

impl ErrorEncoding {
    pub fn content_type(self) -> &'static str {
        match self {
            ErrorEncoding::Json => YANG_DATA_JSON,
            ErrorEncoding::Xml => YANG_DATA_XML,
        }
    }

    /// Picks the first JSON or XML media range of an `Accept` header value,
    /// falling back to the default when there is none.
    pub fn from_accept(accept: &str) -> Self {
        accept
            .split(',')
            .filter_map(|range| range.trim().parse::<Mime>().ok())
            .find_map(|mime| {
                if mime.subtype() == mime::JSON || mime.suffix() == Some(mime::JSON) {
                    Some(ErrorEncoding::Json)
                } else if mime.subtype() == mime::XML || mime.suffix() == Some(mime::XML) {
                    Some(ErrorEncoding::Xml)
                } else {
                    None
                }
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorType {
    Transport,
    Rpc,
    Protocol,
    Application,
}

impl ErrorType {
    fn as_str(self) -> &'static str {
        match self {
            ErrorType::Transport => "transport",
            ErrorType::Rpc => "rpc",
            ErrorType::Protocol => "protocol",
            ErrorType::Application => "application",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorTag {
    InvalidValue,
    MalformedMessage,
    AccessDenied,
    OperationNotSupported,
    OperationFailed,
}

impl ErrorTag {
    fn as_str(self) -> &'static str {
        match self {
            ErrorTag::InvalidValue => "invalid-value",
            ErrorTag::MalformedMessage => "malformed-message",
            ErrorTag::AccessDenied => "access-denied",
            ErrorTag::OperationNotSupported => "operation-not-supported",
            ErrorTag::OperationFailed => "operation-failed",
        }
    }

    /// Default status for the tag, following RFC 8040 section 7.
    pub fn status(self) -> StatusCode {
        match self {
            ErrorTag::InvalidValue | ErrorTag::MalformedMessage => StatusCode::BAD_REQUEST,
            ErrorTag::AccessDenied => StatusCode::FORBIDDEN,
            ErrorTag::OperationNotSupported => StatusCode::METHOD_NOT_ALLOWED,
            ErrorTag::OperationFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// One error to report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDescriptor {
    pub error_type: ErrorType,
    pub tag: ErrorTag,
    pub message: String,
    pub status: StatusCode,
}

impl ErrorDescriptor {
    pub fn new(error_type: ErrorType, tag: ErrorTag, message: impl Into<String>) -> Self {
        Self { error_type, tag, message: message.into(), status: tag.status() }
    }

    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::new(ErrorType::Protocol, ErrorTag::InvalidValue, message)
    }

    pub fn malformed_message(message: impl Into<String>) -> Self {
        Self::new(ErrorType::Protocol, ErrorTag::MalformedMessage, message)
    }

    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorType::Protocol, ErrorTag::AccessDenied, message)
    }

    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Descriptor answering a client error, `None` for server side errors.
    pub fn from_client_error(error: &BridgeError) -> Option<Self> {
        let descriptor = match error {
            BridgeError::MalformedUri { .. } => Self::malformed_message("Invalid request URI"),
            BridgeError::ProtocolVersion { .. } => Self::invalid_value("Invalid HTTP version number"),
            BridgeError::Decode { source } => Self::invalid_value(format!("Invalid query parameter encoding: {source}")),
            BridgeError::UpgradeToken { .. } => Self::invalid_value("Invalid upgrade token"),
            BridgeError::Allocation { .. } | BridgeError::InternalFatal { .. } => return None,
        };
        Some(descriptor)
    }
}

/// Builds the structured reply for a client error into the stream.
pub trait ErrorResponder: Send + Sync {
    fn build(&self, error: &ErrorDescriptor, encoding: ErrorEncoding, pretty: bool, stream: &mut StreamState) -> Result<(), BridgeError>;
}

/// RESTCONF `ietf-restconf:errors` documents in JSON or XML.
#[derive(Debug, Default, Clone, Copy)]
pub struct RestconfErrors;

#[derive(Serialize)]
struct ErrorsDocument<'a> {
    #[serde(rename = "ietf-restconf:errors")]
    errors: ErrorList<'a>,
}

#[derive(Serialize)]
struct ErrorList<'a> {
    error: [ErrorEntry<'a>; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct ErrorEntry<'a> {
    error_type: ErrorType,
    error_tag: ErrorTag,
    error_message: &'a str,
}

impl RestconfErrors {
    fn json(error: &ErrorDescriptor, pretty: bool) -> Result<Vec<u8>, BridgeError> {
        let document = ErrorsDocument {
            errors: ErrorList {
                error: [ErrorEntry { error_type: error.error_type, error_tag: error.tag, error_message: &error.message }],
            },
        };
        let rendered = if pretty { serde_json::to_vec_pretty(&document) } else { serde_json::to_vec(&document) };
        rendered.map_err(|e| BridgeError::internal(format!("serialize error document: {e}")))
    }

    fn xml(error: &ErrorDescriptor, pretty: bool) -> Vec<u8> {
        let (nl, indent) = if pretty { ("\n", "  ") } else { ("", "") };
        let mut out = String::with_capacity(256);
        // writing into a String cannot fail
        let _ = write!(
            out,
            "<errors xmlns=\"{RESTCONF_NAMESPACE}\">{nl}{indent}<error>{nl}\
             {indent}{indent}<error-type>{}</error-type>{nl}\
             {indent}{indent}<error-tag>{}</error-tag>{nl}\
             {indent}{indent}<error-message>{}</error-message>{nl}\
             {indent}</error>{nl}</errors>{nl}",
            error.error_type.as_str(),
            error.tag.as_str(),
            escape_xml(&error.message),
        );
        out.into_bytes()
    }
}

impl ErrorResponder for RestconfErrors {
    fn build(&self, error: &ErrorDescriptor, encoding: ErrorEncoding, pretty: bool, stream: &mut StreamState) -> Result<(), BridgeError> {
        let body = match encoding {
            ErrorEncoding::Json => Self::json(error, pretty)?,
            ErrorEncoding::Xml => Self::xml(error, pretty),
        };
        stream.add_header("Content-Type", encoding.content_type())?;
        stream.reply(error.status, &body);
        Ok(())
    }
}

fn escape_xml(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    #[test]
    fn accept_negotiation() {
        assert_eq!(ErrorEncoding::from_accept("application/yang-data+xml"), ErrorEncoding::Xml);
        assert_eq!(ErrorEncoding::from_accept("text/html, application/yang-data+json;q=0.9"), ErrorEncoding::Json);
        assert_eq!(ErrorEncoding::from_accept("application/xml"), ErrorEncoding::Xml);
        assert_eq!(ErrorEncoding::from_accept("*/*"), ErrorEncoding::Json);
        assert_eq!(ErrorEncoding::from_accept("not a mime"), ErrorEncoding::Json);
    }

    #[test]
    fn json_document() {
        let mut stream = StreamState::new();
        RestconfErrors
            .build(&ErrorDescriptor::invalid_value("Invalid upgrade token"), ErrorEncoding::Json, false, &mut stream)
            .unwrap();

        assert_eq!(stream.status(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(stream.headers().get("content-type").unwrap(), YANG_DATA_JSON);

        let body: Value = serde_json::from_slice(stream.body()).unwrap();
        assert_eq!(
            body,
            json!({"ietf-restconf:errors": {"error": [{
                "error-type": "protocol",
                "error-tag": "invalid-value",
                "error-message": "Invalid upgrade token"
            }]}})
        );
    }

    #[test]
    fn pretty_json_is_multiline() {
        let mut stream = StreamState::new();
        RestconfErrors.build(&ErrorDescriptor::invalid_value("x"), ErrorEncoding::Json, true, &mut stream).unwrap();
        assert!(stream.body().contains(&b'\n'));
    }

    #[test]
    fn xml_document_is_escaped() {
        let mut stream = StreamState::new();
        let error = ErrorDescriptor::access_denied("<user> & co").with_status(StatusCode::UNAUTHORIZED);
        RestconfErrors.build(&error, ErrorEncoding::Xml, false, &mut stream).unwrap();

        assert_eq!(stream.status(), Some(StatusCode::UNAUTHORIZED));
        let body = std::str::from_utf8(stream.body()).unwrap();
        assert!(body.starts_with(r#"<errors xmlns="urn:ietf:params:xml:ns:yang:ietf-restconf"><error>"#));
        assert!(body.contains("<error-tag>access-denied</error-tag>"));
        assert!(body.contains("<error-message>&lt;user&gt; &amp; co</error-message>"));
    }

    #[test]
    fn only_client_errors_have_descriptors() {
        let error = BridgeError::ProtocolVersion { major: 2, minor: 5 };
        let descriptor = ErrorDescriptor::from_client_error(&error).unwrap();
        assert_eq!(descriptor.message, "Invalid HTTP version number");
        assert_eq!(descriptor.status, StatusCode::BAD_REQUEST);

        assert!(ErrorDescriptor::from_client_error(&BridgeError::internal("boom")).is_none());
    }
}
