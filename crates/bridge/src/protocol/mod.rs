//! Data model shared by the adapter and the hosting engine.
//!
//! - **Inbound side** ([`request`], [`version`], [`method`], [`tls`]): the
//!   engine-specific request and what the TLS layer negotiated
//!   - [`InboundRequest`]: method, target, raw version, headers and body
//!   - [`HttpProto`] / [`ProtocolVersion`]: raw and negotiated versions
//!   - [`RequestMethod`]: the closed method enumeration with an `UNKNOWN` fallback
//!   - [`TlsSession`]: peer subject and verification outcome
//!
//! - **Canonical side** ([`params`], [`query`]): what the router consumes
//!   - [`CanonicalParams`]: `REQUEST_METHOD`, `REQUEST_URI`, `HTTPS`, `SSL_CN`, `HTTP_*`
//!   - [`QueryVector`]: ordered, duplicate preserving query pairs
//!
//! - **Outbound side** ([`stream`]): [`StreamState`] and the detached [`Reply`]
//!
//! - **Errors** ([`error`]): [`BridgeError`] for translation and framing,
//!   [`ParseError`] / [`SendError`] / [`HttpError`] for the engine

mod error;
pub use error::BridgeError;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;

mod method;
pub use method::RequestMethod;

mod version;
pub use version::HttpProto;
pub use version::ProtocolVersion;

pub mod params;
pub use params::CanonicalParams;
pub use params::ParamsDisposition;

mod query;
pub use query::DecodeError;
pub use query::QueryVector;
pub use query::decode_query;
pub use query::percent_decode;

mod request;
pub use request::InboundRequest;
pub use request::InboundRequestBuilder;

mod stream;
pub use stream::Reply;
pub use stream::ReplyHeaders;
pub use stream::StreamState;
pub use stream::UpgradeState;

mod tls;
pub use tls::TlsSession;
pub use tls::subject_attribute;
pub use tls::subject_attributes;
