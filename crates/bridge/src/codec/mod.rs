//! Wire codecs.
//!
//! - [`RequestDecoder`]: engine side, bytes to complete [`InboundRequest`](crate::protocol::InboundRequest)s
//! - [`ReplyEncoder`]: the reply framer, [`Reply`](crate::protocol::Reply) to HTTP/1.x bytes
//!
//! Both implement the `tokio_util` codec traits so they plug into
//! `FramedRead` / `FramedWrite` as well as being called directly.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use http::StatusCode;
//! use micro_bridge::codec::ReplyEncoder;
//! use micro_bridge::protocol::{ProtocolVersion, Reply};
//! use tokio_util::codec::Encoder;
//!
//! let mut dst = BytesMut::new();
//! let reply = Reply::bare(ProtocolVersion::Http11, true, StatusCode::NO_CONTENT);
//! ReplyEncoder::new().encode(reply, &mut dst).unwrap();
//! assert_eq!(&dst[..], b"HTTP/1.1 204 No Content\r\n\r\n");
//! ```

mod reply_encoder;
mod request_decoder;

pub use reply_encoder::KeepAlivePolicy;
pub use reply_encoder::ReplyEncoder;
pub use reply_encoder::allows_content_length;
pub use request_decoder::RequestDecoder;
