//! Hosting engine glue.
//!
//! [`HttpConnection`] reads requests with the [`RequestDecoder`](crate::codec::RequestDecoder),
//! hands each one to a shared [`Bridge`](crate::Bridge) and writes the framed
//! reply back. It is the piece a server's accept loop spawns per connection.
//!
//! # Lifecycle
//!
//! - requests are served one at a time, in arrival order
//! - the connection closes when a reply says so (no keep-alive, or a refused
//!   client certificate) or when the peer goes away
//! - a request that cannot be decoded gets a bare error reply and ends the
//!   connection with an [`HttpError`](crate::protocol::HttpError)
//! - an accepted `h2c` upgrade ends processing with an [`UpgradeHandoff`]
//!   carrying the transport and the retained parameters

mod http_connection;

pub use http_connection::HttpConnection;
pub use http_connection::Processed;
pub use http_connection::UpgradeHandoff;
