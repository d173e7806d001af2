//! The transport normalization adapter.
//!
//! - [`header`]: `HTTP_<NAME>` canonicalization of inbound headers
//! - [`translate`]: inbound request to [`CanonicalParams`](crate::protocol::CanonicalParams) and query vector
//! - [`upgrade`]: the `h2c` handshake
//! - [`errors`]: structured client error documents
//! - [`fallback`]: the `500` of last resort
//! - [`Bridge`]: runs the above for one request against a [`ConnectionContext`]

mod bridge;
mod context;

pub mod errors;
pub mod fallback;
pub mod header;
pub mod translate;
pub mod upgrade;

pub use bridge::Bridge;
pub use bridge::Exchange;
pub use context::ConnectionContext;
pub use context::ConnectionId;
pub use errors::ErrorDescriptor;
pub use errors::ErrorEncoding;
pub use errors::ErrorResponder;
pub use errors::RestconfErrors;
pub use fallback::ErrorFallback;
pub use fallback::LastError;
