//! Clear-text `h2c` upgrade negotiation.
//!
//! ```text
//! NoUpgrade --Upgrade: h2c--> Switched    101, parameters retained
//! NoUpgrade --Upgrade: foo--> ErrorSent   400 invalid-value, parameters cleared
//! ```
//!
//! Only the handshake happens here. Speaking the upgraded protocol is up to
//! whoever takes over the connection.

use bytes::Bytes;
use http::StatusCode;
use tracing::{debug, warn};

use crate::BridgeConfig;
use crate::adapter::errors::{ErrorDescriptor, ErrorEncoding, ErrorResponder};
use crate::protocol::params::{HTTP_HTTP2_SETTINGS, HTTP_UPGRADE};
use crate::protocol::{BridgeError, CanonicalParams, StreamState, UpgradeState};

pub const H2C_TOKEN: &str = "h2c";

/// Inspects the translated parameters for an upgrade request.
///
/// Returns [`UpgradeState::NoUpgrade`] when the feature is disabled or the
/// client did not ask; the caller then goes on with normal routing. Any other
/// state means the reply is already in `stream` and the router must not run.
pub fn negotiate_upgrade(
    config: &BridgeConfig,
    params: &CanonicalParams,
    stream: &mut StreamState,
    responder: &dyn ErrorResponder,
) -> Result<UpgradeState, BridgeError> {
    if !config.h2c_upgrade {
        return Ok(UpgradeState::NoUpgrade);
    }
    let Some(token) = params.get(HTTP_UPGRADE) else {
        return Ok(UpgradeState::NoUpgrade);
    };

    if token != H2C_TOKEN {
        let error = BridgeError::upgrade_token(token);
        warn!(cause = %error, "refusing protocol upgrade");
        let descriptor = ErrorDescriptor::from_client_error(&error)
            .ok_or_else(|| BridgeError::internal("upgrade token error without descriptor"))?;
        responder.build(&descriptor, ErrorEncoding::default(), true, stream)?;
        stream.mark_upgrade_rejected();
        return Ok(UpgradeState::ErrorSent);
    }

    stream.add_header("Connection", "Upgrade")?;
    stream.add_header("Upgrade", H2C_TOKEN)?;
    stream.reply(StatusCode::SWITCHING_PROTOCOLS, b"");

    let settings = params.get(HTTP_HTTP2_SETTINGS).map(|s| Bytes::copy_from_slice(s.as_bytes()));
    debug!(has_settings = settings.is_some(), "switching protocols to h2c");
    stream.mark_upgraded(settings);
    Ok(UpgradeState::Switched)
}
