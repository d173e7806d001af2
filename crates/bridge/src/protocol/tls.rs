use tracing::trace;

use crate::protocol::percent_decode;

/// What the engine learned from a completed TLS handshake.
///
/// The handshake and certificate validation happen elsewhere; the adapter only
/// reads the outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsSession {
    subject: Option<String>,
    verified: bool,
}

impl TlsSession {
    /// A session whose peer presented `subject`, in one-line form such as
    /// `/C=SE/O=Example/CN=alice`.
    pub fn with_subject(subject: impl Into<String>, verified: bool) -> Self {
        Self { subject: Some(subject.into()), verified }
    }

    /// A session without a client certificate.
    pub fn anonymous() -> Self {
        Self { subject: None, verified: false }
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn is_verified(&self) -> bool {
        self.verified
    }

    /// Common name of the peer certificate, if the subject carries one.
    pub fn common_name(&self) -> Option<String> {
        self.subject().and_then(|subject| subject_attribute(subject, "CN"))
    }
}

/// Splits a one-line distinguished name into `key=value` attributes.
///
/// Attributes are separated by `/`, values are percent-decoded when they are
/// well formed and kept verbatim otherwise.
pub fn subject_attributes(subject: &str) -> Vec<(&str, String)> {
    subject
        .split('/')
        .filter_map(|attr| attr.split_once('='))
        .map(|(key, value)| {
            let value = percent_decode(value).unwrap_or_else(|e| {
                trace!(key, cause = %e, "subject value kept verbatim");
                value.to_owned()
            });
            (key, value)
        })
        .collect()
}

/// Value of the first attribute named `key`.
pub fn subject_attribute(subject: &str, key: &str) -> Option<String> {
    subject_attributes(subject).into_iter().find(|(k, _)| *k == key).map(|(_, v)| v)
}
