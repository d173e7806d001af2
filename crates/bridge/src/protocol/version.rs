use std::fmt;

/// Protocol version exactly as the client sent it on the request line.
///
/// The engine does not reject versions it does not know; the translator
/// decides, so that the client still receives a structured error.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HttpProto {
    pub major: u8,
    pub minor: u8,
}

impl HttpProto {
    pub const HTTP_10: HttpProto = HttpProto { major: 1, minor: 0 };
    pub const HTTP_11: HttpProto = HttpProto { major: 1, minor: 1 };

    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for HttpProto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/{}.{}", self.major, self.minor)
    }
}

/// Version negotiated for one stream.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum ProtocolVersion {
    Http10,
    Http11,
    /// Not negotiated (yet), or a version this adapter does not speak.
    #[default]
    Unknown,
}

impl ProtocolVersion {
    /// Major and minor numbers put on the status line; unknown replies as 1.0.
    pub fn wire(self) -> (u8, u8) {
        match self {
            ProtocolVersion::Http11 => (1, 1),
            ProtocolVersion::Http10 | ProtocolVersion::Unknown => (1, 0),
        }
    }

    #[inline]
    pub fn is_known(self) -> bool {
        !matches!(self, ProtocolVersion::Unknown)
    }
}

impl From<HttpProto> for ProtocolVersion {
    fn from(proto: HttpProto) -> Self {
        match proto {
            HttpProto::HTTP_10 => ProtocolVersion::Http10,
            HttpProto::HTTP_11 => ProtocolVersion::Http11,
            _ => ProtocolVersion::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_versions() {
        assert_eq!(ProtocolVersion::from(HttpProto::new(1, 0)), ProtocolVersion::Http10);
        assert_eq!(ProtocolVersion::from(HttpProto::new(1, 1)), ProtocolVersion::Http11);
    }

    #[test]
    fn unknown_versions_reply_as_http10() {
        for proto in [HttpProto::new(2, 5), HttpProto::new(1, 9), HttpProto::new(0, 9)] {
            let version = ProtocolVersion::from(proto);
            assert_eq!(version, ProtocolVersion::Unknown);
            assert_eq!(version.wire(), (1, 0));
        }
    }

    #[test]
    fn display() {
        assert_eq!(HttpProto::new(2, 5).to_string(), "HTTP/2.5");
    }
}
