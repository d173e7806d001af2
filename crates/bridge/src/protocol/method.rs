use std::fmt;

use http::Method;

/// Request methods the resource router understands.
///
/// Everything else collapses into [`RequestMethod::Unknown`]; rejecting it is
/// the router's business, not the adapter's.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Options,
    Patch,
    Unknown,
}

impl RequestMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestMethod::Get => "GET",
            RequestMethod::Head => "HEAD",
            RequestMethod::Post => "POST",
            RequestMethod::Put => "PUT",
            RequestMethod::Delete => "DELETE",
            RequestMethod::Options => "OPTIONS",
            RequestMethod::Patch => "PATCH",
            RequestMethod::Unknown => "UNKNOWN",
        }
    }
}

impl From<&Method> for RequestMethod {
    fn from(method: &Method) -> Self {
        match *method {
            Method::GET => RequestMethod::Get,
            Method::HEAD => RequestMethod::Head,
            Method::POST => RequestMethod::Post,
            Method::PUT => RequestMethod::Put,
            Method::DELETE => RequestMethod::Delete,
            Method::OPTIONS => RequestMethod::Options,
            Method::PATCH => RequestMethod::Patch,
            _ => RequestMethod::Unknown,
        }
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
