//! Request context
//!
//! Client details captured from the incoming request and stored alongside
//! activity and contact rows.

use http::HeaderMap;
use http::header::USER_AGENT;

/// Client IP and user agent of the request that triggered a write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    /// Extract from request headers
    ///
    /// The IP is the first `x-forwarded-for` hop, else `x-real-ip`.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let ip_address = header_str(headers, "x-forwarded-for")
            .and_then(|s| s.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| {
                header_str(headers, "x-real-ip")
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
            })
            .map(str::to_string);

        let user_agent = headers
            .get(USER_AGENT)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);

        Self {
            ip_address,
            user_agent,
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|h| h.to_str().ok())
}
