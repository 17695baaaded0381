//! Per-request context consumed by the gates.

use std::net::{IpAddr, SocketAddr};

use bytes::Bytes;
use pixgate_auth::AuthError;
use pixgate_auth::canonical::Params;

/// Header carrying the proxy chain, client first.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
/// Header carrying the client address set by a reverse proxy.
pub const X_REAL_IP: &str = "x-real-ip";

/// Everything the gates need to know about a request.
///
/// Built once per request and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// HTTP method.
    pub method: http::Method,
    /// URI path without the query string.
    pub path: String,
    /// Decoded query parameters.
    pub params: Params,
    /// Buffered request body, `None` if it could not be read.
    pub body: Option<Bytes>,
    /// Resolved client address.
    pub client_ip: Option<IpAddr>,
}

impl RequestContext {
    /// Create a context with no parameters, an empty body and no client address.
    #[must_use]
    pub fn new(method: http::Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: Params::new(),
            body: Some(Bytes::new()),
            client_ip: None,
        }
    }

    /// Build a context from request parts and the collected body.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MalformedQuery`] if the query string does not
    /// decode to UTF-8.
    pub fn from_parts(
        parts: &http::request::Parts,
        body: Option<Bytes>,
        peer_addr: Option<SocketAddr>,
        trust_forwarded_headers: bool,
    ) -> Result<Self, AuthError> {
        Self::without_query(parts, body, peer_addr, trust_forwarded_headers)
            .with_query(parts.uri.query().unwrap_or_default())
    }

    /// Build a context from request parts, leaving the parameters empty.
    #[must_use]
    pub fn without_query(
        parts: &http::request::Parts,
        body: Option<Bytes>,
        peer_addr: Option<SocketAddr>,
        trust_forwarded_headers: bool,
    ) -> Self {
        Self {
            method: parts.method.clone(),
            path: parts.uri.path().to_owned(),
            params: Params::new(),
            body,
            client_ip: resolve_client_ip(&parts.headers, peer_addr, trust_forwarded_headers),
        }
    }

    /// Replace the parameters with those decoded from `query`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MalformedQuery`] if `query` does not decode to UTF-8.
    pub fn with_query(mut self, query: &str) -> Result<Self, AuthError> {
        self.params = Params::from_query(query)?;
        Ok(self)
    }

    /// Replace the body.
    #[must_use]
    pub fn with_body(mut self, body: Option<Bytes>) -> Self {
        self.body = body;
        self
    }

    /// Set the client address.
    #[must_use]
    pub fn with_client_ip(mut self, ip: IpAddr) -> Self {
        self.client_ip = Some(ip);
        self
    }
}

/// Work out the client address.
///
/// Proxy headers are consulted only when `trust_forwarded_headers` is set:
/// the first parseable `X-Forwarded-For` entry wins, then `X-Real-IP`. The TCP
/// peer address is the fallback.
#[must_use]
pub fn resolve_client_ip(
    headers: &http::HeaderMap,
    peer_addr: Option<SocketAddr>,
    trust_forwarded_headers: bool,
) -> Option<IpAddr> {
    let forwarded: Option<IpAddr> = trust_forwarded_headers
        .then(|| {
            header_str(headers, X_FORWARDED_FOR)
                .and_then(|v| v.split(',').find_map(|item| item.trim().parse().ok()))
                .or_else(|| header_str(headers, X_REAL_IP).and_then(|v| v.trim().parse().ok()))
        })
        .flatten();

    forwarded
        .or_else(|| peer_addr.map(|addr| addr.ip()))
        .map(|ip| ip.to_canonical())
}

fn header_str<'a>(headers: &'a http::HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(uri: &str, headers: &[(&str, &str)]) -> http::request::Parts {
        let mut builder = http::Request::builder().method(http::Method::POST).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn peer() -> Option<SocketAddr> {
        Some("192.168.1.5:40000".parse().unwrap())
    }

    #[test]
    fn test_should_split_path_and_query() {
        let parts = parts("/upload?w=100&h=50&tag=a&tag=b", &[]);
        let ctx = RequestContext::from_parts(&parts, Some(Bytes::from_static(b"x")), peer(), false)
            .unwrap();
        assert_eq!(ctx.method, http::Method::POST);
        assert_eq!(ctx.path, "/upload");
        assert_eq!(ctx.params.first("w"), Some("100"));
        assert_eq!(ctx.params.len(), 3);
        assert_eq!(ctx.body.as_deref(), Some(&b"x"[..]));
    }

    #[test]
    fn test_should_reject_non_utf8_query_but_keep_client_ip() {
        let parts = parts("/display?url=caf%E9", &[]);
        let err = RequestContext::from_parts(&parts, None, peer(), false).unwrap_err();
        assert!(matches!(err, AuthError::MalformedQuery(_)));

        let bare = RequestContext::without_query(&parts, None, peer(), false);
        assert_eq!(bare.path, "/display");
        assert!(bare.params.is_empty());
        assert_eq!(bare.client_ip, Some("192.168.1.5".parse().unwrap()));
    }

    #[test]
    fn test_should_use_peer_address_by_default() {
        let headers = parts("/", &[(X_FORWARDED_FOR, "10.0.0.1")]).headers;
        assert_eq!(
            resolve_client_ip(&headers, peer(), false),
            Some("192.168.1.5".parse().unwrap())
        );
    }

    #[test]
    fn test_should_prefer_forwarded_for_when_trusted() {
        let headers = parts(
            "/",
            &[(X_FORWARDED_FOR, "garbage, 10.0.0.1, 10.0.0.2"), (X_REAL_IP, "10.0.0.9")],
        )
        .headers;
        assert_eq!(
            resolve_client_ip(&headers, peer(), true),
            Some("10.0.0.1".parse().unwrap())
        );
    }

    #[test]
    fn test_should_fall_back_to_real_ip_then_peer() {
        let headers = parts("/", &[(X_REAL_IP, "10.0.0.9")]).headers;
        assert_eq!(
            resolve_client_ip(&headers, peer(), true),
            Some("10.0.0.9".parse().unwrap())
        );

        let headers = parts("/", &[(X_REAL_IP, "nope")]).headers;
        assert_eq!(
            resolve_client_ip(&headers, peer(), true),
            Some("192.168.1.5".parse().unwrap())
        );
        assert_eq!(resolve_client_ip(&headers, None, true), None);
    }

    #[test]
    fn test_should_unmap_ipv4_mapped_addresses() {
        let peer: SocketAddr = "[::ffff:10.0.0.1]:80".parse().unwrap();
        assert_eq!(
            resolve_client_ip(&http::HeaderMap::new(), Some(peer), false),
            Some("10.0.0.1".parse().unwrap())
        );
    }
}
