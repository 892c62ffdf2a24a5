//! Routing-relevant view of an inbound request.

use std::net::IpAddr;

/// The parts of a request that resolution looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundRequest {
    /// Host as received, possibly with a `:port` suffix.
    pub hostname: String,
    pub path: String,
    pub source_ip: IpAddr,
    pub destination_port: Option<u16>,
    pub identity_token: Option<String>,
}

impl InboundRequest {
    pub fn new(hostname: impl Into<String>, path: impl Into<String>, source_ip: IpAddr) -> Self {
        Self {
            hostname: hostname.into(),
            path: path.into(),
            source_ip,
            destination_port: None,
            identity_token: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.destination_port = Some(port);
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.identity_token = Some(token.into());
        self
    }

    /// Lowercased host without port or trailing dot.
    pub fn normalized_host(&self) -> String {
        normalize_host(&self.hostname)
    }
}

/// Lowercase `host`, strip a `:port` suffix and a trailing dot.
///
/// Bracketed IPv6 literals (`[::1]:8080`) keep their brackets.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let without_port = if host.starts_with('[') {
        match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        }
    } else {
        match host.rsplit_once(':') {
            Some((h, port)) if !h.contains(':') && port.chars().all(|c| c.is_ascii_digit()) => h,
            _ => host,
        }
    };
    without_port.trim_end_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("Example.COM"), "example.com");
        assert_eq!(normalize_host("example.com:8443"), "example.com");
        assert_eq!(normalize_host("example.com."), "example.com");
        assert_eq!(normalize_host("[::1]:8080"), "[::1]");
        assert_eq!(normalize_host("::1"), "::1");
    }

    #[test]
    fn test_builder() {
        let req = InboundRequest::new("a.example.com", "/", "10.0.0.1".parse().unwrap())
            .with_port(443)
            .with_token("jwt");
        assert_eq!(req.destination_port, Some(443));
        assert_eq!(req.identity_token.as_deref(), Some("jwt"));
    }
}
