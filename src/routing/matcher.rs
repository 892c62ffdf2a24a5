//! Ingress rule matching logic.
//!
//! # Responsibilities
//! - Match hostname (exact or single leading wildcard, case-insensitive)
//! - Match path prefix (case-sensitive)
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Host matching is case-insensitive and ignores the port
//! - Path matching is case-sensitive
//! - Empty condition = always matches (wildcard)
//! - No regex to guarantee O(n) matching
//! - Matchers are plain data so compiled rule sets can be compared

use crate::routing::request::InboundRequest;

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &InboundRequest) -> bool;
}

/// Matches the request hostname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostMatcher {
    Any,
    Exact(String),
    /// Stored as `.example.com` for `*.example.com`.
    WildcardSuffix(String),
}

impl HostMatcher {
    /// Build from a validated pattern. The pattern is lowercased.
    pub fn new(pattern: Option<&str>) -> Self {
        match pattern {
            None => HostMatcher::Any,
            Some(p) => {
                let p = p.to_ascii_lowercase();
                match p.strip_prefix('*') {
                    Some(suffix) => HostMatcher::WildcardSuffix(suffix.to_string()),
                    None => HostMatcher::Exact(p),
                }
            }
        }
    }

    fn matches_host(&self, host: &str) -> bool {
        match self {
            HostMatcher::Any => true,
            HostMatcher::Exact(expected) => host == expected,
            // the wildcard label must be non-empty, so the apex never matches
            HostMatcher::WildcardSuffix(suffix) => {
                host.len() > suffix.len() && host.ends_with(suffix.as_str())
            }
        }
    }
}

impl Matcher for HostMatcher {
    fn matches(&self, req: &InboundRequest) -> bool {
        match self {
            HostMatcher::Any => true,
            _ => self.matches_host(&req.normalized_host()),
        }
    }
}

/// Matches the request path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMatcher {
    Any,
    Prefix(String),
}

impl PathMatcher {
    pub fn new(pattern: Option<&str>) -> Self {
        match pattern {
            None => PathMatcher::Any,
            Some(p) => PathMatcher::Prefix(p.to_string()),
        }
    }
}

impl Matcher for PathMatcher {
    fn matches(&self, req: &InboundRequest) -> bool {
        match self {
            PathMatcher::Any => true,
            PathMatcher::Prefix(prefix) => req.path.starts_with(prefix.as_str()),
        }
    }
}

/// Hostname AND path. Either side may be `Any`; both `Any` is the catch-all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatcher {
    pub host: HostMatcher,
    pub path: PathMatcher,
}

impl RuleMatcher {
    pub fn new(hostname: Option<&str>, path: Option<&str>) -> Self {
        Self {
            host: HostMatcher::new(hostname),
            path: PathMatcher::new(path),
        }
    }

    pub fn is_catch_all(&self) -> bool {
        self.host == HostMatcher::Any && self.path == PathMatcher::Any
    }
}

impl Matcher for RuleMatcher {
    fn matches(&self, req: &InboundRequest) -> bool {
        // All conditions must pass (AND)
        self.host.matches(req) && self.path.matches(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(host: &str, path: &str) -> InboundRequest {
        InboundRequest::new(host, path, "127.0.0.1".parse().unwrap())
    }

    #[test]
    fn test_host_matcher() {
        let matcher = HostMatcher::new(Some("example.com"));

        assert!(matcher.matches(&req("example.com", "/")));
        assert!(matcher.matches(&req("EXAMPLE.COM", "/"))); // Case insensitive
        assert!(matcher.matches(&req("example.com:443", "/")));
        assert!(!matcher.matches(&req("other.com", "/")));
        assert!(!matcher.matches(&req("a.example.com", "/")));
    }

    #[test]
    fn test_wildcard_host_matcher() {
        let matcher = HostMatcher::new(Some("*.Example.com"));

        assert!(matcher.matches(&req("a.example.com", "/")));
        assert!(matcher.matches(&req("a.b.example.com", "/")));
        assert!(!matcher.matches(&req("example.com", "/")));
        assert!(!matcher.matches(&req("evil-example.com", "/")));
        assert!(!matcher.matches(&req(".example.com", "/")));
    }

    #[test]
    fn test_path_matcher() {
        let matcher = PathMatcher::new(Some("/api"));

        assert!(matcher.matches(&req("example.com", "/api/v1")));
        assert!(!matcher.matches(&req("example.com", "/images")));
        assert!(!matcher.matches(&req("example.com", "/API")));
    }

    #[test]
    fn test_rule_matcher_requires_both() {
        let matcher = RuleMatcher::new(Some("a.example.com"), Some("/api"));

        assert!(matcher.matches(&req("a.example.com", "/api/x")));
        assert!(!matcher.matches(&req("a.example.com", "/x")));
        assert!(!matcher.matches(&req("b.example.com", "/api/x")));
    }

    #[test]
    fn test_catch_all() {
        let matcher = RuleMatcher::new(None, None);
        assert!(matcher.is_catch_all());
        assert!(matcher.matches(&req("anything.invalid", "")));
    }
}
