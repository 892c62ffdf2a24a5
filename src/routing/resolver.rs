//! Per-request resolution.
//!
//! # Responsibilities
//! - Find the matching rule for a request
//! - Refuse a rule that requires identity when no token was sent
//! - Apply the rule's IP gate, then its identity gate
//! - Return exactly one outcome: matched or denied
//!
//! # Design Decisions
//! - Stateless per call; the only shared state is the immutable [`RuleSet`]
//! - The identity verifier is the only external call and is bounded by
//!   `verification_timeout`
//! - Denials are values, not errors
//! - A missing token is decided locally, so it yields `AccessDenied` whatever
//!   the IP rules say and never reaches the verifier

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::observability::metrics;
use crate::routing::request::InboundRequest;
use crate::routing::router::{CompiledRule, RuleSet};
use crate::security::access_control::{
    check_access, AccessVerdict, IdentityVerifier, RejectingVerifier,
};
use crate::security::ip_rules::IpVerdict;

pub const DEFAULT_VERIFICATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    IpRuleRejected,
    AccessDenied,
    VerificationTimeout,
    /// No rule matched. Cannot happen for a set compiled from a validated
    /// configuration, which always ends in a catch-all.
    NoMatchingRule,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::IpRuleRejected => "ip_rule_rejected",
            DenyReason::AccessDenied => "access_denied",
            DenyReason::VerificationTimeout => "verification_timeout",
            DenyReason::NoMatchingRule => "no_matching_rule",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of resolving one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<'a> {
    /// Admitted; carries the rule with its effective origin-request config.
    Matched(&'a CompiledRule),
    Denied(DenyReason),
}

impl Outcome<'_> {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Matched(_) => "matched",
            Outcome::Denied(reason) => reason.as_str(),
        }
    }
}

/// Resolves requests against a [`RuleSet`].
#[derive(Clone)]
pub struct Resolver {
    verifier: Arc<dyn IdentityVerifier>,
    verification_timeout: Duration,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(Arc::new(RejectingVerifier))
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("verification_timeout", &self.verification_timeout)
            .finish_non_exhaustive()
    }
}

impl Resolver {
    pub fn new(verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self {
            verifier,
            verification_timeout: DEFAULT_VERIFICATION_TIMEOUT,
        }
    }

    pub fn with_verification_timeout(mut self, timeout: Duration) -> Self {
        self.verification_timeout = timeout;
        self
    }

    /// Match the request and run admission.
    pub async fn resolve<'a>(&self, rules: &'a RuleSet, req: &InboundRequest) -> Outcome<'a> {
        let outcome = self.resolve_inner(rules, req).await;
        metrics::record_resolution(outcome.label());
        outcome
    }

    async fn resolve_inner<'a>(&self, rules: &'a RuleSet, req: &InboundRequest) -> Outcome<'a> {
        let Some(rule) = rules.match_rule(req) else {
            tracing::error!(host = %req.hostname, path = %req.path, "No ingress rule matched");
            return Outcome::Denied(DenyReason::NoMatchingRule);
        };

        // A required identity with no token denies before the IP rules are consulted
        if requires_identity(rule) && !has_token(req) {
            tracing::debug!(
                rule = rule.index,
                host = %req.hostname,
                "Access denied: missing identity token"
            );
            return Outcome::Denied(DenyReason::AccessDenied);
        }

        // 1. IP gate
        let ip_verdict = rule.ip_rules.evaluate(req.source_ip, req.destination_port);
        if let IpVerdict::Deny { rule: ip_rule } = ip_verdict {
            tracing::debug!(
                rule = rule.index,
                ip_rule = ?ip_rule,
                source_ip = %req.source_ip,
                port = ?req.destination_port,
                "Request rejected by IP rules"
            );
            return Outcome::Denied(DenyReason::IpRuleRejected);
        }

        // 2. Identity gate
        let verdict = check_access(
            rule.origin_request.access.as_ref(),
            req.identity_token.as_deref(),
            self.verifier.as_ref(),
            self.verification_timeout,
        )
        .await;

        match verdict {
            AccessVerdict::Granted => Outcome::Matched(rule),
            AccessVerdict::Denied(detail) => {
                tracing::debug!(
                    rule = rule.index,
                    host = %req.hostname,
                    reason = %detail,
                    "Access denied"
                );
                Outcome::Denied(DenyReason::AccessDenied)
            }
            AccessVerdict::TimedOut => {
                tracing::warn!(
                    rule = rule.index,
                    host = %req.hostname,
                    timeout_ms = self.verification_timeout.as_millis() as u64,
                    "Identity verification timed out"
                );
                Outcome::Denied(DenyReason::VerificationTimeout)
            }
        }
    }
}

fn requires_identity(rule: &CompiledRule) -> bool {
    rule.origin_request.access.as_ref().is_some_and(|access| access.required)
}

fn has_token(req: &InboundRequest) -> bool {
    req.identity_token.as_deref().is_some_and(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{
        AccessConfig, Configuration, IngressIpRule, IngressRule, OriginRequestConfig,
    };
    use crate::config::validation::validate_config;
    use crate::security::access_control::StaticVerifier;

    fn rule_set(origin_request: OriginRequestConfig) -> RuleSet {
        let config = Configuration {
            origin_request,
            ingress: vec![
                IngressRule {
                    hostname: Some("a.example.com".into()),
                    service: "http://localhost:8000".into(),
                    ..Default::default()
                },
                IngressRule {
                    service: "http://localhost:9000".into(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        RuleSet::compile(&validate_config(&config).unwrap())
    }

    fn req(host: &str) -> InboundRequest {
        InboundRequest::new(host, "/x", "10.1.2.3".parse().unwrap())
    }

    #[tokio::test]
    async fn test_matches_without_gates() {
        let rules = rule_set(OriginRequestConfig::default());
        let resolver = Resolver::default();

        match resolver.resolve(&rules, &req("a.example.com")).await {
            Outcome::Matched(rule) => assert_eq!(rule.index, 0),
            other => panic!("unexpected outcome {other:?}"),
        }
        match resolver.resolve(&rules, &req("b.example.com")).await {
            Outcome::Matched(rule) => assert!(rule.is_catch_all()),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ip_gate_runs_before_access() {
        let rules = rule_set(OriginRequestConfig {
            ip_rules: vec![IngressIpRule {
                prefix: Some("10.0.0.0/8".into()),
                ports: vec![],
                allow: false,
            }],
            access: Some(AccessConfig {
                required: true,
                team_name: "acme".into(),
                aud_tag: vec!["aud".into()],
            }),
            ..Default::default()
        });
        let resolver = Resolver::new(Arc::new(StaticVerifier::new(["aud"])));

        let outcome = resolver.resolve(&rules, &req("a.example.com").with_token("t")).await;
        assert_eq!(outcome, Outcome::Denied(DenyReason::IpRuleRejected));
    }

    #[tokio::test]
    async fn test_missing_token_denied_before_ip_gate() {
        let rules = rule_set(OriginRequestConfig {
            ip_rules: vec![IngressIpRule {
                prefix: Some("10.0.0.0/8".into()),
                ports: vec![],
                allow: false,
            }],
            access: Some(AccessConfig {
                required: true,
                team_name: "acme".into(),
                aud_tag: vec!["aud".into()],
            }),
            ..Default::default()
        });
        let resolver = Resolver::new(Arc::new(StaticVerifier::new(["aud"])));

        let outcome = resolver.resolve(&rules, &req("a.example.com")).await;
        assert_eq!(outcome, Outcome::Denied(DenyReason::AccessDenied));

        let outcome = resolver.resolve(&rules, &req("a.example.com").with_token("")).await;
        assert_eq!(outcome, Outcome::Denied(DenyReason::AccessDenied));
    }

    #[tokio::test]
    async fn test_access_granted_with_token() {
        let rules = rule_set(OriginRequestConfig {
            access: Some(AccessConfig {
                required: true,
                team_name: "acme".into(),
                aud_tag: vec!["aud".into()],
            }),
            ..Default::default()
        });
        let resolver = Resolver::new(Arc::new(StaticVerifier::new(["aud"]).for_team("acme")));

        let outcome = resolver.resolve(&rules, &req("a.example.com").with_token("t")).await;
        assert!(matches!(outcome, Outcome::Matched(rule) if rule.index == 0));
        assert_eq!(outcome.label(), "matched");

        let outcome = resolver.resolve(&rules, &req("a.example.com")).await;
        assert_eq!(outcome, Outcome::Denied(DenyReason::AccessDenied));
        assert_eq!(outcome.label(), "access_denied");
    }
}
