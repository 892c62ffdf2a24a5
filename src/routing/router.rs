//! Compiled ingress rules and lookup.
//!
//! # Responsibilities
//! - Compile validated ingress entries into matchers
//! - Precompute each rule's effective origin-request config and IP gate
//! - Look up the first rule that matches a request
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) ordered scan; declaration order is the only tie-break
//! - Compilation is deterministic, so two sets built from the same document
//!   compare equal
//! - Lookup is total: validation guarantees a terminal catch-all

use crate::config::merge::{merge, EffectiveOriginRequestConfig};
use crate::config::validation::ValidatedConfiguration;
use crate::routing::matcher::{Matcher, RuleMatcher};
use crate::routing::request::InboundRequest;
use crate::routing::service::Service;
use crate::security::ip_rules::IpRuleSet;

/// One ingress rule ready for matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledRule {
    /// Position in the `ingress` list.
    pub index: usize,
    pub matcher: RuleMatcher,
    pub service: Service,
    pub origin_request: EffectiveOriginRequestConfig,
    pub ip_rules: IpRuleSet,
}

impl CompiledRule {
    pub fn is_catch_all(&self) -> bool {
        self.matcher.is_catch_all()
    }
}

/// Ordered, immutable list of compiled rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    tunnel_id: String,
    warp_routing: bool,
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// Compile a validated configuration.
    pub fn compile(validated: &ValidatedConfiguration) -> Self {
        let config = validated.config();

        let rules = config
            .ingress
            .iter()
            .enumerate()
            .map(|(index, rule)| {
                let origin_request = merge(&config.origin_request, &rule.origin_request);
                let ip_rules = IpRuleSet::compile(&origin_request.ip_rules).unwrap_or_else(|e| {
                    tracing::error!(
                        rule = index,
                        error = %e,
                        "IP rules failed to compile; denying all sources"
                    );
                    IpRuleSet::deny_all()
                });
                let service = rule.service.parse::<Service>().unwrap_or_else(|e| {
                    tracing::error!(
                        rule = index,
                        error = %e,
                        "Service failed to parse; answering 502"
                    );
                    Service::HttpStatus(502)
                });

                CompiledRule {
                    index,
                    matcher: RuleMatcher::new(rule.hostname_pattern(), rule.path_pattern()),
                    service,
                    origin_request,
                    ip_rules,
                }
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            tunnel = %config.tunnel_id,
            rule_count = rules.len(),
            "Ingress rules compiled"
        );

        Self {
            tunnel_id: config.tunnel_id.clone(),
            warp_routing: config.warp_routing.enabled,
            rules,
        }
    }

    pub fn tunnel_id(&self) -> &str {
        &self.tunnel_id
    }

    pub fn warp_routing_enabled(&self) -> bool {
        self.warp_routing
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First rule, in declaration order, whose matcher accepts the request.
    ///
    /// Always `Some` for a set compiled from a validated configuration.
    pub fn match_rule(&self, req: &InboundRequest) -> Option<&CompiledRule> {
        self.rules.iter().find(|rule| rule.matcher.matches(req))
    }
}
