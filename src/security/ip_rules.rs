//! IP admission rules.
//!
//! # Responsibilities
//! - Parse `ipRules` entries into CIDR networks once, at compile time
//! - Evaluate a source address and destination port against the rules
//!
//! # Design Decisions
//! - Rules are evaluated in declaration order; the first match decides
//! - Overlapping prefixes are allowed, so a broad deny listed first shadows a
//!   narrower allow listed later
//! - No match means deny; an empty rule list applies no IP gate at all
//! - IPv4-mapped IPv6 sources are compared as IPv4

use std::net::IpAddr;

use ipnet::IpNet;
use thiserror::Error;

use crate::config::schema::IngressIpRule;

/// A rule prefix that does not parse as a CIDR network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid CIDR prefix '{prefix}'")]
pub struct InvalidCidr {
    pub prefix: String,
}

/// A parsed allow/deny entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpRule {
    network: IpNet,
    ports: Vec<u16>,
    allow: bool,
}

impl IpRule {
    /// Parse a configured rule. The prefix must be in `addr/len` form.
    pub fn parse(rule: &IngressIpRule) -> Result<Self, InvalidCidr> {
        let raw = rule.prefix.as_deref().unwrap_or_default();
        let network: IpNet = raw.trim().parse().map_err(|_| InvalidCidr {
            prefix: raw.to_string(),
        })?;

        Ok(Self {
            network,
            ports: rule.ports.clone(),
            allow: rule.allow,
        })
    }

    pub fn network(&self) -> IpNet {
        self.network
    }

    pub fn allow(&self) -> bool {
        self.allow
    }

    /// True if `ip` is inside the prefix and `port` is covered.
    ///
    /// A rule restricted to ports never matches a request whose
    /// destination port is unknown.
    pub fn matches(&self, ip: IpAddr, port: Option<u16>) -> bool {
        if !self.network.contains(&ip.to_canonical()) {
            return false;
        }
        if self.ports.is_empty() {
            return true;
        }
        port.is_some_and(|p| self.ports.contains(&p))
    }
}

/// Outcome of evaluating an [`IpRuleSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpVerdict {
    /// Admitted. `rule` is the index of the deciding rule, if any.
    Allow { rule: Option<usize> },
    /// Rejected. `rule` is `None` when nothing matched.
    Deny { rule: Option<usize> },
}

impl IpVerdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, IpVerdict::Allow { .. })
    }
}

/// Ordered list of parsed IP rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpRuleSet {
    rules: Vec<IpRule>,
    reject_all: bool,
}

impl IpRuleSet {
    /// Parse every rule, failing on the first invalid prefix.
    pub fn compile(rules: &[IngressIpRule]) -> Result<Self, InvalidCidr> {
        let rules = rules.iter().map(IpRule::parse).collect::<Result<_, _>>()?;
        Ok(Self {
            rules,
            reject_all: false,
        })
    }

    /// A set that rejects every source. Used when compilation of an
    /// already-validated rule list fails, so the gate never opens by mistake.
    pub fn deny_all() -> Self {
        Self {
            rules: Vec::new(),
            reject_all: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && !self.reject_all
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn rules(&self) -> &[IpRule] {
        &self.rules
    }

    /// First matching rule decides; no match denies.
    pub fn evaluate(&self, ip: IpAddr, port: Option<u16>) -> IpVerdict {
        if self.reject_all {
            return IpVerdict::Deny { rule: None };
        }
        if self.rules.is_empty() {
            return IpVerdict::Allow { rule: None };
        }

        match self.rules.iter().position(|r| r.matches(ip, port)) {
            Some(i) if self.rules[i].allow => IpVerdict::Allow { rule: Some(i) },
            Some(i) => IpVerdict::Deny { rule: Some(i) },
            None => IpVerdict::Deny { rule: None },
        }
    }
}
