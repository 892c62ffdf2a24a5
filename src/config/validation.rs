//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check ingress structure: non-empty, catch-all last and only last
//! - Check hostname, path and service well-formedness
//! - Validate IP rule prefixes, proxy type and numeric ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function of the decoded document
//! - Runs before config is accepted into the system; only a
//!   [`ValidatedConfiguration`] can be compiled

use std::fmt;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::merge::ProxyType;
use crate::config::schema::{Configuration, OriginRequestConfig};
use crate::routing::service::Service;
use crate::security::ip_rules::IpRule;

/// Which part of the document an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Global,
    Rule(usize),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => write!(f, "originRequest"),
            Scope::Rule(i) => write!(f, "ingress[{i}]"),
        }
    }
}

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("ingress must contain at least one rule")]
    EmptyIngress,

    #[error("last ingress rule must be a catch-all (no hostname and no path)")]
    MissingCatchAll,

    #[error("ingress[{index}] is a catch-all but is not the last rule")]
    MisplacedCatchAll { index: usize },

    #[error("ingress[{index}] is incomplete: {reason}")]
    IncompleteRule { index: usize, reason: &'static str },

    #[error("ingress[{index}]: invalid hostname pattern '{hostname}'")]
    InvalidHostnamePattern { index: usize, hostname: String },

    #[error("ingress[{index}]: invalid path pattern '{path}'")]
    InvalidPathPattern { index: usize, path: String },

    #[error("ingress[{index}]: {reason}")]
    InvalidService { index: usize, reason: String },

    #[error("{scope}: invalid CIDR prefix '{prefix}'")]
    InvalidCidr { scope: Scope, prefix: String },

    #[error("{scope}: proxyType must be empty or 'socks', got '{value}'")]
    InvalidProxyType { scope: Scope, value: String },

    #[error("{scope}: {field} out of range: {value}")]
    InvalidNumericField {
        scope: Scope,
        field: &'static str,
        value: i64,
    },

    #[error("{scope}: access is required but {reason}")]
    InvalidAccessConfig { scope: Scope, reason: &'static str },

    #[error("{scope}: {first} and {second} cannot be used together")]
    ConflictingFields {
        scope: Scope,
        first: &'static str,
        second: &'static str,
    },

    #[error("metrics address '{0}' is not a valid socket address")]
    InvalidMetricsAddress(String),
}

/// A configuration that passed [`validate_config`].
///
/// Can only be built by validation, so everything downstream may rely on the
/// structural invariants being true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedConfiguration {
    config: Configuration,
}

impl ValidatedConfiguration {
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn into_inner(self) -> Configuration {
        self.config
    }
}

/// Validate a decoded configuration, collecting every problem found.
pub fn validate_config(
    config: &Configuration,
) -> Result<ValidatedConfiguration, Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_ingress(config, &mut errors);
    validate_origin_request(Scope::Global, &config.origin_request, &mut errors);

    if let Some(addr) = &config.metrics {
        if addr.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidMetricsAddress(addr.clone()));
        }
    }

    if errors.is_empty() {
        Ok(ValidatedConfiguration {
            config: config.clone(),
        })
    } else {
        tracing::debug!(error_count = errors.len(), "Configuration rejected");
        Err(errors)
    }
}

fn validate_ingress(config: &Configuration, errors: &mut Vec<ValidationError>) {
    let rules = &config.ingress;
    let Some(last) = rules.len().checked_sub(1) else {
        errors.push(ValidationError::EmptyIngress);
        return;
    };

    if !rules[last].is_catch_all() {
        errors.push(ValidationError::MissingCatchAll);
    }

    for (index, rule) in rules.iter().enumerate() {
        if rule.is_catch_all() && index != last {
            errors.push(ValidationError::MisplacedCatchAll { index });
        }

        if rule.service.trim().is_empty() {
            errors.push(ValidationError::IncompleteRule {
                index,
                reason: "missing service",
            });
        } else if let Err(e) = rule.service.parse::<Service>() {
            errors.push(ValidationError::InvalidService {
                index,
                reason: e.to_string(),
            });
        }

        if let Some(hostname) = rule.hostname_pattern() {
            if !is_valid_hostname_pattern(hostname) {
                errors.push(ValidationError::InvalidHostnamePattern {
                    index,
                    hostname: hostname.to_string(),
                });
            }
        }

        if let Some(path) = rule.path_pattern() {
            if !path.starts_with('/') || path.chars().any(char::is_whitespace) {
                errors.push(ValidationError::InvalidPathPattern {
                    index,
                    path: path.to_string(),
                });
            }
        }

        validate_origin_request(Scope::Rule(index), &rule.origin_request, errors);
    }
}

fn validate_origin_request(
    scope: Scope,
    config: &OriginRequestConfig,
    errors: &mut Vec<ValidationError>,
) {
    for rule in &config.ip_rules {
        if let Err(e) = IpRule::parse(rule) {
            errors.push(ValidationError::InvalidCidr {
                scope,
                prefix: e.prefix,
            });
        }
    }

    if let Some(value) = &config.proxy_type {
        if ProxyType::parse(value).is_none() {
            errors.push(ValidationError::InvalidProxyType {
                scope,
                value: value.clone(),
            });
        }
    }

    if let Some(n) = config.keep_alive_connections {
        if u32::try_from(n).is_err() {
            errors.push(ValidationError::InvalidNumericField {
                scope,
                field: "keepAliveConnections",
                value: n,
            });
        }
    }

    if let Some(port) = config.proxy_port {
        if u16::try_from(port).is_err() {
            errors.push(ValidationError::InvalidNumericField {
                scope,
                field: "proxyPort",
                value: port,
            });
        }
    }

    if config.no_tls_verify == Some(true) && config.ca_pool.is_some() {
        errors.push(ValidationError::ConflictingFields {
            scope,
            first: "noTLSVerify",
            second: "caPool",
        });
    }

    if let Some(access) = config.access.as_ref().filter(|a| a.required) {
        if access.team_name.trim().is_empty() {
            errors.push(ValidationError::InvalidAccessConfig {
                scope,
                reason: "teamName is empty",
            });
        }
        if access.aud_tag.is_empty() {
            errors.push(ValidationError::InvalidAccessConfig {
                scope,
                reason: "audTag is empty",
            });
        }
    }
}

/// Exact hostnames, or a single leading `*.` label followed by a suffix.
fn is_valid_hostname_pattern(pattern: &str) -> bool {
    let suffix = pattern.strip_prefix("*.").unwrap_or(pattern);
    if suffix.is_empty() {
        return false;
    }

    suffix.split('.').all(|label| {
        !label.is_empty()
            && label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    })
}
