//! Origin-request override merging.
//!
//! # Responsibilities
//! - Combine a rule's sparse [`OriginRequestConfig`] with the global one
//! - Fill anything still unset with the agent defaults
//!
//! # Design Decisions
//! - Scalar fields merge one by one: a set local field wins, then the global
//!   field, then the default
//! - `ipRules` and `access` are replaced wholesale, never combined. A rule
//!   that declares its own IP rules gets exactly those rules; mixing allow/deny
//!   lists from two scopes would change what the rule admits

use std::time::Duration;

use crate::config::schema::{AccessConfig, IngressIpRule, OriginRequestConfig};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_TLS_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_TCP_KEEP_ALIVE: Duration = Duration::from_secs(30);
pub const DEFAULT_KEEP_ALIVE_TIMEOUT: Duration = Duration::from_secs(90);
pub const DEFAULT_KEEP_ALIVE_CONNECTIONS: u32 = 100;
pub const DEFAULT_PROXY_ADDRESS: &str = "127.0.0.1";

/// Embedded proxy flavour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProxyType {
    #[default]
    None,
    Socks,
}

impl ProxyType {
    /// Parse the document value. Only empty and `socks` are valid.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "" => Some(ProxyType::None),
            "socks" => Some(ProxyType::Socks),
            _ => None,
        }
    }
}

/// Fully resolved origin-request settings for one rule.
///
/// Consumed by whatever dials the origin; it has no identity of its own and
/// is recomputed on every compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveOriginRequestConfig {
    pub connect_timeout: Duration,
    pub tls_timeout: Duration,
    pub tcp_keep_alive: Duration,
    pub no_happy_eyeballs: bool,
    pub keep_alive_connections: u32,
    pub keep_alive_timeout: Duration,
    pub http_host_header: Option<String>,
    pub origin_server_name: Option<String>,
    pub ca_pool: Option<String>,
    pub no_tls_verify: bool,
    pub disable_chunked_encoding: bool,
    pub bastion_mode: bool,
    pub proxy_address: String,
    pub proxy_port: u16,
    pub proxy_type: ProxyType,
    pub http2_origin: bool,
    pub ip_rules: Vec<IngressIpRule>,
    pub access: Option<AccessConfig>,
}

impl Default for EffectiveOriginRequestConfig {
    fn default() -> Self {
        merge(&OriginRequestConfig::default(), &OriginRequestConfig::default())
    }
}

/// Merge rule-level overrides onto the global settings.
///
/// Numeric values outside their range (negative counts, ports above 65535)
/// are rejected by validation; should one reach this point it falls back to
/// the default rather than wrapping.
pub fn merge(
    global: &OriginRequestConfig,
    local: &OriginRequestConfig,
) -> EffectiveOriginRequestConfig {
    EffectiveOriginRequestConfig {
        connect_timeout: pick(&local.connect_timeout, &global.connect_timeout)
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT),
        tls_timeout: pick(&local.tls_timeout, &global.tls_timeout).unwrap_or(DEFAULT_TLS_TIMEOUT),
        tcp_keep_alive: pick(&local.tcp_keep_alive, &global.tcp_keep_alive)
            .unwrap_or(DEFAULT_TCP_KEEP_ALIVE),
        no_happy_eyeballs: pick(&local.no_happy_eyeballs, &global.no_happy_eyeballs)
            .unwrap_or(false),
        keep_alive_connections: pick(&local.keep_alive_connections, &global.keep_alive_connections)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(DEFAULT_KEEP_ALIVE_CONNECTIONS),
        keep_alive_timeout: pick(&local.keep_alive_timeout, &global.keep_alive_timeout)
            .unwrap_or(DEFAULT_KEEP_ALIVE_TIMEOUT),
        http_host_header: pick(&local.http_host_header, &global.http_host_header),
        origin_server_name: pick(&local.origin_server_name, &global.origin_server_name),
        ca_pool: pick(&local.ca_pool, &global.ca_pool),
        no_tls_verify: pick(&local.no_tls_verify, &global.no_tls_verify).unwrap_or(false),
        disable_chunked_encoding: pick(
            &local.disable_chunked_encoding,
            &global.disable_chunked_encoding,
        )
            .unwrap_or(false),
        bastion_mode: pick(&local.bastion_mode, &global.bastion_mode).unwrap_or(false),
        proxy_address: pick(&local.proxy_address, &global.proxy_address)
            .unwrap_or_else(|| DEFAULT_PROXY_ADDRESS.to_string()),
        proxy_port: pick(&local.proxy_port, &global.proxy_port)
            .and_then(|p| u16::try_from(p).ok())
            .unwrap_or(0),
        proxy_type: pick(&local.proxy_type, &global.proxy_type)
            .and_then(|t| ProxyType::parse(&t))
            .unwrap_or_default(),
        http2_origin: pick(&local.http2_origin, &global.http2_origin).unwrap_or(false),
        ip_rules: if local.ip_rules.is_empty() {
            global.ip_rules.clone()
        } else {
            local.ip_rules.clone()
        },
        access: pick(&local.access, &global.access),
    }
}

fn pick<T: Clone>(local: &Option<T>, global: &Option<T>) -> Option<T> {
    local.as_ref().or(global.as_ref()).cloned()
}
