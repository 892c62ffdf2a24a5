//! Configuration schema definitions.
//!
//! This module defines the document structure of the tunnel agent
//! configuration. All types derive Serde traits for decoding from YAML,
//! JSON or TOML files. Unknown keys are ignored so newer documents still
//! load on older agents.
//!
//! # Design Decisions
//! - Every origin-request field is an `Option`: "unset" is distinct from a
//!   zero value, and the override merge depends on that distinction
//! - Empty `hostname`/`path` strings mean the same as an absent key

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the tunnel agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Configuration {
    /// Tunnel identity (UUID or name).
    #[serde(rename = "tunnel")]
    pub tunnel_id: String,

    /// Ordered ingress rules. The last one must be the catch-all.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ingress: Vec<IngressRule>,

    /// Private network routing.
    #[serde(rename = "warp-routing")]
    pub warp_routing: WarpRoutingConfig,

    /// Global origin-request defaults applied to every rule.
    #[serde(rename = "originRequest")]
    pub origin_request: OriginRequestConfig,

    /// Path to the tunnel credentials file.
    #[serde(rename = "credentials-file")]
    pub credentials_file: String,

    /// Metrics endpoint bind address (e.g., "127.0.0.1:2000").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<String>,

    /// Disable automatic agent updates.
    #[serde(rename = "no-autoupdate")]
    pub no_autoupdate: bool,
}

/// One hostname/path to service mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct IngressRule {
    /// Hostname pattern; `*.example.com` is the only wildcard form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    /// Path prefix pattern.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Origin URL or `http_status:<code>`.
    pub service: String,

    /// Per-rule overrides of the global origin-request settings.
    #[serde(rename = "originRequest")]
    pub origin_request: OriginRequestConfig,
}

impl IngressRule {
    /// Hostname pattern, with empty strings treated as absent.
    pub fn hostname_pattern(&self) -> Option<&str> {
        self.hostname.as_deref().filter(|h| !h.is_empty())
    }

    /// Path pattern, with empty strings treated as absent.
    pub fn path_pattern(&self) -> Option<&str> {
        self.path.as_deref().filter(|p| !p.is_empty())
    }

    /// A rule with neither hostname nor path matches every request.
    pub fn is_catch_all(&self) -> bool {
        self.hostname_pattern().is_none() && self.path_pattern().is_none()
    }
}

/// Private network (WARP) routing toggle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct WarpRoutingConfig {
    pub enabled: bool,
}

/// Sparse origin-request settings.
///
/// Owned either by the [`Configuration`] (global defaults) or by an
/// [`IngressRule`] (local overrides). See [`crate::config::merge`] for how the
/// two are combined.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OriginRequestConfig {
    /// Timeout for establishing a new origin connection.
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<Duration>,

    /// Timeout for completing a TLS handshake with the origin.
    #[serde(
        rename = "tlsTimeout",
        with = "humantime_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub tls_timeout: Option<Duration>,

    /// TCP keepalive interval for origin connections.
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub tcp_keep_alive: Option<Duration>,

    /// Disable "happy eyeballs" IPv4/IPv6 fallback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_happy_eyeballs: Option<bool>,

    /// Maximum idle keepalive connections in the pool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive_connections: Option<i64>,

    /// Timeout before an idle keepalive connection is closed.
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub keep_alive_timeout: Option<Duration>,

    /// Host header sent to the origin.
    #[serde(rename = "httpHostHeader", skip_serializing_if = "Option::is_none")]
    pub http_host_header: Option<String>,

    /// Expected hostname on the origin certificate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_server_name: Option<String>,

    /// CA bundle used to verify the origin certificate.
    #[serde(rename = "caPool", skip_serializing_if = "Option::is_none")]
    pub ca_pool: Option<String>,

    /// Accept any certificate presented by the origin.
    #[serde(rename = "noTLSVerify", skip_serializing_if = "Option::is_none")]
    pub no_tls_verify: Option<bool>,

    /// Disable chunked transfer encoding towards the origin.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_chunked_encoding: Option<bool>,

    /// Run the rule as a jump host.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bastion_mode: Option<bool>,

    /// Listen address of the embedded proxy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_address: Option<String>,

    /// Listen port of the embedded proxy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_port: Option<i64>,

    /// Either empty or `socks`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_type: Option<String>,

    /// Speak HTTP/2 to the origin.
    #[serde(rename = "http2Origin", skip_serializing_if = "Option::is_none")]
    pub http2_origin: Option<bool>,

    /// Ordered allow/deny rules. An empty list means "unset".
    #[serde(rename = "ipRules", skip_serializing_if = "Vec::is_empty")]
    pub ip_rules: Vec<IngressIpRule>,

    /// Identity admission gate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<AccessConfig>,
}

/// One allow/deny entry evaluated against the request source address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct IngressIpRule {
    /// CIDR prefix (IPv4 or IPv6).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    /// Destination ports this rule applies to. Empty means all ports.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<u16>,

    /// Allow (true) or deny (false) on match.
    pub allow: bool,
}

/// Identity verification requirements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AccessConfig {
    /// Reject every request without a verified identity token.
    pub required: bool,

    /// Organization team whose signing keys verify the token.
    pub team_name: String,

    /// Acceptable audience tags.
    pub aud_tag: Vec<String>,
}
