//! Shared builders for integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::net::IpAddr;

use tempfile::NamedTempFile;
use tunnel_ingress::config::{
    validate_config, AccessConfig, Configuration, IngressIpRule, IngressRule, OriginRequestConfig,
};
use tunnel_ingress::routing::{InboundRequest, RuleSet};

/// A rule for `hostname` routed to `service`.
pub fn rule(hostname: &str, service: &str) -> IngressRule {
    IngressRule {
        hostname: Some(hostname.into()),
        service: service.into(),
        ..Default::default()
    }
}

/// A rule matching every request.
pub fn catch_all(service: &str) -> IngressRule {
    IngressRule {
        service: service.into(),
        ..Default::default()
    }
}

pub fn ip_rule(prefix: &str, allow: bool) -> IngressIpRule {
    IngressIpRule {
        prefix: Some(prefix.into()),
        ports: vec![],
        allow,
    }
}

pub fn required_access(team: &str, aud: &str) -> AccessConfig {
    AccessConfig {
        required: true,
        team_name: team.into(),
        aud_tag: vec![aud.into()],
    }
}

pub fn config(origin_request: OriginRequestConfig, ingress: Vec<IngressRule>) -> Configuration {
    Configuration {
        tunnel_id: "test-tunnel".into(),
        origin_request,
        ingress,
        ..Default::default()
    }
}

/// Validate and compile, panicking on validation errors.
pub fn compile(config: &Configuration) -> RuleSet {
    match validate_config(config) {
        Ok(validated) => RuleSet::compile(&validated),
        Err(errors) => panic!("configuration should be valid: {errors:?}"),
    }
}

pub fn request(host: &str, path: &str, source_ip: &str) -> InboundRequest {
    let ip: IpAddr = source_ip.parse().unwrap();
    InboundRequest::new(host, path, ip)
}

/// Write `content` to a temporary `.yaml` file.
pub fn yaml_file(content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Replace the contents of an existing temporary file.
pub fn rewrite(file: &NamedTempFile, content: &str) {
    std::fs::write(file.path(), content).unwrap();
}
