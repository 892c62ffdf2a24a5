//! Ingress service targets.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use url::Url;

const HTTP_STATUS_PREFIX: &str = "http_status:";

/// Where a matched request goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Service {
    /// Answer directly with this HTTP status; no origin is contacted.
    HttpStatus(u16),
    /// Proxy to this origin.
    Origin(Url),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceParseError {
    #[error("service is empty")]
    Empty,
    #[error("invalid status code in '{0}'")]
    InvalidStatus(String),
    #[error("'{0}' is not a valid origin URL")]
    InvalidUrl(String),
    #[error("origin URL '{0}' has no host")]
    MissingHost(String),
}

impl FromStr for Service {
    type Err = ServiceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ServiceParseError::Empty);
        }

        if let Some(code) = s.strip_prefix(HTTP_STATUS_PREFIX) {
            return match code.parse::<u16>() {
                Ok(c) if (100..=599).contains(&c) => Ok(Service::HttpStatus(c)),
                _ => Err(ServiceParseError::InvalidStatus(s.to_string())),
            };
        }

        let url = Url::parse(s).map_err(|_| ServiceParseError::InvalidUrl(s.to_string()))?;
        if url.scheme() != "unix" && url.host_str().map_or(true, str::is_empty) {
            return Err(ServiceParseError::MissingHost(s.to_string()));
        }
        Ok(Service::Origin(url))
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::HttpStatus(code) => write!(f, "{HTTP_STATUS_PREFIX}{code}"),
            Service::Origin(url) => write!(f, "{url}"),
        }
    }
}
