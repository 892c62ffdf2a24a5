//! Tunnel ingress configuration and request resolution.

pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::{Configuration, ValidatedConfiguration};
pub use routing::{InboundRequest, Outcome, Resolver, RuleSet, RuleStore};
