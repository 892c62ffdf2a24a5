//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Rule Compilation (at startup and on reload):
//!     ValidatedConfiguration
//!     → merge global + per-rule origin-request settings
//!     → compile matchers (exact / wildcard host, path prefix)
//!     → Freeze as immutable RuleSet
//!     → store.rs (atomic publish)
//!
//! Incoming Request (host, path, source IP, token)
//!     → router.rs (first matching rule, declaration order)
//!     → resolver.rs (IP gate, identity gate)
//!     → Return: Matched(rule) or Denied(reason)
//! ```
//!
//! # Design Decisions
//! - Rules compiled ahead of time, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same rule
//! - First match wins (ordered by declaration)

pub mod matcher;
pub mod request;
pub mod resolver;
pub mod router;
pub mod service;
pub mod store;

pub use request::InboundRequest;
pub use resolver::{DenyReason, Outcome, Resolver};
pub use router::{CompiledRule, RuleSet};
pub use service::Service;
pub use store::{ReloadStatus, RuleStore};
