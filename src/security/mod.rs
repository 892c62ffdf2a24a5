//! Request admission.
//!
//! # Data Flow
//! ```text
//! Matched rule (effective origin-request config):
//!     → ip_rules.rs (source IP + destination port, first match decides)
//!     → access_control.rs (identity token, audience check, bounded timeout)
//!     → admitted, or denied with a reason
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any admission check failure
//! - Admission is a per-request predicate; no state survives the request

pub mod access_control;
pub mod ip_rules;

pub use access_control::{
    check_access, AccessVerdict, IdentityVerifier, RejectingVerifier, StaticVerifier, VerifyError,
};
pub use ip_rules::{InvalidCidr, IpRule, IpRuleSet, IpVerdict};
