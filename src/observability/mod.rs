//! Logs and metrics for the ingress agent.
//!
//! # Data Flow
//! ```text
//! Resolver::resolve ──▶ metrics::record_resolution(outcome)
//!                   └─▶ tracing events for denials (timeouts at warn)
//!
//! RuleStore::publish / reload ──▶ metrics::set_rule_count, record_reload(result)
//!                             └─▶ tracing events for applied / rejected reloads
//!
//! main ──▶ logging::init_logging (stdout, text or JSON)
//! lifecycle::start ──▶ metrics::init_metrics (only with a `metrics` address)
//! ```
//!
//! # Design Decisions
//! - The library only emits; the binary decides where output goes
//! - Counter labels are fixed strings, never request data

pub mod logging;
pub mod metrics;
