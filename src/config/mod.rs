//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (YAML/JSON/TOML)
//!     → loader.rs (read & decode)
//!     → validation.rs (semantic checks, all errors collected)
//!     → ValidatedConfiguration
//!     → routing::RuleSet::compile (merge.rs computes effective settings)
//!
//! On reload (file change or SIGHUP):
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of Arc<RuleSet>
//!     → in-flight requests finish on their old snapshot
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - An invalid reload never replaces a working configuration
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod merge;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{decode_document, load_config, DecodeError, DocumentFormat, LoadError};
pub use merge::{merge, EffectiveOriginRequestConfig, ProxyType};
pub use schema::{
    AccessConfig, Configuration, IngressIpRule, IngressRule, OriginRequestConfig, WarpRoutingConfig,
};
pub use validation::{validate_config, Scope, ValidatedConfiguration, ValidationError};
