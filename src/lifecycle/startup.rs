//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize metrics when the document asks for them
//! - Compile and publish the first rule set
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::loader::{load_config, LoadError};
use crate::observability::metrics;
use crate::routing::router::RuleSet;
use crate::routing::store::RuleStore;

/// Everything a running agent shares between tasks.
#[derive(Debug, Clone)]
pub struct Agent {
    pub config_path: PathBuf,
    pub store: Arc<RuleStore>,
}

/// Load `path`, start the metrics exporter if configured, and publish the
/// compiled rules.
///
/// Must be called from within a Tokio runtime when the configuration sets a
/// metrics address.
pub fn start(path: &Path) -> Result<Agent, LoadError> {
    let validated = load_config(path)?;
    let config = validated.config();

    tracing::info!(
        tunnel = %config.tunnel_id,
        rules = config.ingress.len(),
        warp_routing = config.warp_routing.enabled,
        no_autoupdate = config.no_autoupdate,
        "Configuration loaded"
    );

    // validation already checked the address parses
    if let Some(addr) = config.metrics.as_deref().and_then(|a| a.parse::<SocketAddr>().ok()) {
        metrics::init_metrics(addr);
    }

    let store = Arc::new(RuleStore::new(RuleSet::compile(&validated)));
    Ok(Agent {
        config_path: path.to_path_buf(),
        store,
    })
}
