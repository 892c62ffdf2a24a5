//! Structured logging setup.
//!
//! Events carry key=value fields (`rule`, `host`, `source_ip`, `path`) so
//! denials and reloads can be filtered without parsing messages. Text output
//! by default, JSON with `--log-json`. `RUST_LOG` takes precedence over the
//! level passed in.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. Calling it twice is a no-op.
pub fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("tunnel_ingress={level}").into());

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    if result.is_err() {
        tracing::debug!("Logging already initialized");
    }
}
