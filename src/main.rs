//! Tunnel ingress agent (v1)
//!
//! Loads a tunnel configuration, compiles its ingress rules and resolves
//! requests against them.
//!
//! # Architecture Overview
//!
//! ```text
//!   config file ──▶ loader ──▶ validation ──▶ RuleSet::compile ──▶ RuleStore (ArcSwap)
//!                                                                     │
//!   request (host, path, source IP, token) ──▶ Resolver ◀─────────────┘
//!                                                 │
//!                                    ┌────────────┼──────────────┐
//!                                    ▼            ▼              ▼
//!                               first match    IP rules     identity gate
//!                                                 │
//!                                                 ▼
//!                               Matched(rule + effective origin config)
//!                               or Denied(reason)
//! ```

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use tunnel_ingress::config::watcher::ConfigWatcher;
use tunnel_ingress::config::{load_config, LoadError};
use tunnel_ingress::lifecycle::{self, Shutdown, SignalEvent, SignalListener};
use tunnel_ingress::observability::logging::init_logging;
use tunnel_ingress::routing::{InboundRequest, Outcome, Resolver, RuleSet};
use tunnel_ingress::security::{IdentityVerifier, RejectingVerifier, StaticVerifier};

#[derive(Parser)]
#[command(name = "tunnel-ingress")]
#[command(about = "Validate, inspect and hot-reload tunnel ingress rules", long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a configuration file and list every problem found
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Resolve a single request against a configuration
    Resolve {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        host: String,
        #[arg(long, default_value = "/")]
        path: String,
        #[arg(long)]
        source_ip: IpAddr,
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        token: Option<String>,
        /// Treat the token as verified with these audiences
        #[arg(long = "audience")]
        audiences: Vec<String>,
    },
    /// Keep the rules loaded and reload them on change or SIGHUP
    Watch {
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_json);

    match cli.command {
        Commands::Validate { config } => validate(&config),
        Commands::Resolve {
            config,
            host,
            path,
            source_ip,
            port,
            token,
            audiences,
        } => {
            let mut request = InboundRequest::new(host, path, source_ip);
            request.destination_port = port;
            request.identity_token = token;
            resolve(&config, &request, audiences).await
        }
        Commands::Watch { config } => watch(&config).await,
    }
}

fn validate(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    match load_config(path) {
        Ok(validated) => {
            println!(
                "{}: OK ({} ingress rules)",
                path.display(),
                validated.config().ingress.len()
            );
            Ok(())
        }
        Err(LoadError::Validation(errors)) => {
            for error in &errors {
                println!("{}: {}", path.display(), error);
            }
            Err(format!("{} validation error(s)", errors.len()).into())
        }
        Err(e) => Err(e.into()),
    }
}

async fn resolve(
    path: &Path,
    request: &InboundRequest,
    audiences: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let rules = RuleSet::compile(&load_config(path)?);

    let verifier: Arc<dyn IdentityVerifier> = if audiences.is_empty() {
        Arc::new(RejectingVerifier)
    } else {
        Arc::new(StaticVerifier::new(audiences))
    };
    let resolver = Resolver::new(verifier);

    match resolver.resolve(&rules, request).await {
        Outcome::Matched(rule) => {
            let effective = &rule.origin_request;
            println!("matched ingress[{}] -> {}", rule.index, rule.service);
            println!("  connectTimeout: {:?}", effective.connect_timeout);
            println!("  tlsTimeout: {:?}", effective.tls_timeout);
            println!("  noTLSVerify: {}", effective.no_tls_verify);
            println!("  proxyType: {:?}", effective.proxy_type);
            println!("  ipRules: {}", rule.ip_rules.len());
            println!(
                "  access required: {}",
                effective.access.as_ref().is_some_and(|a| a.required)
            );
        }
        Outcome::Denied(reason) => println!("denied: {reason}"),
    }
    Ok(())
}

async fn watch(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let agent = lifecycle::start(path)?;
    let shutdown = Shutdown::new();

    let (watcher, mut updates) = ConfigWatcher::new(&agent.config_path, agent.store.clone());
    let _watcher = watcher.run()?;

    let store = agent.store.clone();
    let mut stop = shutdown.signal();
    let reporter = tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(status) = updates.recv() => {
                    let rules = store.load();
                    tracing::info!(status = ?status, rules = rules.len(), "Active rule set");
                }
                _ = stop.cancelled() => break,
            }
        }
    });

    let mut signals = SignalListener::new()?;
    loop {
        match signals.next().await {
            SignalEvent::Reload => {
                tracing::info!("SIGHUP received, reloading configuration");
                // failures are logged and leave the current rules active
                let _ = agent.store.reload(&agent.config_path);
            }
            SignalEvent::Shutdown => {
                tracing::info!("Shutdown signal received");
                shutdown.trigger();
                break;
            }
        }
    }

    let _ = reporter.await;
    tracing::info!("Shutdown complete");
    Ok(())
}
