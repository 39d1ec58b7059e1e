//! devmond - device monitoring gateway daemon
//!
//! Aggregates device plugins behind a single HTTP API.
//!
//! Usage:
//!   devmond [config.toml]
//!
//! Without a config file the daemon starts with defaults: no static
//! plugins, no discovery, listening on 0.0.0.0:5000.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use devmon_api::{create_router, AppState};
use devmon_gateway::{tasks, Gateway};
use devmon_plugin::{HttpConnector, KubernetesDiscovery, PluginManager};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LoggingSettings, ServerConfig};

/// Parsed command-line arguments
struct Args {
    /// Daemon config file (TOML)
    config_path: Option<PathBuf>,
}

fn parse_args() -> Args {
    let mut result = Args { config_path: None };

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("devmond {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            a if !a.starts_with('-') => result.config_path = Some(PathBuf::from(a)),
            _ => eprintln!("Unknown argument: {}", arg),
        }
    }

    result
}

fn print_help() {
    eprintln!(
        r#"devmond - device monitoring gateway daemon

Usage: devmond [OPTIONS] [config.toml]

Options:
  -h, --help     Print this help message
  -V, --version  Print the version

Environment:
  RUST_LOG       Log filter, overrides [logging] level
"#
    );
}

fn init_logging(settings: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .unwrap_or_else(|_| {
            "devmond=info,devmon_api=info,devmon_gateway=info,devmon_cache=info,devmon_plugin=info"
                .into()
        });

    let registry = tracing_subscriber::registry().with(filter);
    if settings.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args();
    let config = ServerConfig::load(args.config_path.as_deref())?;

    init_logging(&config.logging);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting devmond");
    match &args.config_path {
        Some(path) => tracing::info!("Loaded config from: {}", path.display()),
        None => tracing::info!("No config file provided, using defaults"),
    }

    // Plugin registry
    let connector = Arc::new(HttpConnector::new(config.plugin.timeout()));
    let mut manager = PluginManager::new(connector, config.plugin.clone());
    if let Some(k8s) = config.plugin.discover.kubernetes.clone() {
        tracing::info!(namespace = %k8s.namespace, "Enabling Kubernetes plugin discovery");
        manager = manager.with_discovery(Arc::new(KubernetesDiscovery::new(k8s)));
    }

    let gateway = Gateway::new(manager, &config.cache);
    let background = tasks::spawn(gateway.clone());

    let app = create_router(AppState::new(gateway));

    let addr = config.server.addr()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    background.abort();
    tracing::info!("devmond stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
