//! extract-cn-proxy
//!
//! Sits behind a TLS-terminating proxy, copies the client certificate CN
//! into a configurable header and forwards to a single upstream.
//!
//! ```text
//!   Client ──▶ TLS proxy ──▶ ┌──────────────────────────────────────┐ ──▶ Upstream
//!              (sets cert    │ trace → timeout → ExtractCn → forward │
//!               info header) └──────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use extract_cn_proxy::config::{self, loader, ProxyConfig};
use extract_cn_proxy::lifecycle::{signals, Shutdown};
use extract_cn_proxy::observability::{logging, metrics};
use extract_cn_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "extract-cn-proxy")]
#[command(about = "Copies the client certificate CN into a request header", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Destination header (overrides `extract_cn.dest`).
    #[arg(short, long)]
    dest: Option<String>,

    /// Bind address (overrides `listener.bind_address`).
    #[arg(short, long)]
    bind: Option<String>,

    /// Upstream URL (overrides `upstream.url`).
    #[arg(short, long)]
    upstream: Option<String>,
}

impl Cli {
    fn load(&self) -> Result<ProxyConfig, config::ConfigError> {
        let mut config = match &self.config {
            Some(path) => loader::read_config(path)?,
            None => ProxyConfig::default(),
        };

        if let Some(dest) = &self.dest {
            config.extract_cn.dest_header = dest.clone();
        }
        if let Some(bind) = &self.bind {
            config.listener.bind_address = bind.clone();
        }
        if let Some(upstream) = &self.upstream {
            config.upstream.url = upstream.clone();
        }

        loader::check(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.load()?;

    logging::init(&config.observability);
    tracing::info!("extract-cn-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.url,
        dest_header = %config.extract_cn.dest_header,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config)?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::shutdown_on_signal(&shutdown).await;
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
