//! ToneSoul Gateway - HTTP server binary

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tonesoul_core::BindMode;
use tonesoul_gateway::start_gateway;
use tonesoul_runtime::{ToneSoulConfig, ToneSoulRuntime};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tonesoul-gateway", about = "ToneSoul HTTP gateway")]
struct Cli {
    /// TOML config file
    #[arg(short, long, default_value = "tonesoul.toml")]
    config: PathBuf,
    /// Override the configured port
    #[arg(short, long)]
    port: Option<u16>,
    /// Override the configured bind mode (loopback | lan)
    #[arg(short, long)]
    bind: Option<String>,
    /// Emit JSON log lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tonesoul=info,tower_http=info".into());
    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let mut config = ToneSoulConfig::load(&cli.config);
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }
    if let Some(bind) = cli.bind.as_deref() {
        config.gateway.bind = BindMode::parse(bind);
    }

    let gateway = config.gateway.clone();
    let runtime = Arc::new(ToneSoulRuntime::new(config));
    start_gateway(runtime, &gateway).await
}
