use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing::info;

use takt_config::TaktConfig;
use takt_engine::{CancelToken, Runtime, RuntimeConfig};
use takt_net::NetConfig;

use crate::relay::RelayHandler;

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the server until interrupted (Ctrl-C shuts down gracefully)
    Run(RunArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Configuration file; defaults plus TAKT_* environment otherwise
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Override the configured listen address
    #[arg(short, long)]
    pub listen: Option<SocketAddr>,
}

pub async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut config = match &args.config {
        Some(path) => TaktConfig::load_from_path(path)?,
        None => TaktConfig::load()?,
    };
    if let Some(listen) = args.listen {
        config.network.listen = listen;
    }

    let (network, net_thread) = takt_net::spawn(NetConfig {
        listen: config.network.listen,
        max_clients: config.network.max_clients,
        channel_capacity: config.network.channel_capacity,
        ..NetConfig::default()
    })?;
    info!(listen = %config.network.listen, "listening");

    let runtime = Runtime::new(
        RuntimeConfig {
            arena_capacity: config.memory.arena_capacity,
            event_queue_capacity: config.queues.event_queue_capacity(),
            command_queue_capacity: config.queues.command_queue_capacity(),
            scratch_capacity: config.memory.scratch_capacity,
            tick_interval: Duration::from_millis(1),
        },
        network,
        net_thread,
        RelayHandler::new(),
    )?;

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received");
                cancel.request();
            }
        });
    }

    tokio::task::spawn_blocking(move || runtime.run(cancel)).await??;
    info!("gracefully terminated");
    Ok(())
}
