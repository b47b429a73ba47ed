//! ## takt-cli
//! **Operational entrypoint for the takt server runtime**
//!
//! Wires the pieces together: configuration, the network thread, the tick
//! loop, and an interactive-interrupt handler feeding the cancellation
//! token. The tick loop itself is a blocking thread; tokio only hosts the
//! signal listener.

use clap::Parser;

mod commands;
mod logging;
mod relay;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    logging::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => commands::run(args).await,
    }
}
