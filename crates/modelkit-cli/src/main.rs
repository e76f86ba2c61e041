//! ModelKit CLI - unpacks ModelKits from local storage.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "modelkit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Unpack(args) => commands::unpack::execute(args).await,
        Commands::Tags(args) => commands::tags::run(&args),
        Commands::Version => {
            println!("modelkit {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
