//! `mini-express` binary: serves the reference app.

use std::path::PathBuf;

use clap::Parser;

use mini_express::demo::reference_app;
use mini_express::lifecycle::startup::{init_observability, resolve_config};

#[derive(Debug, Parser)]
#[command(name = "mini-express", version, about = "Minimal HTTP request-dispatch engine")]
struct Cli {
    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on, overriding the configured bind address.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = resolve_config(cli.config.as_deref(), cli.port)?;
    init_observability(&config);

    tracing::info!("mini-express v{} starting", env!("CARGO_PKG_VERSION"));

    let port = config.listener.port().unwrap_or(3000);
    reference_app(config).listen(port).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
