// src/main.rs

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use plantcare::config::{ConfigArgs, ServiceConfig};
use plantcare::server;

#[derive(Parser)]
#[command(name = "plantcare")]
#[command(about = "Plant-health scan history service", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
    /// Print scan statistics as JSON
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = ServiceConfig::load(cli.config);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    fmt().with_env_filter(filter).init();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            info!("Starting PlantCare history service v{}", env!("CARGO_PKG_VERSION"));
            server::run(config).await
        }
        Command::Migrate => {
            let store = server::open_store(&config).await?;
            info!("Schema version: {}", store.schema_version().await?);
            store.close().await;
            Ok(())
        }
        Command::Stats => {
            let store = server::open_store(&config).await?;
            let stats = store.stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            store.close().await;
            Ok(())
        }
    }
}
