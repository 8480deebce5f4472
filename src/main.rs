#![warn(clippy::all, clippy::pedantic)]

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use fishmonger::app::App;
use fishmonger::config::Config;

#[derive(Parser)]
#[command(
    name = "fishmonger",
    about = "Telegram storefront bot for a seafood shop",
    version
)]
struct Cli {
    /// Path to the TOML config file; environment variables override it
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    let app = App::bootstrap(&config).await?;
    app.run_supervised().await
}
