//! Polpetta: meatball day Discord bot.
//!
//! Remembers each member's meatball day per guild, keeps the configured
//! guild role matching "whose day is it today," and announces new meatball
//! days in the configured channel.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod daemon;

#[derive(Parser)]
#[command(name = "polpetta")]
#[command(about = "Meatball day Discord bot", long_about = None)]
struct Cli {
    /// Bot access token
    #[arg(long, env = "POLPETTA_TOKEN")]
    token: String,

    /// SQLite database file path
    #[arg(long, env = "POLPETTA_DB_PATH", default_value = "polpetta.db")]
    db_path: PathBuf,

    /// Seconds between scheduled reconciliation passes
    #[arg(long, env = "POLPETTA_RECONCILE_INTERVAL", default_value = "3600")]
    reconcile_interval: u64,

    /// Discord API base URL (override for proxies and testing)
    #[arg(long, env = "POLPETTA_API_URL", default_value = polpetta_discord::DEFAULT_API_URL)]
    api_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "polpetta=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    daemon::run(
        &cli.token,
        &cli.api_url,
        &cli.db_path,
        Duration::from_secs(cli.reconcile_interval),
    )
    .await
}
