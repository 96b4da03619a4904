//! Daemon wiring: record store, Discord client, reconciler, scheduler loop.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use miette::Result;
use tokio::sync::watch;
use tracing::info;

use polpetta_bot::{Reconciler, scheduler};
use polpetta_discord::DiscordClient;
use polpetta_store::MeatballStore;

/// Run the daemon until ctrl-c.
pub async fn run(
    token: &str,
    api_url: &str,
    db_path: &Path,
    reconcile_interval: Duration,
) -> Result<()> {
    info!("starting Polpetta daemon");

    let store = Arc::new(
        MeatballStore::open(db_path)
            .map_err(|e| miette::miette!("failed to open record store: {}", e))?,
    );

    let discord = Arc::new(DiscordClient::new(api_url, token));

    // A bad token or unreachable API is the one fatal startup condition on
    // the platform side.
    let me = discord
        .current_user()
        .await
        .map_err(|e| miette::miette!("failed to reach Discord: {}", e))?;
    info!(bot_user = %me.username, bot_id = %me.id, "connected to Discord");

    let reconciler = Arc::new(Reconciler::new(Arc::clone(&discord), Arc::clone(&store)));

    // Handle shutdown signals
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    // Runs an immediate pass, then ticks until shutdown.
    scheduler::run(reconciler, discord, reconcile_interval, shutdown_rx).await;

    info!("shut down cleanly");
    Ok(())
}
