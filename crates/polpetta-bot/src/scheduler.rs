//! Scheduled reconciliation loop.
//!
//! A fixed-period sweep over every joined guild. One guild failing never
//! stops the sweep or the loop; cancellation is cooperative and checked
//! between ticks and between guilds, never mid-action.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use polpetta_discord::DiscordClient;

use crate::reconciler::{ReconcileOutcome, Reconciler};

/// Default interval between scheduled reconciliation passes.
pub const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(3600);

/// Run the reconciliation loop until the shutdown signal flips.
///
/// The first tick fires immediately, so a restart never waits a full period
/// before correcting role state.
pub async fn run(
    reconciler: Arc<Reconciler>,
    discord: Arc<DiscordClient>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    info!(interval_secs = interval.as_secs(), "reconciliation scheduler starting");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                sweep(&reconciler, &discord, &shutdown_rx).await;
            }
        }
    }

    info!("reconciliation scheduler shut down");
}

/// One pass over every joined guild, sequentially.
async fn sweep(
    reconciler: &Reconciler,
    discord: &DiscordClient,
    shutdown_rx: &watch::Receiver<bool>,
) {
    let guilds = match discord.list_joined_guilds().await {
        Ok(guilds) => guilds,
        Err(e) => {
            error!(error = %e, "failed to list joined guilds, skipping pass");
            return;
        }
    };

    for guild in guilds {
        if *shutdown_rx.borrow() {
            info!("shutdown requested, stopping sweep");
            return;
        }

        match reconciler.reconcile(&guild.id).await {
            Ok(ReconcileOutcome::Skipped(reason)) => {
                debug!(guild_id = %guild.id, ?reason, "skipped guild");
            }
            Ok(ReconcileOutcome::Completed(report)) => {
                debug!(
                    guild_id = %guild.id,
                    added = report.added.len(),
                    removed = report.removed.len(),
                    failures = report.action_failures.len() + report.announce_failures.len(),
                    "reconciled guild"
                );
            }
            Err(e) => {
                error!(guild_id = %guild.id, error = %e, "reconciliation failed");
            }
        }
    }
}
