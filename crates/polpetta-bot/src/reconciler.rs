//! Role reconciliation engine.
//!
//! One pass diffs a guild's actual role holders against the desired set
//! computed from stored meatball days and issues the minimal corrective
//! grants and revokes, plus one announcement per newly granted member.
//! Individual actions fail independently; a failed action is retried on the
//! next scheduled pass, never immediately.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use polpetta_discord::{DiscordClient, GuildSnapshot};
use polpetta_store::MeatballStore;

use crate::calendar::{self, MonthDay};
use crate::diff::diff;
use crate::error::ReconcileError;

/// The kind of remote action that failed for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Grant,
    Revoke,
    Announce,
}

/// A per-user action failure inside one pass.
#[derive(Debug, Clone)]
pub struct ActionFailure {
    pub user_id: String,
    pub action: ActionKind,
    pub error: String,
}

/// Why a pass did nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The guild never configured a meatball role.
    NoRoleConfigured,
    /// The configured role no longer exists in the guild.
    RoleMissing { role_id: String },
}

/// Aggregate outcome of one pass over one guild.
#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    pub guild_id: String,
    /// Users granted the role this pass.
    pub added: Vec<String>,
    /// Users whose role was revoked this pass.
    pub removed: Vec<String>,
    /// Grant/revoke calls that failed, per user.
    pub action_failures: Vec<ActionFailure>,
    /// Announcements that failed, per user. Never rolls back the grant.
    pub announce_failures: Vec<ActionFailure>,
}

impl ReconcileReport {
    /// Whether every issued action succeeded.
    pub fn is_clean(&self) -> bool {
        self.action_failures.is_empty() && self.announce_failures.is_empty()
    }
}

/// Outcome of [`Reconciler::reconcile`].
#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    /// Nothing to do for this guild (not an error).
    Skipped(SkipReason),
    Completed(ReconcileReport),
}

/// The reconciliation engine. Read-only consumer of the record store;
/// all mutations go to Discord.
pub struct Reconciler {
    discord: Arc<DiscordClient>,
    store: Arc<MeatballStore>,
    /// Single-flight gates, one per guild: overlapping triggers for the same
    /// guild serialize, different guilds proceed independently.
    guild_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl Reconciler {
    pub fn new(discord: Arc<DiscordClient>, store: Arc<MeatballStore>) -> Self {
        Self {
            discord,
            store,
            guild_locks: DashMap::new(),
        }
    }

    fn guild_lock(&self, guild_id: &str) -> Arc<Mutex<()>> {
        self.guild_locks
            .entry(guild_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Reconcile one guild against today's date (UTC).
    pub async fn reconcile(&self, guild_id: &str) -> Result<ReconcileOutcome, ReconcileError> {
        self.reconcile_on(guild_id, MonthDay::today()).await
    }

    /// Reconcile one guild against an explicit date. Tests pin dates here;
    /// everything else goes through [`reconcile`](Self::reconcile).
    #[tracing::instrument(skip(self))]
    pub async fn reconcile_on(
        &self,
        guild_id: &str,
        today: MonthDay,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let lock = self.guild_lock(guild_id);
        let _single_flight = lock.lock().await;

        let Some(role_config) = self.store.get_role(guild_id)? else {
            debug!(guild_id, "no meatball role configured, skipping");
            return Ok(ReconcileOutcome::Skipped(SkipReason::NoRoleConfigured));
        };
        let role_id = role_config.role_id;

        let guild_roles = self.discord.guild_roles(guild_id).await?;
        if !guild_roles.iter().any(|r| r.id == role_id) {
            warn!(guild_id, role_id = %role_id, "configured meatball role no longer exists, skipping");
            return Ok(ReconcileOutcome::Skipped(SkipReason::RoleMissing { role_id }));
        }

        let snapshot = self.discord.guild_snapshot(guild_id).await?;
        let records = self.store.list_days(guild_id)?;

        // Desired = exact date match, restricted to current members; a saved
        // day for someone who has since left cannot produce a grant.
        let roster: HashSet<String> = snapshot.members.iter().map(|m| m.user.id.clone()).collect();
        let mut desired = calendar::members_with_day(&records, today);
        desired.retain(|user_id| roster.contains(user_id));

        let holders = snapshot.role_holders(&role_id);
        let role_diff = diff(&holders, &desired);

        let mut report = ReconcileReport {
            guild_id: guild_id.to_string(),
            ..ReconcileReport::default()
        };

        for user_id in &role_diff.to_remove {
            match self
                .discord
                .remove_member_role(guild_id, user_id, &role_id)
                .await
            {
                Ok(()) => {
                    info!(guild_id, user_id = %user_id, role_id = %role_id, "revoked meatball role");
                    report.removed.push(user_id.clone());
                }
                Err(e) => {
                    warn!(guild_id, user_id = %user_id, error = %e, "failed to revoke meatball role");
                    report.action_failures.push(ActionFailure {
                        user_id: user_id.clone(),
                        action: ActionKind::Revoke,
                        error: e.to_string(),
                    });
                }
            }
        }

        for user_id in &role_diff.to_add {
            match self
                .discord
                .add_member_role(guild_id, user_id, &role_id)
                .await
            {
                Ok(()) => {
                    info!(guild_id, user_id = %user_id, role_id = %role_id, "granted meatball role");
                    report.added.push(user_id.clone());
                }
                Err(e) => {
                    warn!(guild_id, user_id = %user_id, error = %e, "failed to grant meatball role");
                    report.action_failures.push(ActionFailure {
                        user_id: user_id.clone(),
                        action: ActionKind::Grant,
                        error: e.to_string(),
                    });
                }
            }
        }

        if !report.added.is_empty() {
            report.announce_failures = self.announce(guild_id, &snapshot, &report.added).await?;
        }

        if !report.is_clean() {
            warn!(
                guild_id,
                failures = report.action_failures.len() + report.announce_failures.len(),
                "reconciliation completed with failures"
            );
        }
        Ok(ReconcileOutcome::Completed(report))
    }

    /// One announcement per granted user, if the guild configured a channel.
    /// Returns the per-user failures.
    async fn announce(
        &self,
        guild_id: &str,
        snapshot: &GuildSnapshot,
        added: &[String],
    ) -> Result<Vec<ActionFailure>, ReconcileError> {
        let Some(channel) = self.store.get_channel(guild_id)? else {
            debug!(guild_id, "no announcement channel configured");
            return Ok(Vec::new());
        };

        let mut failures = Vec::new();
        for user_id in added {
            let mention = snapshot
                .member(user_id)
                .map(|m| m.mention())
                .unwrap_or_else(|| polpetta_discord::user_mention(user_id));
            let text = format!("It's {}'s meatball day! Congratulations.", mention);

            match self.discord.create_message(&channel.channel_id, &text).await {
                Ok(_) => {
                    info!(
                        guild_id,
                        user_id = %user_id,
                        channel_id = %channel.channel_id,
                        "announced meatball day"
                    );
                }
                Err(e) => {
                    warn!(
                        guild_id,
                        user_id = %user_id,
                        error = %e,
                        "failed to announce meatball day"
                    );
                    failures.push(ActionFailure {
                        user_id: user_id.clone(),
                        action: ActionKind::Announce,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(failures)
    }
}
