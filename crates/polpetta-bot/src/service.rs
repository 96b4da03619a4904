//! Operations exposed upward to the command-handling layer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use polpetta_store::{MeatballChannel, MeatballDay, MeatballRole, MeatballStore, StoreError};

use crate::calendar::{self, InvalidMonthDay, MonthDay};
use crate::cooldown::{CooldownActive, CooldownGuard};
use crate::reconciler::Reconciler;

/// Result of a save request.
#[derive(Debug, Clone)]
pub enum SaveOutcome {
    Saved(MeatballDay),
    /// The user wrote too recently; carries the next-eligible time.
    OnCooldown(CooldownActive),
    /// The month/day pair is not a real date.
    InvalidDate(InvalidMonthDay),
}

/// Result of a forget request.
#[derive(Debug, Clone)]
pub enum ForgetOutcome {
    Forgotten,
    OnCooldown(CooldownActive),
    /// No record existed for this user.
    NotRegistered,
}

/// The bot's upward-facing API: everything the command glue calls.
pub struct MeatballService {
    store: Arc<MeatballStore>,
    reconciler: Arc<Reconciler>,
    cooldown: CooldownGuard,
}

impl MeatballService {
    pub fn new(store: Arc<MeatballStore>, reconciler: Arc<Reconciler>) -> Self {
        Self {
            store,
            reconciler,
            cooldown: CooldownGuard::new(),
        }
    }

    /// Service with a custom cooldown guard. Used by tests.
    pub fn with_cooldown(
        store: Arc<MeatballStore>,
        reconciler: Arc<Reconciler>,
        cooldown: CooldownGuard,
    ) -> Self {
        Self {
            store,
            reconciler,
            cooldown,
        }
    }

    /// Save (or overwrite) a member's meatball day.
    ///
    /// On success the guild is reconciled immediately so a just-saved
    /// "today" takes effect without waiting for the next tick; reconcile
    /// failures are logged, never surfaced, and corrected by the scheduler.
    pub async fn save_day(
        &self,
        guild_id: &str,
        user_id: &str,
        month: u8,
        day: u8,
        now: DateTime<Utc>,
    ) -> Result<SaveOutcome, StoreError> {
        let month_day = match MonthDay::new(month, day) {
            Ok(md) => md,
            Err(e) => return Ok(SaveOutcome::InvalidDate(e)),
        };

        let previous = match self.cooldown.try_acquire(user_id, now) {
            Ok(previous) => previous,
            Err(active) => return Ok(SaveOutcome::OnCooldown(active)),
        };

        let record = MeatballDay {
            guild_id: guild_id.to_string(),
            user_id: user_id.to_string(),
            month: month_day.month(),
            day: month_day.day(),
        };

        if let Err(e) = self.store.upsert_day(&record) {
            // The failed write must not consume the user's cooldown.
            self.cooldown.restore(user_id, previous);
            return Err(e);
        }

        info!(guild_id, user_id, month, day, "saved meatball day");

        if let Err(e) = self.reconciler.reconcile(guild_id).await {
            warn!(guild_id, error = %e, "post-save reconciliation failed");
        }

        Ok(SaveOutcome::Saved(record))
    }

    /// Look up a member's meatball day.
    pub fn lookup_day(
        &self,
        guild_id: &str,
        user_id: &str,
    ) -> Result<Option<MeatballDay>, StoreError> {
        self.store.get_day(guild_id, user_id)
    }

    /// Delete a member's meatball day. Gated by the same cooldown as saves,
    /// but only saves stamp it.
    pub fn forget_day(
        &self,
        guild_id: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ForgetOutcome, StoreError> {
        if let Some(active) = self.cooldown.check(user_id, now) {
            return Ok(ForgetOutcome::OnCooldown(active));
        }

        if self.store.delete_day(guild_id, user_id)? {
            info!(guild_id, user_id, "forgot meatball day");
            Ok(ForgetOutcome::Forgotten)
        } else {
            Ok(ForgetOutcome::NotRegistered)
        }
    }

    /// The next upcoming meatball day in the guild, wrapping past year end.
    pub fn next_upcoming_day(
        &self,
        guild_id: &str,
        today: MonthDay,
    ) -> Result<Option<MeatballDay>, StoreError> {
        let days = self.store.list_days(guild_id)?;
        Ok(calendar::next_upcoming(&days, today))
    }

    /// Set the guild's meatball role.
    pub fn set_role(&self, guild_id: &str, role_id: &str) -> Result<(), StoreError> {
        self.store.upsert_role(&MeatballRole {
            guild_id: guild_id.to_string(),
            role_id: role_id.to_string(),
        })?;
        info!(guild_id, role_id, "configured meatball role");
        Ok(())
    }

    /// Set the guild's announcement channel.
    pub fn set_channel(&self, guild_id: &str, channel_id: &str) -> Result<(), StoreError> {
        self.store.upsert_channel(&MeatballChannel {
            guild_id: guild_id.to_string(),
            channel_id: channel_id.to_string(),
        })?;
        info!(guild_id, channel_id, "configured announcement channel");
        Ok(())
    }
}
