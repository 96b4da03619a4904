//! Write-path cooldown guard.
//!
//! Process-local and never persisted: a restart resets every user to
//! "allowed", which is an accepted relaxation rather than a correctness
//! requirement.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};

/// Minimum interval between a user's date-changing writes, in hours.
pub const SAVE_COOLDOWN_HOURS: i64 = 72;

/// A denied write: the user wrote too recently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownActive {
    pub last_write: DateTime<Utc>,
    pub next_eligible: DateTime<Utc>,
}

/// Per-user cooldown state, shared across concurrent command handlers.
pub struct CooldownGuard {
    cooldown: Duration,
    entries: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl Default for CooldownGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl CooldownGuard {
    /// Guard with the standard 72-hour cooldown.
    pub fn new() -> Self {
        Self::with_cooldown(Duration::hours(SAVE_COOLDOWN_HOURS))
    }

    /// Guard with a custom interval. Used by tests.
    pub fn with_cooldown(cooldown: Duration) -> Self {
        Self {
            cooldown,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn active(&self, last_write: DateTime<Utc>, now: DateTime<Utc>) -> Option<CooldownActive> {
        let next_eligible = last_write + self.cooldown;
        (now < next_eligible).then_some(CooldownActive {
            last_write,
            next_eligible,
        })
    }

    /// Read-only check: `Some` when the user must still wait. Never records.
    pub fn check(&self, user_id: &str, now: DateTime<Utc>) -> Option<CooldownActive> {
        let entries = self.lock();
        entries
            .get(user_id)
            .and_then(|last| self.active(*last, now))
    }

    /// Atomic check-and-record: one critical section, so two near-simultaneous
    /// writes cannot both pass.
    ///
    /// On success the previous stamp is returned; callers whose subsequent
    /// store write fails hand it back via [`restore`](Self::restore) so the
    /// failed attempt doesn't consume the cooldown.
    pub fn try_acquire(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, CooldownActive> {
        let mut entries = self.lock();
        if let Some(active) = entries.get(user_id).and_then(|last| self.active(*last, now)) {
            return Err(active);
        }
        Ok(entries.insert(user_id.to_string(), now))
    }

    /// Put back the stamp returned by a successful `try_acquire`.
    pub fn restore(&self, user_id: &str, previous: Option<DateTime<Utc>>) {
        let mut entries = self.lock();
        match previous {
            Some(stamp) => {
                entries.insert(user_id.to_string(), stamp);
            }
            None => {
                entries.remove(user_id);
            }
        }
    }
}
