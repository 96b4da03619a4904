//! SQLite repository for meatball records.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::error::StoreError;
use crate::schema::apply_schema;
use crate::types::{MeatballChannel, MeatballDay, MeatballRole};

/// SQLite-backed record store.
///
/// Thread-safe via an internal `Mutex<Connection>`. All access is
/// serialized; individual operations are short single-statement queries.
pub struct MeatballStore {
    conn: Mutex<Connection>,
}

fn now_epoch_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

impl MeatballStore {
    /// Open (or create) the database at the given path and apply the schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        apply_schema(&conn)?;
        debug!(path = %path.display(), "opened record store");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database. Used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Insert or overwrite a member's meatball day.
    pub fn upsert_day(&self, day: &MeatballDay) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO meatball_days (guild_id, user_id, month, day, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (guild_id, user_id)
             DO UPDATE SET month = excluded.month, day = excluded.day,
                           updated_at = excluded.updated_at",
            params![
                day.guild_id,
                day.user_id,
                day.month,
                day.day,
                now_epoch_secs()
            ],
        )?;
        Ok(())
    }

    /// Look up a member's meatball day.
    pub fn get_day(
        &self,
        guild_id: &str,
        user_id: &str,
    ) -> Result<Option<MeatballDay>, StoreError> {
        let conn = self.lock()?;
        let day = conn
            .query_row(
                "SELECT guild_id, user_id, month, day FROM meatball_days
                 WHERE guild_id = ?1 AND user_id = ?2",
                params![guild_id, user_id],
                row_to_day,
            )
            .optional()?;
        Ok(day)
    }

    /// Delete a member's meatball day. Returns whether a record existed.
    pub fn delete_day(&self, guild_id: &str, user_id: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let affected = conn.execute(
            "DELETE FROM meatball_days WHERE guild_id = ?1 AND user_id = ?2",
            params![guild_id, user_id],
        )?;
        Ok(affected > 0)
    }

    /// All meatball days in a guild, ordered by month then day.
    pub fn list_days(&self, guild_id: &str) -> Result<Vec<MeatballDay>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT guild_id, user_id, month, day FROM meatball_days
             WHERE guild_id = ?1 ORDER BY month, day",
        )?;
        let rows = stmt.query_map(params![guild_id], row_to_day)?;

        let mut days = Vec::new();
        for row in rows {
            days.push(row?);
        }
        Ok(days)
    }

    /// Insert or overwrite a guild's meatball role.
    pub fn upsert_role(&self, role: &MeatballRole) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO meatball_roles (guild_id, role_id) VALUES (?1, ?2)
             ON CONFLICT (guild_id) DO UPDATE SET role_id = excluded.role_id",
            params![role.guild_id, role.role_id],
        )?;
        Ok(())
    }

    /// Look up a guild's meatball role.
    pub fn get_role(&self, guild_id: &str) -> Result<Option<MeatballRole>, StoreError> {
        let conn = self.lock()?;
        let role = conn
            .query_row(
                "SELECT guild_id, role_id FROM meatball_roles WHERE guild_id = ?1",
                params![guild_id],
                |row| {
                    Ok(MeatballRole {
                        guild_id: row.get(0)?,
                        role_id: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(role)
    }

    /// Insert or overwrite a guild's announcement channel.
    pub fn upsert_channel(&self, channel: &MeatballChannel) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO meatball_channels (guild_id, channel_id) VALUES (?1, ?2)
             ON CONFLICT (guild_id) DO UPDATE SET channel_id = excluded.channel_id",
            params![channel.guild_id, channel.channel_id],
        )?;
        Ok(())
    }

    /// Look up a guild's announcement channel.
    pub fn get_channel(&self, guild_id: &str) -> Result<Option<MeatballChannel>, StoreError> {
        let conn = self.lock()?;
        let channel = conn
            .query_row(
                "SELECT guild_id, channel_id FROM meatball_channels WHERE guild_id = ?1",
                params![guild_id],
                |row| {
                    Ok(MeatballChannel {
                        guild_id: row.get(0)?,
                        channel_id: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(channel)
    }
}

fn row_to_day(row: &rusqlite::Row<'_>) -> Result<MeatballDay, rusqlite::Error> {
    Ok(MeatballDay {
        guild_id: row.get(0)?,
        user_id: row.get(1)?,
        month: row.get(2)?,
        day: row.get(3)?,
    })
}
