//! SQLite DDL for the Polpetta record store.
//!
//! All `CREATE TABLE` / `CREATE INDEX` statements live here so they are
//! reviewable and testable in isolation.

use rusqlite::Connection;

/// Complete DDL for the record store.
///
/// Uses `IF NOT EXISTS` throughout so `apply_schema` is idempotent.
pub(crate) const SCHEMA_SQL: &str = r#"
-- Enable WAL mode for concurrent reads during writes.
PRAGMA journal_mode = WAL;

-- One meatball day per (guild, member).
CREATE TABLE IF NOT EXISTS meatball_days (
    guild_id   TEXT    NOT NULL,
    user_id    TEXT    NOT NULL,
    month      INTEGER NOT NULL,
    day        INTEGER NOT NULL,
    updated_at INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (guild_id, user_id)
);

CREATE INDEX IF NOT EXISTS idx_days_guild ON meatball_days(guild_id);

-- The role toggled on members' meatball days, one per guild.
CREATE TABLE IF NOT EXISTS meatball_roles (
    guild_id TEXT PRIMARY KEY,
    role_id  TEXT NOT NULL
);

-- The announcement channel, one per guild.
CREATE TABLE IF NOT EXISTS meatball_channels (
    guild_id   TEXT PRIMARY KEY,
    channel_id TEXT NOT NULL
);
"#;

/// Apply the full schema to an open connection.
pub(crate) fn apply_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)
}
