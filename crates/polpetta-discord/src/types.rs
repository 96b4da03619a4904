//! Discord API object types.
//!
//! Only the fields the bot reads are modeled; Discord sends many more and
//! serde ignores them.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// The bot's own user, from `GET /users/@me`.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
}

/// A guild the bot has joined, from `GET /users/@me/guilds`.
#[derive(Debug, Clone, Deserialize)]
pub struct Guild {
    pub id: String,
    pub name: String,
}

/// A Discord user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
}

/// A guild member: a user plus guild-local state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub user: User,
    #[serde(default)]
    pub nick: Option<String>,
    /// Role ids currently held by this member.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Member {
    /// Whether this member currently holds the given role.
    pub fn has_role(&self, role_id: &str) -> bool {
        self.roles.iter().any(|r| r == role_id)
    }

    /// Chat-format mention for this member.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.user.id)
    }
}

/// A guild role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    /// Permission bitset, serialized by Discord as a decimal string.
    pub permissions: String,
}

impl Role {
    /// Chat-format mention for this role.
    pub fn mention(&self) -> String {
        format!("<@&{}>", self.id)
    }
}

/// A message created via `POST /channels/{id}/messages`.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    pub content: String,
}

/// Chat-format mention for a channel id.
pub fn channel_mention(channel_id: &str) -> String {
    format!("<#{}>", channel_id)
}

/// Chat-format mention for a bare user id.
pub fn user_mention(user_id: &str) -> String {
    format!("<@{}>", user_id)
}

/// One guild's full member roster, fetched per reconciliation pass.
///
/// Read-only input to the reconciler; the snapshot is never cached across
/// passes.
#[derive(Debug, Clone)]
pub struct GuildSnapshot {
    pub guild_id: String,
    pub members: Vec<Member>,
}

impl GuildSnapshot {
    /// User ids of members currently holding the given role.
    pub fn role_holders(&self, role_id: &str) -> HashSet<String> {
        self.members
            .iter()
            .filter(|m| m.has_role(role_id))
            .map(|m| m.user.id.clone())
            .collect()
    }

    /// Look up a member by user id.
    pub fn member(&self, user_id: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.user.id == user_id)
    }
}
