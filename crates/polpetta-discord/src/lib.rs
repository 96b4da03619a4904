//! Discord REST client for Polpetta.
//!
//! This crate provides the slice of the Discord v10 HTTP API that the bot
//! needs: joined-guild and member listings, role mutations, and channel
//! messages. The gateway (websocket session, slash-command registration)
//! lives outside this workspace; everything here is plain authenticated
//! REST.

mod client;
mod error;
pub mod permissions;
mod types;

pub use client::{DEFAULT_API_URL, DiscordClient};
pub use error::DiscordError;
pub use types::{
    CurrentUser, Guild, GuildSnapshot, Member, Message, Role, User, channel_mention, user_mention,
};
