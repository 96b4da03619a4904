//! Error types for the bot core.

use thiserror::Error;

/// Errors that abort a whole reconciliation pass.
///
/// Per-user grant/revoke/announce failures never surface here; they are
/// aggregated into the pass report instead.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Record store failure.
    #[error("store error: {0}")]
    Store(#[from] polpetta_store::StoreError),

    /// Discord failure while fetching the guild snapshot or role list.
    #[error("Discord error: {0}")]
    Discord(#[from] polpetta_discord::DiscordError),
}
