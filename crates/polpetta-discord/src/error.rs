//! Error types for the Discord client.

use thiserror::Error;

/// Errors that can occur when talking to the Discord API.
#[derive(Debug, Error)]
pub enum DiscordError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Resource not found (deleted guild, kicked member, removed channel).
    #[error("not found: {resource}")]
    NotFound { resource: String },

    /// Discord API error payload (`{code, message}`).
    #[error("Discord API error {code} ({status}): {message}")]
    Api {
        status: u16,
        code: u64,
        message: String,
    },

    /// Rate limited.
    #[error("rate limited (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: f64 },

    /// Response body did not match the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
