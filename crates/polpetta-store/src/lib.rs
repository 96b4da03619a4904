//! SQLite-backed record store for Polpetta.
//!
//! Three record kinds, all keyed by guild: per-member meatball days, the
//! guild's configured meatball role, and the guild's announcement channel.
//! Lookups return `Ok(None)` for missing records; errors are reserved for
//! the storage layer itself.

mod error;
mod schema;
mod store;
mod types;

pub use error::StoreError;
pub use store::MeatballStore;
pub use types::{MeatballChannel, MeatballDay, MeatballRole};
