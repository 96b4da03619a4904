//! Core bot logic for Polpetta.
//!
//! This crate owns everything between the Discord REST client and the
//! record store:
//! - **Calendar**: recurring month/day dates and desired-state computation
//! - **Cooldown**: the guard on the date-changing write path
//! - **Differ**: actual role holders vs. the desired set
//! - **Reconciler**: the diff-and-correct engine, one pass per guild
//! - **Scheduler**: the fixed-interval loop over all joined guilds
//! - **Service + commands**: the API the command-handling glue calls

pub mod calendar;
pub mod commands;
mod cooldown;
mod diff;
mod error;
mod reconciler;
pub mod scheduler;
mod service;

pub use cooldown::{CooldownActive, CooldownGuard, SAVE_COOLDOWN_HOURS};
pub use diff::{RoleDiff, diff};
pub use error::ReconcileError;
pub use reconciler::{
    ActionFailure, ActionKind, ReconcileOutcome, ReconcileReport, Reconciler, SkipReason,
};
pub use service::{ForgetOutcome, MeatballService, SaveOutcome};
