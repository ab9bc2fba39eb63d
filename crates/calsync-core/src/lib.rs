//! Reactive data layer between `calsync-api` and UI consumers.
//!
//! - **[`Store`]**: immutable-snapshot state container. `set` / `update`
//!   merge a partial patch into a fresh `Arc` and notify every subscriber
//!   synchronously. [`Selection`] and [`Store::subscribe_selected`] filter
//!   those notifications down to a projection that changed by value.
//!
//! - **[`AppState`]**: the fixed slices the calendar UI renders from (user,
//!   events, loading, error, connected, notification) with named actions on
//!   `Store<AppState>`.
//!
//! - **[`reducer`]**: pure upsert/remove-by-id folds and [`patch_for`],
//!   which turns one [`LiveMessage`] into an [`AppPatch`].
//!
//! - **[`LiveSync`]**: owns the active [`calsync_api::StreamClient`] and
//!   bridges its messages into the store. Reconnecting is caller-driven.

pub mod config;
pub mod convert;
pub mod error;
pub mod message;
pub mod model;
pub mod reducer;
pub mod store;
pub mod sync;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::SyncConfig;
pub use error::CoreError;
pub use message::LiveMessage;
pub use reducer::{Keyed, patch_for, reduce_events, remove_by_id, upsert_by_id};
pub use store::{AppPatch, AppState, Merge, Selection, Store, Subscription};
pub use sync::LiveSync;

pub use calsync_api::ConnectionState;

pub use model::{
    CalendarEvent, EntityId, Notification, Participant, ParticipantStatus, Severity, UserSummary,
};
