// ── Domain model ──
//
// Canonical types the store holds and the UI reads. Wire payloads from
// `calsync-api` are converted into these in `crate::convert`.

pub mod entity_id;
pub mod event;
pub mod notification;

// ── Re-exports ──────────────────────────────────────────────────────

pub use entity_id::EntityId;
pub use event::{CalendarEvent, Participant, ParticipantStatus, UserSummary};
pub use notification::{Notification, Severity};
