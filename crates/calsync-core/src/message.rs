// ── Live messages ──
//
// Domain view of a stream message: payloads already converted into model
// types, unknown tags already filtered out.

use crate::model::{CalendarEvent, EntityId};

/// A message from the live stream that the store knows how to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveMessage {
    /// The server registered this connection.
    Connected,
    /// An event was created or edited.
    EventUpdated(CalendarEvent),
    /// The current user was invited to an event.
    EventInvited(CalendarEvent),
    /// A participant answered an invitation.
    ResponseUpdated(CalendarEvent),
    EventDeleted(EntityId),
}

impl LiveMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::EventUpdated(_) => "event_updated",
            Self::EventInvited(_) => "event_invited",
            Self::ResponseUpdated(_) => "response_updated",
            Self::EventDeleted(_) => "event_deleted",
        }
    }

    /// The event snapshot carried by this message, if any.
    pub fn event(&self) -> Option<&CalendarEvent> {
        match self {
            Self::EventUpdated(e) | Self::EventInvited(e) | Self::ResponseUpdated(e) => Some(e),
            Self::Connected | Self::EventDeleted(_) => None,
        }
    }
}
