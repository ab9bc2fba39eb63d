// ── Wire-to-domain conversions ──
//
// Bridges `calsync_api` payloads into `calsync_core::model` types. Each
// `From` impl parses string ids and statuses into strong types.

use tracing::{debug, warn};

use calsync_api::message::{EventPayload, ParticipantPayload, UserInfoPayload};
use calsync_api::StreamMessage;

use crate::message::LiveMessage;
use crate::model::{CalendarEvent, EntityId, Participant, ParticipantStatus, UserSummary};

/// Parse a participant status, treating anything unrecognised as pending.
fn parse_status(raw: &str) -> ParticipantStatus {
    raw.parse().unwrap_or_else(|_| {
        debug!(status = raw, "unknown participant status, treating as pending");
        ParticipantStatus::Pending
    })
}

impl From<UserInfoPayload> for UserSummary {
    fn from(u: UserInfoPayload) -> Self {
        Self {
            id: EntityId::from(u.id),
            email: u.email,
            username: u.username,
            first_name: u.first_name,
            last_name: u.last_name,
        }
    }
}

impl From<ParticipantPayload> for Participant {
    fn from(p: ParticipantPayload) -> Self {
        Self {
            status: parse_status(&p.status),
            user: UserSummary::from(p.user),
            invited_at: p.invited_at,
            responded_at: p.responded_at,
        }
    }
}

impl From<EventPayload> for CalendarEvent {
    fn from(e: EventPayload) -> Self {
        Self {
            id: EntityId::from(e.id),
            title: e.title,
            description: e.description.filter(|d| !d.is_empty()),
            start: e.start_time,
            end: e.end_time,
            location: e.location.filter(|l| !l.is_empty()),
            creator_id: EntityId::from(e.creator_id),
            created_at: e.created_at,
            updated_at: e.updated_at,
            participants: e.participants.into_iter().map(Participant::from).collect(),
        }
    }
}

impl LiveMessage {
    /// Convert a decoded stream message. Returns `None` for tags this
    /// client does not understand.
    pub fn from_stream(message: StreamMessage) -> Option<Self> {
        let live = match message {
            StreamMessage::Connected => Self::Connected,
            StreamMessage::EventUpdated(e) => Self::EventUpdated(e.into()),
            StreamMessage::EventInviteSent(e) => Self::EventInvited(e.into()),
            StreamMessage::EventResponseUpdated(e) => Self::ResponseUpdated(e.into()),
            StreamMessage::EventDeleted(d) => Self::EventDeleted(EntityId::from(d.id)),
            StreamMessage::Unknown { kind } => {
                warn!(kind = %kind, "ignoring unknown live message");
                return None;
            }
        };
        Some(live)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use calsync_api::message::DeletedEvent;

    use super::*;

    fn payload() -> EventPayload {
        serde_json::from_value(json!({
            "id": "5f0c8a7e-1111-4c1e-9a55-000000000001",
            "title": "Standup",
            "description": "",
            "start_time": "2026-10-19T09:00:00Z",
            "end_time": "2026-10-19T09:15:00Z",
            "location": "Room 4",
            "creator_id": "u-1",
            "created_at": "2026-10-01T08:00:00Z",
            "participants": [{
                "user": {
                    "id": "u-2",
                    "email": "bob@example.com",
                    "username": "bob",
                    "first_name": "Bob",
                    "last_name": "Builder"
                },
                "status": "tentative",
                "invited_at": "2026-10-01T08:00:00Z"
            }]
        }))
        .unwrap()
    }

    #[test]
    fn event_payload_converts() {
        let event = CalendarEvent::from(payload());

        assert!(event.id.as_uuid().is_some());
        assert_eq!(event.creator_id, EntityId::from("u-1"));
        assert_eq!(event.description, None);
        assert_eq!(event.location.as_deref(), Some("Room 4"));
        assert_eq!(event.participants.len(), 1);
        assert_eq!(event.participants[0].user.display_name(), "Bob Builder");
    }

    #[test]
    fn unknown_status_is_pending() {
        let event = CalendarEvent::from(payload());
        assert_eq!(event.participants[0].status, ParticipantStatus::Pending);
        assert_eq!(parse_status("accepted"), ParticipantStatus::Accepted);
    }

    #[test]
    fn stream_messages_map_to_live_messages() {
        assert_eq!(
            LiveMessage::from_stream(StreamMessage::Connected),
            Some(LiveMessage::Connected)
        );
        assert_eq!(
            LiveMessage::from_stream(StreamMessage::EventDeleted(DeletedEvent { id: "e1".into() })),
            Some(LiveMessage::EventDeleted(EntityId::from("e1")))
        );

        let invited = LiveMessage::from_stream(StreamMessage::EventInviteSent(payload())).unwrap();
        assert_eq!(invited.kind(), "event_invited");
        assert_eq!(invited.event().map(|e| e.title.as_str()), Some("Standup"));
    }

    #[test]
    fn unknown_tags_are_dropped() {
        let unknown = StreamMessage::Unknown {
            kind: "calendar_shared".into(),
        };
        assert_eq!(LiveMessage::from_stream(unknown), None);
    }
}
