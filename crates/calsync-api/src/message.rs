//! Wire-level messages carried in the `data:` field of each stream frame.
//!
//! Every payload is a JSON envelope `{ "type": <tag>, "data": <payload> }`.
//! The tag is matched once, here, and the rest of the workspace works with
//! the [`StreamMessage`] sum type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

// ── Tags ─────────────────────────────────────────────────────────────

pub const TAG_CONNECTED: &str = "connected";
pub const TAG_EVENT_UPDATED: &str = "event_updated";
pub const TAG_EVENT_INVITE_SENT: &str = "event_invite_sent";
pub const TAG_EVENT_RESPONSE_UPDATED: &str = "event_response_updated";
pub const TAG_EVENT_DELETED: &str = "event_deleted";

// ── Payloads ─────────────────────────────────────────────────────────

/// Public profile of a participant as embedded in an event snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfoPayload {
    pub id: String,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

/// One invitee and their response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantPayload {
    pub user: UserInfoPayload,
    /// `"accepted"`, `"declined"` or `"pending"`.
    pub status: String,
    pub invited_at: DateTime<Utc>,
    #[serde(default)]
    pub responded_at: Option<DateTime<Utc>>,
}

/// Full calendar event snapshot, as sent by the server on every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPayload {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<String>,
    pub creator_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub participants: Vec<ParticipantPayload>,
}

/// Payload of `event_deleted`. The server sends the whole snapshot; only
/// the id is needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedEvent {
    pub id: String,
}

// ── StreamMessage ────────────────────────────────────────────────────

/// A decoded application message from the live stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamMessage {
    /// Handshake sent once when the server registers the connection.
    Connected,
    EventUpdated(EventPayload),
    EventInviteSent(EventPayload),
    EventResponseUpdated(EventPayload),
    EventDeleted(DeletedEvent),
    /// Tag not known to this client. Logged and skipped by the stream client.
    Unknown { kind: String },
}

impl StreamMessage {
    /// The wire tag this message was decoded from.
    pub fn kind(&self) -> &str {
        match self {
            Self::Connected => TAG_CONNECTED,
            Self::EventUpdated(_) => TAG_EVENT_UPDATED,
            Self::EventInviteSent(_) => TAG_EVENT_INVITE_SENT,
            Self::EventResponseUpdated(_) => TAG_EVENT_RESPONSE_UPDATED,
            Self::EventDeleted(_) => TAG_EVENT_DELETED,
            Self::Unknown { kind } => kind,
        }
    }

    /// Decode a raw JSON payload (the value of a frame's `data:` field).
    pub fn from_json(payload: &str) -> Result<Self, Error> {
        let envelope: Envelope =
            serde_json::from_str(payload).map_err(|e| decode_error(&e, payload))?;

        let message = match envelope.kind.as_str() {
            TAG_CONNECTED => Self::Connected,
            TAG_EVENT_UPDATED => Self::EventUpdated(envelope.payload(payload)?),
            TAG_EVENT_INVITE_SENT => Self::EventInviteSent(envelope.payload(payload)?),
            TAG_EVENT_RESPONSE_UPDATED => Self::EventResponseUpdated(envelope.payload(payload)?),
            TAG_EVENT_DELETED => Self::EventDeleted(envelope.payload(payload)?),
            _ => Self::Unknown {
                kind: envelope.kind,
            },
        };
        Ok(message)
    }
}

/// Raw envelope before the tag is resolved.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

impl Envelope {
    fn payload<T: serde::de::DeserializeOwned>(self, raw: &str) -> Result<T, Error> {
        serde_json::from_value(self.data).map_err(|e| decode_error(&e, raw))
    }
}

fn decode_error(err: &serde_json::Error, payload: &str) -> Error {
    Error::Decode {
        message: err.to_string(),
        payload: payload.to_owned(),
    }
}
