// ── Message reducers ──
//
// Pure functions folding live messages into collections and store
// patches. Given equal inputs they return equal outputs, and untouched
// elements keep their relative order.

use crate::message::LiveMessage;
use crate::model::{CalendarEvent, EntityId, Notification};
use crate::store::{AppPatch, AppState};

/// Types addressable by a stable id.
pub trait Keyed {
    fn key(&self) -> &EntityId;
}

impl Keyed for CalendarEvent {
    fn key(&self) -> &EntityId {
        &self.id
    }
}

/// Replace the element with `item`'s id in place, or append `item`.
pub fn upsert_by_id<T: Keyed + Clone>(items: &[T], item: T) -> Vec<T> {
    let mut next = items.to_vec();
    match next.iter_mut().find(|existing| existing.key() == item.key()) {
        Some(slot) => *slot = item,
        None => next.push(item),
    }
    next
}

/// Replace the element with id `id`, leaving the collection as is when absent.
pub fn replace_by_id<T: Keyed + Clone>(items: &[T], id: &EntityId, item: T) -> Vec<T> {
    let mut next = items.to_vec();
    if let Some(slot) = next.iter_mut().find(|existing| existing.key() == id) {
        *slot = item;
    }
    next
}

/// Drop every element with id `id`. Absence is not an error.
pub fn remove_by_id<T: Keyed + Clone>(items: &[T], id: &EntityId) -> Vec<T> {
    items
        .iter()
        .filter(|item| item.key() != id)
        .cloned()
        .collect()
}

/// New event collection after `message`, or `None` if the message does
/// not touch events.
pub fn reduce_events(events: &[CalendarEvent], message: &LiveMessage) -> Option<Vec<CalendarEvent>> {
    match message {
        LiveMessage::Connected => None,
        LiveMessage::EventUpdated(event)
        | LiveMessage::EventInvited(event)
        | LiveMessage::ResponseUpdated(event) => Some(upsert_by_id(events, event.clone())),
        LiveMessage::EventDeleted(id) => Some(remove_by_id(events, id)),
    }
}

/// Store patch for one live message.
///
/// The event slice is only replaced when its contents actually change, so
/// a redelivered snapshot leaves the previous `Arc` in place. Any message
/// proves the stream is up; the handshake also clears a stale error.
pub fn patch_for(state: &AppState, message: &LiveMessage) -> AppPatch {
    let mut patch = AppPatch::new();

    if !state.connected {
        patch = patch.connected(true);
    }

    if let Some(events) = reduce_events(&state.events, message) {
        if events != *state.events {
            patch = patch.events(events);
        }
    }

    match message {
        LiveMessage::Connected => {
            if state.error.is_some() {
                patch = patch.clear_error();
            }
        }
        LiveMessage::EventInvited(event) => {
            patch = patch.notify(Notification::info(format!(
                "You were invited to \"{}\"",
                event.title
            )));
        }
        LiveMessage::EventDeleted(id) => {
            if let Some(known) = state.event(id) {
                patch = patch.notify(Notification::warning(format!(
                    "\"{}\" was deleted",
                    known.title
                )));
            }
        }
        LiveMessage::EventUpdated(_) | LiveMessage::ResponseUpdated(_) => {}
    }

    patch
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::Severity;

    fn event(id: &str, title: &str) -> CalendarEvent {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        CalendarEvent {
            id: EntityId::from(id),
            title: title.into(),
            description: None,
            start: at,
            end: at,
            location: None,
            creator_id: EntityId::from("u-1"),
            created_at: at,
            updated_at: None,
            participants: Vec::new(),
        }
    }

    fn ids(events: &[CalendarEvent]) -> Vec<String> {
        events.iter().map(|e| e.id.to_string()).collect()
    }

    #[test]
    fn upsert_replaces_in_place() {
        let events = vec![event("a", "A"), event("b", "B"), event("c", "C")];
        let next = upsert_by_id(&events, event("b", "B2"));

        assert_eq!(ids(&next), vec!["a", "b", "c"]);
        assert_eq!(next[1].title, "B2");
        assert_eq!(events[1].title, "B");
    }

    #[test]
    fn upsert_appends_new() {
        let events = vec![event("a", "A")];
        let next = upsert_by_id(&events, event("z", "Z"));
        assert_eq!(ids(&next), vec!["a", "z"]);
    }

    #[test]
    fn upsert_is_idempotent() {
        let events = vec![event("a", "A"), event("b", "B")];
        let message = LiveMessage::EventUpdated(event("b", "B2"));

        let once = reduce_events(&events, &message).unwrap();
        let twice = reduce_events(&once, &message).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn remove_absent_is_noop() {
        let events = vec![event("a", "A"), event("b", "B")];
        let next = remove_by_id(&events, &EntityId::from("missing"));
        assert_eq!(next, events);
    }

    #[test]
    fn remove_keeps_order() {
        let events = vec![event("a", "A"), event("b", "B"), event("c", "C")];
        let next = remove_by_id(&events, &EntityId::from("b"));
        assert_eq!(ids(&next), vec!["a", "c"]);
    }

    #[test]
    fn replace_ignores_absent() {
        let events = vec![event("a", "A")];
        assert_eq!(replace_by_id(&events, &EntityId::from("x"), event("x", "X")), events);
    }

    #[test]
    fn connected_does_not_touch_events() {
        assert_eq!(reduce_events(&[event("a", "A")], &LiveMessage::Connected), None);
    }

    #[test]
    fn handshake_marks_connected_and_clears_error() {
        let state = AppState {
            error: Some("stream lost".into()),
            ..AppState::default()
        };
        let patch = patch_for(&state, &LiveMessage::Connected);
        assert_eq!(patch, AppPatch::new().connected(true).clear_error());
    }

    #[test]
    fn redelivered_snapshot_keeps_events_arc() {
        let state = AppState {
            connected: true,
            events: Arc::new(vec![event("a", "A")]),
            ..AppState::default()
        };
        let patch = patch_for(&state, &LiveMessage::EventUpdated(event("a", "A")));
        assert!(patch.is_empty());
    }

    #[test]
    fn invite_adds_event_and_info_toast() {
        let state = AppState {
            connected: true,
            ..AppState::default()
        };
        let patch = patch_for(&state, &LiveMessage::EventInvited(event("p", "Party")));

        assert_eq!(patch.events.as_deref().map(|e| ids(e)), Some(vec!["p".to_owned()]));
        let toast = patch.notification.flatten().unwrap();
        assert_eq!(toast.severity, Severity::Info);
        assert!(toast.message.contains("Party"));
    }

    #[test]
    fn delete_warns_only_for_known_events() {
        let state = AppState {
            connected: true,
            events: Arc::new(vec![event("a", "Offsite")]),
            ..AppState::default()
        };

        let patch = patch_for(&state, &LiveMessage::EventDeleted(EntityId::from("a")));
        assert_eq!(patch.events.as_deref(), Some(&Vec::new()));
        assert_eq!(
            patch.notification,
            Some(Some(Notification::warning("\"Offsite\" was deleted")))
        );

        let patch = patch_for(&state, &LiveMessage::EventDeleted(EntityId::from("zz")));
        assert!(patch.is_empty());
    }
}
