// ── Application state ──
//
// The fixed set of slices the UI reads, the patch type that updates them,
// and the named actions the rest of the app calls instead of building
// patches by hand.

use std::sync::Arc;

use crate::model::{CalendarEvent, EntityId, Notification, UserSummary};
use crate::reducer::{remove_by_id, replace_by_id, upsert_by_id};

use super::{Merge, Store};

/// Everything the UI renders from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    /// The signed-in user.
    pub user: Option<UserSummary>,
    /// Events visible to the user, in server order.
    pub events: Arc<Vec<CalendarEvent>>,
    pub loading: bool,
    /// Last error worth showing in place of content.
    pub error: Option<String>,
    /// Whether the live stream is currently delivering updates.
    pub connected: bool,
    /// Transient toast, cleared by `dismiss_notification`.
    pub notification: Option<Notification>,
}

impl AppState {
    pub fn event(&self, id: &EntityId) -> Option<&CalendarEvent> {
        self.events.iter().find(|e| &e.id == id)
    }
}

/// Partial update of [`AppState`]. `None` leaves a slice untouched.
///
/// Nullable slices take `Some(None)` to clear them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppPatch {
    pub user: Option<Option<UserSummary>>,
    pub events: Option<Arc<Vec<CalendarEvent>>>,
    pub loading: Option<bool>,
    pub error: Option<Option<String>>,
    pub connected: Option<bool>,
    pub notification: Option<Option<Notification>>,
}

impl AppPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(mut self, user: Option<UserSummary>) -> Self {
        self.user = Some(user);
        self
    }

    pub fn events(mut self, events: impl Into<Arc<Vec<CalendarEvent>>>) -> Self {
        self.events = Some(events.into());
        self
    }

    pub fn loading(mut self, loading: bool) -> Self {
        self.loading = Some(loading);
        self
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(Some(error.into()));
        self
    }

    pub fn clear_error(mut self) -> Self {
        self.error = Some(None);
        self
    }

    pub fn connected(mut self, connected: bool) -> Self {
        self.connected = Some(connected);
        self
    }

    pub fn notify(mut self, notification: Notification) -> Self {
        self.notification = Some(Some(notification));
        self
    }

    pub fn dismiss(mut self) -> Self {
        self.notification = Some(None);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Merge for AppState {
    type Patch = AppPatch;

    fn merge(&self, patch: AppPatch) -> Self {
        Self {
            user: patch.user.unwrap_or_else(|| self.user.clone()),
            events: patch.events.unwrap_or_else(|| Arc::clone(&self.events)),
            loading: patch.loading.unwrap_or(self.loading),
            error: patch.error.unwrap_or_else(|| self.error.clone()),
            connected: patch.connected.unwrap_or(self.connected),
            notification: patch
                .notification
                .unwrap_or_else(|| self.notification.clone()),
        }
    }
}

// ── Actions ──────────────────────────────────────────────────────────

impl Store<AppState> {
    pub fn set_user(&self, user: Option<UserSummary>) {
        self.set(AppPatch::new().user(user));
    }

    pub fn set_events(&self, events: Vec<CalendarEvent>) {
        self.set(AppPatch::new().events(events));
    }

    /// Add an event, replacing any existing event with the same id.
    pub fn add_event(&self, event: CalendarEvent) {
        self.update(|s| AppPatch::new().events(upsert_by_id(&s.events, event)));
    }

    /// Replace the event with id `id`. No-op on the collection if absent.
    pub fn update_event(&self, id: &EntityId, event: CalendarEvent) {
        self.update(|s| AppPatch::new().events(replace_by_id(&s.events, id, event)));
    }

    pub fn remove_event(&self, id: &EntityId) {
        self.update(|s| AppPatch::new().events(remove_by_id(&s.events, id)));
    }

    pub fn set_loading(&self, loading: bool) {
        self.set(AppPatch::new().loading(loading));
    }

    pub fn set_error(&self, error: Option<String>) {
        self.set(AppPatch {
            error: Some(error),
            ..AppPatch::default()
        });
    }

    pub fn clear_error(&self) {
        self.set(AppPatch::new().clear_error());
    }

    pub fn show_notification(&self, notification: Notification) {
        self.set(AppPatch::new().notify(notification));
    }

    pub fn show_success(&self, message: impl Into<String>) {
        self.show_notification(Notification::success(message));
    }

    pub fn show_error(&self, message: impl Into<String>) {
        self.show_notification(Notification::error(message));
    }

    pub fn show_info(&self, message: impl Into<String>) {
        self.show_notification(Notification::info(message));
    }

    pub fn show_warning(&self, message: impl Into<String>) {
        self.show_notification(Notification::warning(message));
    }

    pub fn dismiss_notification(&self) {
        self.set(AppPatch::new().dismiss());
    }
}
