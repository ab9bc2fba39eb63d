// ── Selector binding ──
//
// The store notifies on every write. A `Selection` remembers the last
// projection it handed out and only reports a change when the new
// projection differs by value.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

/// A projection of store state that filters out unrelated writes.
///
/// Built by [`Store::select`](super::Store::select). Holds a snapshot
/// receiver, not the store itself.
pub struct Selection<S, T> {
    receiver: watch::Receiver<Arc<S>>,
    selector: Box<dyn Fn(&S) -> T + Send + Sync>,
    last: T,
}

impl<S, T> Selection<S, T>
where
    T: Clone + PartialEq,
{
    pub(crate) fn new<F>(mut receiver: watch::Receiver<Arc<S>>, selector: F) -> Self
    where
        F: Fn(&S) -> T + Send + Sync + 'static,
    {
        let last = selector(&receiver.borrow_and_update());
        Self {
            receiver,
            selector: Box::new(selector),
            last,
        }
    }

    /// The projection as of the last reported change.
    pub fn current(&self) -> &T {
        &self.last
    }

    /// Re-evaluate against the latest state without waiting.
    ///
    /// Returns the new projection if it differs from the last one.
    pub fn poll_changed(&mut self) -> Option<T> {
        if !self.receiver.has_changed().unwrap_or(false) {
            return None;
        }
        self.refresh()
    }

    /// Wait until a write changes the projection.
    ///
    /// Returns `None` once the store has been dropped.
    pub async fn changed(&mut self) -> Option<T> {
        loop {
            self.receiver.changed().await.ok()?;
            if let Some(next) = self.refresh() {
                return Some(next);
            }
        }
    }

    fn refresh(&mut self) -> Option<T> {
        let next = (self.selector)(&self.receiver.borrow_and_update());
        if next == self.last {
            return None;
        }
        self.last.clone_from(&next);
        Some(next)
    }
}

impl<S, T: fmt::Debug> fmt::Debug for Selection<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}
