// ── Reactive store ──
//
// Immutable-snapshot state container with unconditional change
// notification. Every write merges a partial patch into a fresh `Arc<S>`,
// publishes it, then calls every subscriber once. Projection-level change
// filtering lives in `selector`.

mod selector;
mod state;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use dashmap::DashMap;
use tokio::sync::watch;
use tracing::trace;

pub use selector::Selection;
pub use state::{AppPatch, AppState};

/// State that can absorb a partial update.
///
/// `merge` must not modify `self`; it returns the next state. Fields the
/// patch leaves unset carry over from `self`.
pub trait Merge: Send + Sync + 'static {
    type Patch;

    fn merge(&self, patch: Self::Patch) -> Self;
}

type Callback = Arc<dyn Fn() + Send + Sync>;
type Subscribers = DashMap<u64, Callback>;

/// A reactive state container.
///
/// Reads are lock-free snapshot clones. Writes are serialised: concurrent
/// `set`/`update` calls from several tasks are applied one at a time, and
/// every subscriber observes the state after its notifying write when it
/// calls [`get`](Self::get).
pub struct Store<S: Merge> {
    state: watch::Sender<Arc<S>>,
    writer: Mutex<()>,
    subscribers: Arc<Subscribers>,
    next_subscriber: AtomicU64,
    version: AtomicU64,
}

impl<S: Merge + Default> Default for Store<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S: Merge> Store<S> {
    pub fn new(initial: S) -> Self {
        let (state, _) = watch::channel(Arc::new(initial));
        Self {
            state,
            writer: Mutex::new(()),
            subscribers: Arc::new(DashMap::new()),
            next_subscriber: AtomicU64::new(0),
            version: AtomicU64::new(0),
        }
    }

    /// Current state snapshot (cheap `Arc` clone).
    pub fn get(&self) -> Arc<S> {
        self.state.borrow().clone()
    }

    /// Number of writes applied so far.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Merge `patch` into the current state and notify subscribers.
    pub fn set(&self, patch: S::Patch) {
        self.update(|_| patch);
    }

    /// Compute a patch from the current state, merge it, and notify.
    ///
    /// The read and the write happen under the writer lock, so concurrent
    /// updates never lose each other's changes. `f` must not write to this
    /// store itself; reading through the `&S` it is given is fine.
    pub fn update(&self, f: impl FnOnce(&S) -> S::Patch) {
        {
            let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
            let current = self.get();
            let next = current.merge(f(&current));
            self.state.send_replace(Arc::new(next));
            self.version.fetch_add(1, Ordering::AcqRel);
        }
        self.notify();
    }

    /// Register a callback invoked after every write.
    ///
    /// The callback runs synchronously on the writing task, outside any
    /// store lock, so it may call `get`, `set`, `subscribe`, or drop
    /// subscriptions. It is removed when the returned [`Subscription`] is
    /// dropped or [`unsubscribed`](Subscription::unsubscribe).
    pub fn subscribe(&self, callback: impl Fn() + Send + Sync + 'static) -> Subscription {
        let id = self.next_subscriber.fetch_add(1, Ordering::Relaxed);
        self.subscribers.insert(id, Arc::new(callback));
        trace!(id, "store subscriber added");
        Subscription {
            id,
            subscribers: Arc::downgrade(&self.subscribers),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Receiver that sees every published snapshot, for async consumers.
    pub fn watch(&self) -> watch::Receiver<Arc<S>> {
        self.state.subscribe()
    }

    /// Track a projection of the state; see [`Selection`].
    pub fn select<T, F>(&self, selector: F) -> Selection<S, T>
    where
        T: Clone + PartialEq,
        F: Fn(&S) -> T + Send + Sync + 'static,
    {
        Selection::new(self.watch(), selector)
    }

    /// Register a callback that only fires when `selector`'s result
    /// changes by value.
    ///
    /// The projection is evaluated after each write; `on_change` receives
    /// the new value. Unrelated writes are filtered out here, not in the
    /// store.
    pub fn subscribe_selected<T, F, C>(&self, selector: F, on_change: C) -> Subscription
    where
        T: Clone + PartialEq + Send + 'static,
        F: Fn(&S) -> T + Send + Sync + 'static,
        C: Fn(&T) + Send + Sync + 'static,
    {
        let last = Mutex::new(selector(&self.get()));
        let state = self.watch();

        self.subscribe(move || {
            let next = selector(&state.borrow());
            {
                let mut last = last.lock().unwrap_or_else(PoisonError::into_inner);
                if *last == next {
                    return;
                }
                last.clone_from(&next);
            }
            on_change(&next);
        })
    }

    fn notify(&self) {
        let mut callbacks: Vec<(u64, Callback)> = self
            .subscribers
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();
        callbacks.sort_unstable_by_key(|(id, _)| *id);

        trace!(subscribers = callbacks.len(), "notifying store subscribers");
        for (_, callback) in callbacks {
            callback();
        }
    }
}

// ── Subscription ─────────────────────────────────────────────────────

/// Handle to a registered store callback. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    subscribers: Weak<Subscribers>,
}

impl Subscription {
    /// Remove the callback. Equivalent to dropping the handle.
    pub fn unsubscribe(self) {
        drop(self);
    }

    /// Keep the callback registered for the lifetime of the store.
    pub fn detach(self) {
        std::mem::forget(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            subscribers.remove(&self.id);
            trace!(id = self.id, "store subscriber removed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Counter {
        a: i32,
        b: i32,
    }

    #[derive(Default)]
    struct CounterPatch {
        a: Option<i32>,
        b: Option<i32>,
    }

    impl Merge for Counter {
        type Patch = CounterPatch;

        fn merge(&self, patch: CounterPatch) -> Self {
            Self {
                a: patch.a.unwrap_or(self.a),
                b: patch.b.unwrap_or(self.b),
            }
        }
    }

    fn counting(store: &Store<Counter>) -> (Arc<AtomicUsize>, Subscription) {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let sub = store.subscribe(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (calls, sub)
    }

    #[test]
    fn set_merges_and_notifies_once() {
        let store = Store::<Counter>::default();
        let (calls, _sub) = counting(&store);

        store.set(CounterPatch {
            a: Some(1),
            ..CounterPatch::default()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*store.get(), Counter { a: 1, b: 0 });
        assert_eq!(store.version(), 1);
    }

    #[test]
    fn previous_snapshot_is_untouched() {
        let store = Store::new(Counter { a: 1, b: 2 });
        let before = store.get();

        store.set(CounterPatch {
            b: Some(5),
            ..CounterPatch::default()
        });

        assert_eq!(*before, Counter { a: 1, b: 2 });
        assert_eq!(*store.get(), Counter { a: 1, b: 5 });
        assert!(!Arc::ptr_eq(&before, &store.get()));
    }

    #[test]
    fn empty_patch_still_notifies() {
        let store = Store::<Counter>::default();
        let (calls, _sub) = counting(&store);

        store.set(CounterPatch::default());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn update_reads_current_state() {
        let store = Store::<Counter>::default();
        for _ in 0..3 {
            store.update(|s| CounterPatch {
                a: Some(s.a + 1),
                ..CounterPatch::default()
            });
        }
        assert_eq!(store.get().a, 3);
    }

    #[test]
    fn subscriptions_are_independent() {
        let store = Store::<Counter>::default();
        let (first, first_sub) = counting(&store);
        let (second, _second_sub) = counting(&store);
        assert_eq!(store.subscriber_count(), 2);

        first_sub.unsubscribe();
        store.set(CounterPatch::default());

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(store.subscriber_count(), 1);
    }

    #[test]
    fn detached_subscription_stays_registered() {
        let store = Store::<Counter>::default();
        let (calls, sub) = counting(&store);
        sub.detach();

        store.set(CounterPatch::default());
        store.set(CounterPatch::default());

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn subscriber_sees_new_state() {
        let store = Arc::new(Store::<Counter>::default());
        let observed = Arc::new(Mutex::new(Vec::new()));

        let reader = Arc::clone(&store);
        let sink = Arc::clone(&observed);
        let _sub = store.subscribe(move || {
            sink.lock().unwrap().push(reader.get().a);
        });

        store.set(CounterPatch {
            a: Some(7),
            ..CounterPatch::default()
        });
        store.set(CounterPatch {
            a: Some(8),
            ..CounterPatch::default()
        });

        assert_eq!(*observed.lock().unwrap(), vec![7, 8]);
    }

    #[test]
    fn subscriber_may_write_back() {
        let store = Arc::new(Store::<Counter>::default());
        let writer = Arc::clone(&store);
        let _sub = store.subscribe(move || {
            let state = writer.get();
            if state.a > 0 && state.b == 0 {
                writer.set(CounterPatch {
                    b: Some(state.a * 10),
                    ..CounterPatch::default()
                });
            }
        });

        store.set(CounterPatch {
            a: Some(2),
            ..CounterPatch::default()
        });

        assert_eq!(*store.get(), Counter { a: 2, b: 20 });
        assert_eq!(store.version(), 2);
    }

    #[test]
    fn subscription_outliving_store_is_harmless() {
        let store = Store::<Counter>::default();
        let (_, sub) = counting(&store);
        drop(store);
        sub.unsubscribe();
    }

    #[test]
    fn selected_subscriber_ignores_unrelated_writes() {
        let store = Store::<Counter>::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = store.subscribe_selected(
            |s: &Counter| s.a,
            move |a: &i32| sink.lock().unwrap().push(*a),
        );

        store.set(CounterPatch {
            b: Some(1),
            ..CounterPatch::default()
        });
        store.set(CounterPatch {
            a: Some(4),
            ..CounterPatch::default()
        });
        store.set(CounterPatch {
            a: Some(4),
            b: Some(9),
        });

        assert_eq!(*seen.lock().unwrap(), vec![4]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_updates_are_serialised() {
        let store = Arc::new(Store::<Counter>::default());
        let (calls, _sub) = counting(&store);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    for _ in 0..50 {
                        store.update(|s| CounterPatch {
                            a: Some(s.a + 1),
                            ..CounterPatch::default()
                        });
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(store.get().a, 400);
        assert_eq!(store.version(), 400);
        assert_eq!(calls.load(Ordering::SeqCst), 400);
    }
}
