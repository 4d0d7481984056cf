//! Live query handles and the subscription registry behind them.
//!
//! A [`LiveQuery`] is a continuously-updated view of one query shape: either
//! the full roster or a single employee by id. It always carries a current
//! value ([`LiveQuery::current`] never blocks) and re-emits whenever a store
//! mutation affects its shape. Dropping or [`cancel`](LiveQuery::cancel)-ing
//! the handle stops emissions to that caller and nothing else: in-flight
//! reconciliation writes still land in the store and still reach every other
//! open handle.
//!
//! `QueryHub` is the store-side registry: one watch channel for the
//! all-employees shape and one per watched id. The hub only ever holds
//! channel senders, so a registration cannot keep a caller's scope alive;
//! senders whose receivers are all gone are swept on the next publish or
//! subscription.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::employee::Employee;

/// A live, cancellable view of one query's result.
///
/// Cloning yields an independent handle over the same subscription, useful
/// for restarting consumption after handing the original to a task.
pub struct LiveQuery<T> {
    rx: watch::Receiver<T>,
}

impl<T: Clone> LiveQuery<T> {
    pub(crate) fn new(rx: watch::Receiver<T>) -> Self {
        Self { rx }
    }

    /// The current result. Never blocks; the value is seeded from the store
    /// at subscription time and kept current by every affecting mutation.
    pub fn current(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Wait for the next re-emission and return the new result.
    ///
    /// Returns `None` once the owning store has been dropped. Emissions that
    /// arrive while the caller is not waiting are not queued: the next call
    /// returns the latest result, which is the contract a live view needs.
    pub async fn next(&mut self) -> Option<T> {
        match self.rx.changed().await {
            Ok(()) => Some(self.rx.borrow_and_update().clone()),
            Err(_) => None,
        }
    }

    /// True while the owning store is still alive.
    pub fn is_live(&self) -> bool {
        self.rx.has_changed().is_ok()
    }

    /// Whether a re-emission arrived that [`next`](Self::next) has not yet
    /// consumed. False once the owning store is gone.
    pub fn has_update(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Explicitly end this subscription. Equivalent to dropping the handle;
    /// provided so scope-bound teardown reads as intent rather than accident.
    pub fn cancel(self) {}
}

impl<T: Clone + Send + Sync + 'static> LiveQuery<T> {
    /// Adapt the handle into a `Stream`. The first item is the current
    /// result, mirroring the initial emission of a fresh subscription.
    pub fn into_stream(self) -> WatchStream<T> {
        WatchStream::new(self.rx)
    }
}

impl<T> Clone for LiveQuery<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

impl<T> std::fmt::Debug for LiveQuery<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveQuery").finish_non_exhaustive()
    }
}

/// Per-shape subscription registry shared by the store adapters.
///
/// Invariant: every sender present in the hub holds the current result for
/// its shape. Stores guarantee this by seeding subscriptions and publishing
/// mutations under the same lock that orders their writes.
pub(crate) struct QueryHub {
    state: Mutex<HubState>,
}

#[derive(Default)]
struct HubState {
    all: Option<watch::Sender<Vec<Employee>>>,
    by_id: HashMap<u32, watch::Sender<Option<Employee>>>,
}

impl QueryHub {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(HubState::default()),
        }
    }

    /// Subscribe to the full-roster shape. `seed` must be the store's current
    /// result set; it is used only when no channel for the shape exists yet.
    pub(crate) fn subscribe_all(&self, seed: Vec<Employee>) -> LiveQuery<Vec<Employee>> {
        let mut state = self.state.lock();
        if let Some(sender) = &state.all {
            return LiveQuery::new(sender.subscribe());
        }
        let (tx, rx) = watch::channel(seed);
        state.all = Some(tx);
        LiveQuery::new(rx)
    }

    /// Subscribe to a single id. `seed` must be the store's current record
    /// for that id; it is used only when the id is not yet watched.
    ///
    /// Ids whose subscribers are all gone are swept here, so the registry
    /// is bounded by live subscriptions rather than by every id ever
    /// watched.
    pub(crate) fn subscribe_one(&self, id: u32, seed: Option<Employee>) -> LiveQuery<Option<Employee>> {
        let mut state = self.state.lock();
        state.by_id.retain(|_, sender| !sender.is_closed());
        if let Some(sender) = state.by_id.get(&id) {
            return LiveQuery::new(sender.subscribe());
        }
        let (tx, rx) = watch::channel(seed);
        state.by_id.insert(id, tx);
        LiveQuery::new(rx)
    }

    /// Whether any full-roster subscriber is listening. Sweeps an abandoned
    /// channel so stores can skip recomputing the result set for nobody.
    pub(crate) fn wants_all(&self) -> bool {
        let mut state = self.state.lock();
        match &state.all {
            Some(sender) if sender.is_closed() => {
                state.all = None;
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Push a new full-roster result to subscribers, if any remain.
    pub(crate) fn publish_all(&self, roster: Vec<Employee>) {
        let mut state = self.state.lock();
        if let Some(sender) = &state.all {
            if sender.is_closed() {
                state.all = None;
            } else {
                let _ = sender.send_replace(roster);
            }
        }
    }

    /// Push the new record for one id to its subscribers, if any remain.
    pub(crate) fn publish_one(&self, id: u32, value: Option<Employee>) {
        let mut state = self.state.lock();
        if let Some(sender) = state.by_id.get(&id) {
            if sender.is_closed() {
                state.by_id.remove(&id);
            } else {
                let _ = sender.send_replace(value);
            }
        }
    }
}

impl Default for QueryHub {
    fn default() -> Self {
        Self::new()
    }
}
