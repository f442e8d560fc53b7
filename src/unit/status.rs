//! Lifecycle states and the broadcast status channel
//!
//! Every unit owns exactly one [`StatusChannel`]. The channel is write-only
//! from the unit's transition logic; observers are read-only with respect to
//! execution and subscribing has no side effect on the unit's behavior.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::core::errors::UnitError;

/// The stages a unit passes through.
///
/// Discriminants are distinct bit flags so a consumer can test membership in
/// a set of states with a single mask, see [`LifecycleState::in_set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum LifecycleState {
    Initialized = 1,
    Running = 2,
    MainDone = 4,
    RunningDependencies = 8,
    Done = 16,
    Error = 32,
}

impl LifecycleState {
    /// Bit flag value of this state
    pub fn bits(self) -> u32 {
        self as u32
    }

    /// Whether this state is contained in a mask of OR-ed state bits
    ///
    /// ```
    /// use unitflow::LifecycleState;
    ///
    /// let settled = LifecycleState::Done.bits() | LifecycleState::Error.bits();
    /// assert!(LifecycleState::Error.in_set(settled));
    /// assert!(!LifecycleState::Running.in_set(settled));
    /// ```
    pub fn in_set(self, mask: u32) -> bool {
        self.bits() & mask != 0
    }

    /// Terminal states admit no further transitions
    pub fn is_terminal(self) -> bool {
        matches!(self, LifecycleState::Done | LifecycleState::Error)
    }
}

/// Observer of a unit's lifecycle transitions.
///
/// `error` exists for symmetry with the observer contract but is never
/// invoked by a unit: unit-level failures are absorbed into
/// [`LifecycleState::Error`] rather than propagated as channel errors.
pub trait StatusObserver: Send + Sync {
    /// Called on every transition, in emission order
    fn next(&self, state: LifecycleState);

    /// Called at most once, when the unit reaches `Done`
    fn complete(&self) {}

    /// Never invoked by the unit; part of the contract for hosts that
    /// multiplex the same observer over other event sources
    fn error(&self, _err: &UnitError) {}
}

/// Handle returned by [`StatusChannel::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionHandle {
    id: u64,
}

impl SubscriptionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Multi-subscriber broadcast stream of lifecycle transitions.
///
/// Owned and mutated only by its unit; no external party may inject events.
/// Completion is signaled exactly once, when the unit reaches `Done`. A unit
/// that ends in `Error` leaves the channel open: subscribers remain attached
/// and observe nothing further (the failure path deliberately does not close
/// the channel).
pub struct StatusChannel {
    subscribers: RwLock<Vec<(u64, Arc<dyn StatusObserver>)>>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl StatusChannel {
    pub(crate) fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Register an observer for all subsequent transitions.
    ///
    /// Subscribing to an already-completed channel immediately delivers
    /// `complete()` and nothing else.
    pub fn subscribe(&self, observer: Arc<dyn StatusObserver>) -> SubscriptionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if self.closed.load(Ordering::Acquire) {
            observer.complete();
            return SubscriptionHandle { id };
        }
        let mut subs = self.subscribers.write().expect("subscriber list poisoned");
        subs.push((id, observer));
        SubscriptionHandle { id }
    }

    /// Detach a single observer. Returns false if the handle was unknown
    /// (already unsubscribed, subscribed after completion, or released by
    /// completion).
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        let mut subs = self.subscribers.write().expect("subscriber list poisoned");
        let before = subs.len();
        subs.retain(|(id, _)| *id != handle.id);
        subs.len() != before
    }

    /// Whether completion has been signaled
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn emit(&self, state: LifecycleState) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        let snapshot: Vec<Arc<dyn StatusObserver>> = {
            let subs = self.subscribers.read().expect("subscriber list poisoned");
            subs.iter().map(|(_, obs)| Arc::clone(obs)).collect()
        };
        for observer in snapshot {
            observer.next(state);
        }
    }

    pub(crate) fn complete(&self) {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        let released: Vec<(u64, Arc<dyn StatusObserver>)> = {
            let mut subs = self.subscribers.write().expect("subscriber list poisoned");
            std::mem::take(&mut *subs)
        };
        for (_, observer) in released {
            observer.complete();
        }
    }
}

impl Default for StatusChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StatusChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self
            .subscribers
            .read()
            .map(|subs| subs.len())
            .unwrap_or(0);
        f.debug_struct("StatusChannel")
            .field("subscribers", &count)
            .field("closed", &self.is_closed())
            .finish()
    }
}
