//! Latest-value observation primitives.
//!
//! # Responsibility
//! - Hold the most recent committed value of some state.
//! - Fan each published value out to every live subscriber.
//!
//! # Invariants
//! - A new subscriber receives the latest value before any later publish.
//! - Subscribers observe values in publish order.
//! - Projected subscriptions never deliver two equal values in a row.
//! - Dropping a `Subscription` only detaches that subscriber.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

type Listener<T> = Box<dyn FnMut(&T) -> bool + Send>;

struct ObservableState<T> {
    latest: T,
    listeners: Vec<Listener<T>>,
}

/// Shared cell that remembers its latest value and notifies subscribers.
pub struct Observable<T> {
    state: Mutex<ObservableState<T>>,
}

impl<T: Clone + Send + 'static> Observable<T> {
    pub fn new(initial: T) -> Self {
        Self {
            state: Mutex::new(ObservableState {
                latest: initial,
                listeners: Vec::new(),
            }),
        }
    }

    /// Returns a clone of the latest published value.
    pub fn get(&self) -> T {
        self.lock().latest.clone()
    }

    /// Stores `value` as latest and delivers it to every live subscriber.
    ///
    /// Subscribers whose receiving side was dropped are pruned here.
    pub fn publish(&self, value: T) {
        let mut state = self.lock();
        state.listeners.retain_mut(|listener| listener(&value));
        state.latest = value;
    }

    /// Subscribes to every published value, starting with the latest one.
    pub fn subscribe(&self) -> Subscription<T> {
        let (sender, receiver) = mpsc::channel();
        let mut state = self.lock();
        // Receiver is alive right here, so the initial send cannot fail.
        let _ = sender.send(state.latest.clone());
        state
            .listeners
            .push(Box::new(move |value: &T| sender.send(value.clone()).is_ok()));
        Subscription { receiver }
    }

    /// Subscribes to a projection of the published values.
    ///
    /// The projection of the latest value is delivered immediately; later
    /// values are delivered only when their projection differs from the last
    /// one delivered.
    pub fn subscribe_map<U, F>(&self, project: F) -> Subscription<U>
    where
        U: Clone + PartialEq + Send + 'static,
        F: Fn(&T) -> U + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let mut state = self.lock();
        let mut last = project(&state.latest);
        let _ = sender.send(last.clone());
        state.listeners.push(Box::new(move |value: &T| {
            let next = project(value);
            if next == last {
                return true;
            }
            last = next.clone();
            sender.send(next).is_ok()
        }));
        Subscription { receiver }
    }

    /// Number of subscribers still attached as of the last publish.
    pub fn subscriber_count(&self) -> usize {
        self.lock().listeners.len()
    }

    fn lock(&self) -> MutexGuard<'_, ObservableState<T>> {
        // A panicking listener must not wedge every later publish.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Receiving end of an `Observable` subscription.
pub struct Subscription<T> {
    receiver: Receiver<T>,
}

impl<T> Subscription<T> {
    /// Blocks until the next value; `None` once the source is gone.
    pub fn recv(&self) -> Option<T> {
        self.receiver.recv().ok()
    }

    /// Waits up to `timeout` for the next value.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        match self.receiver.recv_timeout(timeout) {
            Ok(value) => Some(value),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Returns the next pending value without blocking.
    pub fn try_recv(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    /// Consumes every pending value and returns only the newest one.
    pub fn drain_latest(&self) -> Option<T> {
        let mut newest = None;
        while let Ok(value) = self.receiver.try_recv() {
            newest = Some(value);
        }
        newest
    }
}
