// SPDX-FileCopyrightText: The k2io authors
// SPDX-License-Identifier: MPL-2.0

//! Typed publish/subscribe.
//!
//! Events are enums whose variants carry the typed payload. Handlers
//! subscribe to a single kind, i.e. the discriminant of the event enum,
//! and only ever see events of that kind.

use std::{
    fmt,
    hash::Hash,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;


/// An event that can be published on an [`EventBus`].
pub trait Event {
    type Kind: Copy + Eq + Hash + fmt::Debug;

    #[must_use]
    fn kind(&self) -> Self::Kind;
}

/// Token returned when subscribing.
///
/// Opaque and unique per bus for its entire lifetime, i.e. never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
#[repr(transparent)]
pub struct SubscriptionId(u64);

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync + 'static>;

struct Subscription<E: Event> {
    id: SubscriptionId,
    kind: E::Kind,
    handler: Handler<E>,
}

/// Synchronous event dispatcher.
///
/// Handlers are invoked in subscription order on the publishing thread.
/// No lock is held while a handler runs, i.e. handlers may subscribe,
/// unsubscribe, or publish themselves.
pub struct EventBus<E: Event> {
    next_id: AtomicU64,
    subscriptions: Mutex<Vec<Subscription<E>>>,
}

impl<E: Event> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            subscriptions: Mutex::new(Vec::new()),
        }
    }
}

impl<E: Event> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.subscriptions.lock().len())
            .finish_non_exhaustive()
    }
}

impl<E: Event> EventBus<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &self,
        kind: E::Kind,
        handler: impl Fn(&E) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscriptions.lock().push(Subscription {
            id,
            kind,
            handler: Arc::new(handler),
        });
        id
    }

    /// Remove a subscription.
    ///
    /// Returns `false` if the subscription is unknown, e.g. if it
    /// has already been removed. This is not an error.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.subscriptions.lock();
        let Some(index) = subscriptions
            .iter()
            .position(|subscription| subscription.id == id)
        else {
            return false;
        };
        subscriptions.remove(index);
        true
    }

    /// Dispatch an event to all handlers of its kind.
    ///
    /// Returns the number of handlers that have been invoked. Events
    /// without subscribers are lost.
    pub fn publish(&self, event: &E) -> usize {
        let kind = event.kind();
        let handlers = self
            .subscriptions
            .lock()
            .iter()
            .filter(|subscription| subscription.kind == kind)
            .map(|subscription| Arc::clone(&subscription.handler))
            .collect::<Vec<_>>();
        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    #[must_use]
    pub fn subscriber_count(&self, kind: E::Kind) -> usize {
        self.subscriptions
            .lock()
            .iter()
            .filter(|subscription| subscription.kind == kind)
            .count()
    }
}
