// SPDX-FileCopyrightText: The k2io authors
// SPDX-License-Identifier: MPL-2.0

use std::fmt;

use parking_lot::{Mutex, ReentrantMutex};

use super::{ListenerToken, ListenerTokenGenerator};

struct State<L> {
    listeners: Vec<(ListenerToken, L)>,
    // Tokens of listeners that are currently being invoked
    dispatching: Vec<ListenerToken>,
    // Tokens removed while being invoked
    removed: Vec<ListenerToken>,
}

/// Registry of listeners for host implementations.
///
/// Listeners are invoked without holding the lock, i.e. they may add
/// or remove listeners themselves. A nested dispatch from within a
/// listener does not reach the listeners that are currently invoked.
///
/// Dispatches from different threads are serialized.
pub(crate) struct ListenerList<L> {
    tokens: ListenerTokenGenerator,
    // Reentrant for nested dispatches on the same thread
    dispatch_lock: ReentrantMutex<()>,
    state: Mutex<State<L>>,
}

impl<L> Default for ListenerList<L> {
    fn default() -> Self {
        Self {
            tokens: ListenerTokenGenerator::new(),
            dispatch_lock: ReentrantMutex::new(()),
            state: Mutex::new(State {
                listeners: Vec::new(),
                dispatching: Vec::new(),
                removed: Vec::new(),
            }),
        }
    }
}

impl<L> fmt::Debug for ListenerList<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerList")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl<L> ListenerList<L> {
    pub(crate) fn add(&self, listener: L) -> ListenerToken {
        let token = self.tokens.next();
        self.state.lock().listeners.push((token, listener));
        token
    }

    pub(crate) fn remove(&self, token: ListenerToken) -> bool {
        let mut state = self.state.lock();
        if let Some(index) = state.listeners.iter().position(|(t, _)| *t == token) {
            state.listeners.remove(index);
            return true;
        }
        if state.dispatching.contains(&token) && !state.removed.contains(&token) {
            state.removed.push(token);
            return true;
        }
        false
    }

    pub(crate) fn len(&self) -> usize {
        let state = self.state.lock();
        state.listeners.len() + state.dispatching.len() - state.removed.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn dispatch(&self, mut invoke: impl FnMut(&mut L)) {
        let _dispatching = self.dispatch_lock.lock();
        let (mut taken, tokens) = {
            let mut state = self.state.lock();
            let taken = std::mem::take(&mut state.listeners);
            let tokens = taken.iter().map(|(token, _)| *token).collect::<Vec<_>>();
            state.dispatching.extend_from_slice(&tokens);
            (taken, tokens)
        };
        for (_, listener) in &mut taken {
            invoke(listener);
        }
        let mut state = self.state.lock();
        let State {
            listeners,
            dispatching,
            removed,
        } = &mut *state;
        taken.retain(|(token, _)| !removed.contains(token));
        dispatching.retain(|token| !tokens.contains(token));
        removed.retain(|token| !tokens.contains(token));
        // Keep the registration order
        taken.append(listeners);
        *listeners = taken;
    }
}
