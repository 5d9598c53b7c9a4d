// SPDX-FileCopyrightText: The k2io authors
// SPDX-License-Identifier: MPL-2.0

//! In-process MIDI host without any hardware.
//!
//! Useful for testing and for simulating devices: incoming messages
//! are injected into input ports and outgoing messages are recorded.

use std::{
    borrow::Cow,
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    task::{Context, Poll},
};

use parking_lot::Mutex;

use super::{
    listeners::ListenerList, AccessError, ListenerToken, MessageListener, MidiAccess, MidiHost,
    PortConnectionState, PortDirection, PortError, PortStateChange, RawInputPort, RawOutputPort,
    StateChangeListener,
};
use crate::{OutputError, OutputResult};

#[derive(Debug)]
pub struct VirtualInputPort {
    name: String,
    listeners: ListenerList<MessageListener>,
}

impl VirtualInputPort {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            listeners: Default::default(),
        }
    }

    /// Inject an incoming message.
    pub fn receive(&self, message: &[u8]) {
        self.listeners.dispatch(|listener| listener(message));
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl RawInputPort for VirtualInputPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_message_listener(&self, listener: MessageListener) -> Result<ListenerToken, PortError> {
        Ok(self.listeners.add(listener))
    }

    fn remove_message_listener(&self, token: ListenerToken) -> bool {
        self.listeners.remove(token)
    }
}

#[derive(Debug)]
pub struct VirtualOutputPort {
    name: String,
    connected: Mutex<bool>,
    sent: Mutex<Vec<Vec<u8>>>,
}

impl VirtualOutputPort {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            connected: Mutex::new(true),
            sent: Default::default(),
        }
    }

    /// All messages that have been sent so far.
    #[must_use]
    pub fn sent_messages(&self) -> Vec<Vec<u8>> {
        self.sent.lock().clone()
    }

    /// Drain the recorded messages.
    pub fn take_sent_messages(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.sent.lock())
    }

    fn set_connected(&self, connected: bool) {
        *self.connected.lock() = connected;
    }
}

impl RawOutputPort for VirtualOutputPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, message: &[u8]) -> OutputResult<()> {
        if !*self.connected.lock() {
            return Err(OutputError::Disconnected);
        }
        self.sent.lock().push(message.to_vec());
        Ok(())
    }
}

#[derive(Debug, Default)]
struct HostState {
    denied: Option<Cow<'static, str>>,
    inputs: Vec<Arc<VirtualInputPort>>,
    outputs: Vec<Arc<VirtualOutputPort>>,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<HostState>,
    access_requests: AtomicUsize,
    state_change_listeners: ListenerList<StateChangeListener>,
}

impl Shared {
    fn notify(&self, name: &str, direction: PortDirection, state: PortConnectionState) {
        let change = PortStateChange {
            name: name.to_owned(),
            direction,
            state,
        };
        log::debug!("Virtual {direction} port \"{name}\" {state}");
        self.state_change_listeners
            .dispatch(|listener| listener(&change));
    }
}

/// Virtual MIDI host.
///
/// Cheap to clone, all clones share the same ports.
#[derive(Debug, Clone, Default)]
pub struct VirtualHost {
    shared: Arc<Shared>,
}

impl VirtualHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an input port and notify all listeners.
    pub fn add_input(&self, name: impl Into<String>) -> Arc<VirtualInputPort> {
        let port = Arc::new(VirtualInputPort::new(name));
        self.shared.state.lock().inputs.push(Arc::clone(&port));
        self.shared
            .notify(&port.name, PortDirection::Input, PortConnectionState::Connected);
        port
    }

    /// Add an output port and notify all listeners.
    pub fn add_output(&self, name: impl Into<String>) -> Arc<VirtualOutputPort> {
        let port = Arc::new(VirtualOutputPort::new(name));
        self.shared.state.lock().outputs.push(Arc::clone(&port));
        self.shared
            .notify(&port.name, PortDirection::Output, PortConnectionState::Connected);
        port
    }

    /// Add both an input and an output port with the same name.
    pub fn add_device(
        &self,
        name: impl Into<String>,
    ) -> (Arc<VirtualInputPort>, Arc<VirtualOutputPort>) {
        let name = name.into();
        (self.add_input(name.clone()), self.add_output(name))
    }

    /// Remove all input ports with the given name.
    ///
    /// Returns `false` if no port has been removed.
    pub fn remove_input(&self, name: &str) -> bool {
        let removed = {
            let mut state = self.shared.state.lock();
            let len = state.inputs.len();
            state.inputs.retain(|port| port.name != name);
            len != state.inputs.len()
        };
        if removed {
            self.shared
                .notify(name, PortDirection::Input, PortConnectionState::Disconnected);
        }
        removed
    }

    /// Remove all output ports with the given name.
    ///
    /// Removed ports refuse to send.
    pub fn remove_output(&self, name: &str) -> bool {
        let removed = {
            let mut state = self.shared.state.lock();
            let (removed, retained) = std::mem::take(&mut state.outputs)
                .into_iter()
                .partition::<Vec<_>, _>(|port| port.name == name);
            state.outputs = retained;
            removed
        };
        for port in &removed {
            port.set_connected(false);
        }
        if removed.is_empty() {
            return false;
        }
        self.shared
            .notify(name, PortDirection::Output, PortConnectionState::Disconnected);
        true
    }

    /// Remove both the input and the output ports with the given name.
    pub fn remove_device(&self, name: &str) -> bool {
        let input_removed = self.remove_input(name);
        let output_removed = self.remove_output(name);
        input_removed || output_removed
    }

    /// Let all subsequent access requests fail.
    pub fn deny_access(&self, reason: impl Into<Cow<'static, str>>) {
        self.shared.state.lock().denied = Some(reason.into());
    }

    pub fn grant_access(&self) {
        self.shared.state.lock().denied = None;
    }

    /// Number of access requests, including denied requests.
    #[must_use]
    pub fn access_request_count(&self) -> usize {
        self.shared.access_requests.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn state_change_listener_count(&self) -> usize {
        self.shared.state_change_listeners.len()
    }
}

/// Suspends exactly once, like awaiting a permission prompt.
#[derive(Debug, Default)]
struct YieldOnce {
    yielded: bool,
}

impl Future for YieldOnce {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

impl MidiHost for VirtualHost {
    type Access = VirtualAccess;

    fn request_access(&self) -> impl Future<Output = Result<Self::Access, AccessError>> + Send {
        let shared = Arc::clone(&self.shared);
        async move {
            shared.access_requests.fetch_add(1, Ordering::AcqRel);
            YieldOnce::default().await;
            if let Some(reason) = shared.state.lock().denied.clone() {
                return Err(AccessError::Denied { reason });
            }
            Ok(VirtualAccess { shared })
        }
    }
}

/// Access handle of a [`VirtualHost`].
#[derive(Debug, Clone)]
pub struct VirtualAccess {
    shared: Arc<Shared>,
}

impl MidiAccess for VirtualAccess {
    fn input_ports(&self) -> Vec<Arc<dyn RawInputPort>> {
        self.shared
            .state
            .lock()
            .inputs
            .iter()
            .map(|port| Arc::clone(port) as Arc<dyn RawInputPort>)
            .collect()
    }

    fn output_ports(&self) -> Vec<Arc<dyn RawOutputPort>> {
        self.shared
            .state
            .lock()
            .outputs
            .iter()
            .map(|port| Arc::clone(port) as Arc<dyn RawOutputPort>)
            .collect()
    }

    fn add_state_change_listener(&self, listener: StateChangeListener) -> ListenerToken {
        self.shared.state_change_listeners.add(listener)
    }

    fn remove_state_change_listener(&self, token: ListenerToken) -> bool {
        self.shared.state_change_listeners.remove(token)
    }
}
