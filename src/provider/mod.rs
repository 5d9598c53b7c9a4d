// SPDX-FileCopyrightText: The k2io authors
// SPDX-License-Identifier: MPL-2.0

//! Registry of channel-bound ports.
//!
//! Wraps the raw ports of a [`MidiHost`] into [`ChannelInput`]s and
//! [`ChannelOutput`]s on demand. At most one wrapper exists per
//! [`PortId`].

use std::{collections::HashMap, fmt, sync::Arc};

use parking_lot::Mutex;
use thiserror::Error;

use crate::{
    event::{Event, EventBus, SubscriptionId},
    midi::{
        AccessError, Channel, ChannelInput, ChannelOutput, ListenerToken, MidiAccess as _,
        MidiHost, PortDirection, PortStateChange,
    },
};


/// Identifies a port by its name and channel.
///
/// The display representation `"{name}-{channel}"` is used as the
/// composite key, e.g. `"XONE:K2-15"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
#[display("{name}-{channel}")]
pub struct PortId {
    pub name: String,
    pub channel: Channel,
}

impl PortId {
    #[must_use]
    pub fn new(name: impl Into<String>, channel: Channel) -> Self {
        Self {
            name: name.into(),
            channel,
        }
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error(transparent)]
    AccessDenied(#[from] AccessError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum ProviderEventKind {
    #[strum(serialize = "state.change")]
    StateChange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// A port of the host has been added or removed.
    StateChange(PortStateChange),
}

impl Event for ProviderEvent {
    type Kind = ProviderEventKind;

    fn kind(&self) -> ProviderEventKind {
        match self {
            Self::StateChange(_) => ProviderEventKind::StateChange,
        }
    }
}

#[derive(Debug, Default)]
struct Registry {
    inputs: Mutex<HashMap<PortId, Arc<ChannelInput>>>,
    outputs: Mutex<HashMap<PortId, Arc<ChannelOutput>>>,
    events: EventBus<ProviderEvent>,
}

impl Registry {
    fn clear(&self) {
        let inputs = std::mem::take(&mut *self.inputs.lock());
        let outputs = std::mem::take(&mut *self.outputs.lock());
        if !inputs.is_empty() || !outputs.is_empty() {
            log::debug!(
                "Discarding {input_count} cached input and {output_count} cached output port(s)",
                input_count = inputs.len(),
                output_count = outputs.len()
            );
        }
    }

    fn handle_state_change(&self, change: &PortStateChange) {
        let PortStateChange { name, direction, .. } = change;
        // Wrappers of both removed and re-added ports are stale
        let evicted = match direction {
            PortDirection::Input => {
                let mut inputs = self.inputs.lock();
                let count = inputs.len();
                inputs.retain(|id, _| id.name != *name);
                count - inputs.len()
            }
            PortDirection::Output => {
                let mut outputs = self.outputs.lock();
                let count = outputs.len();
                outputs.retain(|id, _| id.name != *name);
                count - outputs.len()
            }
        };
        if evicted > 0 {
            log::debug!("Evicted {evicted} cached {direction} port(s) \"{name}\"");
        }
        self.events.publish(&ProviderEvent::StateChange(change.clone()));
    }
}

struct Connection<A> {
    access: Arc<A>,
    state_change_listener: ListenerToken,
}

/// Provides channel-bound ports of a [`MidiHost`].
pub struct MidiProvider<H: MidiHost> {
    host: H,
    connect_lock: futures_util::lock::Mutex<()>,
    connection: Mutex<Option<Connection<H::Access>>>,
    registry: Arc<Registry>,
}

impl<H: MidiHost + fmt::Debug> fmt::Debug for MidiProvider<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MidiProvider")
            .field("host", &self.host)
            .field("connected", &self.is_connected())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl<H: MidiHost> MidiProvider<H> {
    #[must_use]
    pub fn new(host: H) -> Self {
        Self {
            host,
            connect_lock: Default::default(),
            connection: Mutex::new(None),
            registry: Default::default(),
        }
    }

    #[must_use]
    pub const fn host(&self) -> &H {
        &self.host
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.lock().is_some()
    }

    /// The granted access handle, if connected.
    #[must_use]
    pub fn access(&self) -> Option<Arc<H::Access>> {
        self.connection
            .lock()
            .as_ref()
            .map(|connection| Arc::clone(&connection.access))
    }

    /// Request access to the host.
    ///
    /// Does nothing if already connected. Concurrent invocations
    /// request access only once.
    pub async fn connect(&self) -> Result<(), ProviderError> {
        let _connecting = self.connect_lock.lock().await;
        if self.is_connected() {
            log::debug!("Already connected to MIDI host");
            return Ok(());
        }
        let access = match self.host.request_access().await {
            Ok(access) => access,
            Err(err) => {
                log::warn!("Failed to access MIDI host: {err}");
                return Err(err.into());
            }
        };
        // Ports might have been removed while not listening
        self.registry.clear();
        let state_change_listener = access.add_state_change_listener(Box::new({
            let registry = Arc::clone(&self.registry);
            move |change| registry.handle_state_change(change)
        }));
        *self.connection.lock() = Some(Connection {
            access: Arc::new(access),
            state_change_listener,
        });
        log::info!("Connected to MIDI host");
        Ok(())
    }

    /// Stop listening for hot-plug notifications of the host.
    ///
    /// Discards all cached ports. Ports that have already been handed
    /// out remain usable.
    pub fn disconnect(&self) {
        let Some(connection) = self.connection.lock().take() else {
            return;
        };
        if !connection
            .access
            .remove_state_change_listener(connection.state_change_listener)
        {
            log::debug!("State change listener already removed");
        }
        self.registry.clear();
        log::info!("Disconnected from MIDI host");
    }

    /// Get or create the input port with the given identifier.
    ///
    /// Returns `None` if not connected or if the host has no input
    /// port with this name.
    #[must_use]
    pub fn get_input(&self, id: &PortId) -> Option<Arc<ChannelInput>> {
        let access = self.access()?;
        if let Some(input) = self.registry.inputs.lock().get(id) {
            log::debug!("Reusing input port {id}");
            return Some(Arc::clone(input));
        }
        let Some(raw_port) = access.input_port(&id.name) else {
            log::debug!("Input port \"{name}\" not found", name = id.name);
            return None;
        };
        let input = match ChannelInput::new(id.name.clone(), id.channel, raw_port) {
            Ok(input) => input,
            Err(err) => {
                log::warn!("Failed to attach input port {id}: {err}");
                return None;
            }
        };
        log::debug!("Created input port {id}");
        let mut inputs = self.registry.inputs.lock();
        let input = inputs.entry(id.clone()).or_insert_with(|| Arc::new(input));
        Some(Arc::clone(input))
    }

    /// Get or create the output port with the given identifier.
    ///
    /// Returns `None` if not connected or if the host has no output
    /// port with this name.
    #[must_use]
    pub fn get_output(&self, id: &PortId) -> Option<Arc<ChannelOutput>> {
        let access = self.access()?;
        if let Some(output) = self.registry.outputs.lock().get(id) {
            log::debug!("Reusing output port {id}");
            return Some(Arc::clone(output));
        }
        let Some(raw_port) = access.output_port(&id.name) else {
            log::debug!("Output port \"{name}\" not found", name = id.name);
            return None;
        };
        let output = ChannelOutput::new(id.name.clone(), id.channel, raw_port);
        log::debug!("Created output port {id}");
        let mut outputs = self.registry.outputs.lock();
        let output = outputs.entry(id.clone()).or_insert_with(|| Arc::new(output));
        Some(Arc::clone(output))
    }

    /// Subscribe to provider events.
    pub fn on(
        &self,
        kind: ProviderEventKind,
        handler: impl Fn(&ProviderEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.registry.events.subscribe(kind, handler)
    }

    pub fn off(&self, id: SubscriptionId) -> bool {
        self.registry.events.unsubscribe(id)
    }
}

impl<H: MidiHost> Drop for MidiProvider<H> {
    fn drop(&mut self) {
        self.disconnect();
    }
}
