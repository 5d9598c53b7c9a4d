// SPDX-FileCopyrightText: The k2io authors
// SPDX-License-Identifier: MPL-2.0

//! Host MIDI ports driven by [`midir`].

use std::{future::Future, sync::Arc};

use midir::{
    ConnectError, Ignore, InitError, MidiInput, MidiInputConnection, MidiOutput,
    MidiOutputConnection, SendError,
};
use parking_lot::Mutex;

use super::{
    listeners::ListenerList, AccessError, ListenerToken, MessageListener, MidiAccess, MidiHost,
    PortConnectionState, PortDirection, PortError, PortStateChange, RawInputPort, RawOutputPort,
    StateChangeListener,
};
use crate::{OutputError, OutputResult};

const DEFAULT_CLIENT_NAME: &str = "k2io";

impl From<SendError> for OutputError {
    fn from(err: SendError) -> Self {
        OutputError::Send {
            msg: err.to_string().into(),
        }
    }
}

impl From<InitError> for PortError {
    fn from(err: InitError) -> Self {
        PortError::Connect {
            msg: err.to_string().into(),
        }
    }
}

impl From<ConnectError<MidiInput>> for PortError {
    fn from(err: ConnectError<MidiInput>) -> Self {
        PortError::Connect {
            msg: err.to_string().into(),
        }
    }
}

impl From<InitError> for AccessError {
    fn from(err: InitError) -> Self {
        AccessError::Init {
            msg: err.to_string().into(),
        }
    }
}

type InputListeners = Arc<ListenerList<MessageListener>>;

// Adapter for the midir callback closure
fn handle_input(micros: u64, input: &[u8], listeners: &mut InputListeners) {
    log::trace!("Received MIDI input @ {micros}: {input:02x?}");
    listeners.dispatch(|listener| listener(input));
}

/// Input port that is connected on demand, i.e. while at least
/// one listener is registered.
#[allow(missing_debug_implementations)]
pub struct MidirInputPort {
    client_name: String,
    name: String,
    port: midir::MidiInputPort,
    listeners: InputListeners,
    connection: Mutex<Option<MidiInputConnection<InputListeners>>>,
}

impl MidirInputPort {
    fn new(client_name: String, name: String, port: midir::MidiInputPort) -> Self {
        Self {
            client_name,
            name,
            port,
            listeners: Default::default(),
            connection: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.lock().is_some()
    }

    fn connect(&self) -> Result<MidiInputConnection<InputListeners>, PortError> {
        let mut input = MidiInput::new(&self.client_name)?;
        input.ignore(Ignore::None);
        log::debug!("Connecting input port \"{name}\"", name = self.name);
        input
            .connect(
                &self.port,
                &self.name,
                handle_input,
                Arc::clone(&self.listeners),
            )
            .map_err(Into::into)
    }
}

impl RawInputPort for MidirInputPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_message_listener(&self, listener: MessageListener) -> Result<ListenerToken, PortError> {
        let token = self.listeners.add(listener);
        let mut connection = self.connection.lock();
        if connection.is_none() {
            match self.connect() {
                Ok(connected) => {
                    *connection = Some(connected);
                }
                Err(err) => {
                    self.listeners.remove(token);
                    return Err(err);
                }
            }
        }
        Ok(token)
    }

    fn remove_message_listener(&self, token: ListenerToken) -> bool {
        if !self.listeners.remove(token) {
            return false;
        }
        if self.listeners.is_empty() {
            let connection = self.connection.lock().take();
            if let Some(connection) = connection {
                log::debug!("Disconnecting input port \"{name}\"", name = self.name);
                drop(connection);
            }
        }
        true
    }
}

/// Output port that is connected lazily when sending the first message.
#[allow(missing_debug_implementations)]
pub struct MidirOutputPort {
    client_name: String,
    name: String,
    port: midir::MidiOutputPort,
    connection: Mutex<Option<MidiOutputConnection>>,
}

impl MidirOutputPort {
    fn new(client_name: String, name: String, port: midir::MidiOutputPort) -> Self {
        Self {
            client_name,
            name,
            port,
            connection: Mutex::new(None),
        }
    }

    fn connect(&self) -> OutputResult<MidiOutputConnection> {
        let output = MidiOutput::new(&self.client_name).map_err(|err| OutputError::Send {
            msg: err.to_string().into(),
        })?;
        log::debug!("Connecting output port \"{name}\"", name = self.name);
        output
            .connect(&self.port, &self.name)
            .map_err(|err| OutputError::Send {
                msg: err.to_string().into(),
            })
    }
}

impl RawOutputPort for MidirOutputPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, message: &[u8]) -> OutputResult<()> {
        let mut connection = self.connection.lock();
        if connection.is_none() {
            *connection = Some(self.connect()?);
        }
        let Some(connection) = connection.as_mut() else {
            return Err(OutputError::Disconnected);
        };
        connection.send(message).map_err(Into::into)
    }
}

/// Host backed by the platform's native MIDI API.
#[derive(Debug, Clone)]
pub struct MidirHost {
    client_name: String,
}

impl Default for MidirHost {
    fn default() -> Self {
        Self::new(DEFAULT_CLIENT_NAME)
    }
}

impl MidirHost {
    #[must_use]
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
        }
    }
}

impl MidiHost for MidirHost {
    type Access = MidirAccess;

    fn request_access(&self) -> impl Future<Output = Result<Self::Access, AccessError>> + Send {
        let client_name = self.client_name.clone();
        async move { MidirAccess::new(client_name) }
    }
}

#[derive(Default)]
struct KnownPorts {
    inputs: Vec<Arc<MidirInputPort>>,
    outputs: Vec<Arc<MidirOutputPort>>,
    // Port names that have already been announced to state change listeners
    announced_inputs: Vec<String>,
    announced_outputs: Vec<String>,
}

/// Enumerates the ports of the host.
///
/// The host does not notify about hot-plug events. Instead
/// [`MidirAccess::refresh_ports()`] must be invoked periodically
/// for detecting added and removed ports.
#[allow(missing_debug_implementations)]
pub struct MidirAccess {
    client_name: String,
    input: Mutex<MidiInput>,
    output: Mutex<MidiOutput>,
    known_ports: Mutex<KnownPorts>,
    state_change_listeners: ListenerList<StateChangeListener>,
}

fn announce_changes(
    direction: PortDirection,
    announced: &mut Vec<String>,
    current: &[String],
    changes: &mut Vec<PortStateChange>,
) {
    announced.retain(|name| {
        if current.contains(name) {
            return true;
        }
        changes.push(PortStateChange {
            name: name.clone(),
            direction,
            state: PortConnectionState::Disconnected,
        });
        false
    });
    for name in current {
        if announced.contains(name) {
            continue;
        }
        announced.push(name.clone());
        changes.push(PortStateChange {
            name: name.clone(),
            direction,
            state: PortConnectionState::Connected,
        });
    }
}

impl MidirAccess {
    fn new(client_name: String) -> Result<Self, AccessError> {
        let mut input = MidiInput::new(&format!("{client_name} input port watcher"))?;
        input.ignore(Ignore::None);
        let output = MidiOutput::new(&format!("{client_name} output port watcher"))?;
        let access = Self {
            client_name,
            input: Mutex::new(input),
            output: Mutex::new(output),
            known_ports: Default::default(),
            state_change_listeners: Default::default(),
        };
        // Ports that are available initially are not announced
        let inputs = access.scan_input_ports();
        let outputs = access.scan_output_ports();
        {
            let mut known_ports = access.known_ports.lock();
            known_ports.announced_inputs = inputs.iter().map(|port| port.name.clone()).collect();
            known_ports.announced_outputs = outputs.iter().map(|port| port.name.clone()).collect();
        }
        Ok(access)
    }

    fn scan_input_ports(&self) -> Vec<Arc<MidirInputPort>> {
        let scanned = {
            let input = self.input.lock();
            input
                .ports()
                .into_iter()
                .filter_map(|port| {
                    let name = input.port_name(&port).ok()?;
                    Some((name, port))
                })
                .collect::<Vec<_>>()
        };
        let mut known_ports = self.known_ports.lock();
        let ports = scanned
            .into_iter()
            .map(|(name, port)| {
                known_ports
                    .inputs
                    .iter()
                    .find(|known| known.name == name)
                    .map_or_else(
                        || {
                            log::debug!("Detected input port \"{name}\"");
                            Arc::new(MidirInputPort::new(self.client_name.clone(), name, port))
                        },
                        Arc::clone,
                    )
            })
            .collect::<Vec<_>>();
        known_ports.inputs.clone_from(&ports);
        ports
    }

    fn scan_output_ports(&self) -> Vec<Arc<MidirOutputPort>> {
        let scanned = {
            let output = self.output.lock();
            output
                .ports()
                .into_iter()
                .filter_map(|port| {
                    let name = output.port_name(&port).ok()?;
                    Some((name, port))
                })
                .collect::<Vec<_>>()
        };
        let mut known_ports = self.known_ports.lock();
        let ports = scanned
            .into_iter()
            .map(|(name, port)| {
                known_ports
                    .outputs
                    .iter()
                    .find(|known| known.name == name)
                    .map_or_else(
                        || {
                            log::debug!("Detected output port \"{name}\"");
                            Arc::new(MidirOutputPort::new(self.client_name.clone(), name, port))
                        },
                        Arc::clone,
                    )
            })
            .collect::<Vec<_>>();
        known_ports.outputs.clone_from(&ports);
        ports
    }

    /// Detect added and removed ports and notify all state change listeners.
    ///
    /// Returns the detected changes.
    pub fn refresh_ports(&self) -> Vec<PortStateChange> {
        let input_names = self
            .scan_input_ports()
            .iter()
            .map(|port| port.name.clone())
            .collect::<Vec<_>>();
        let output_names = self
            .scan_output_ports()
            .iter()
            .map(|port| port.name.clone())
            .collect::<Vec<_>>();
        let mut changes = Vec::new();
        {
            let mut known_ports = self.known_ports.lock();
            announce_changes(
                PortDirection::Input,
                &mut known_ports.announced_inputs,
                &input_names,
                &mut changes,
            );
            announce_changes(
                PortDirection::Output,
                &mut known_ports.announced_outputs,
                &output_names,
                &mut changes,
            );
        }
        for change in &changes {
            log::info!(
                "MIDI {direction} port \"{name}\" {state}",
                direction = change.direction,
                name = change.name,
                state = change.state
            );
            self.state_change_listeners
                .dispatch(|listener| listener(change));
        }
        changes
    }
}

impl MidiAccess for MidirAccess {
    fn input_ports(&self) -> Vec<Arc<dyn RawInputPort>> {
        self.scan_input_ports()
            .into_iter()
            .map(|port| port as Arc<dyn RawInputPort>)
            .collect()
    }

    fn output_ports(&self) -> Vec<Arc<dyn RawOutputPort>> {
        self.scan_output_ports()
            .into_iter()
            .map(|port| port as Arc<dyn RawOutputPort>)
            .collect()
    }

    fn add_state_change_listener(&self, listener: StateChangeListener) -> ListenerToken {
        self.state_change_listeners.add(listener)
    }

    fn remove_state_change_listener(&self, token: ListenerToken) -> bool {
        self.state_change_listeners.remove(token)
    }
}
