// SPDX-FileCopyrightText: The k2io authors
// SPDX-License-Identifier: MPL-2.0

//! Capabilities of the host platform that provides the actual MIDI ports.
//!
//! The host is injected explicitly wherever it is needed, i.e. there
//! is no global MIDI access.

use std::{
    borrow::Cow,
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use thiserror::Error;

use crate::OutputResult;

/// Callback for raw MIDI messages.
pub type MessageListener = Box<dyn FnMut(&[u8]) + Send + 'static>;

/// Callback for hot-plug notifications.
pub type StateChangeListener = Box<dyn FnMut(&PortStateChange) + Send + 'static>;

#[derive(Debug, Error)]
pub enum PortError {
    #[error("disconnected")]
    Disconnected,
    #[error("connect: {msg}")]
    Connect { msg: Cow<'static, str> },
}

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("MIDI access denied: {reason}")]
    Denied { reason: Cow<'static, str> },
    #[error("MIDI initialization failed: {msg}")]
    Init { msg: Cow<'static, str> },
}

/// Identifies a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
#[repr(transparent)]
pub struct ListenerToken(u64);

impl ListenerToken {
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// Thread-safe generator of unique [`ListenerToken`]s.
#[derive(Debug, Default)]
pub struct ListenerTokenGenerator {
    next: AtomicU64,
}

impl ListenerTokenGenerator {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn next(&self) -> ListenerToken {
        ListenerToken(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum PortDirection {
    #[display("input")]
    Input,
    #[display("output")]
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum PortConnectionState {
    #[display("connected")]
    Connected,
    #[display("disconnected")]
    Disconnected,
}

/// A port has been added to or removed from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortStateChange {
    pub name: String,
    pub direction: PortDirection,
    pub state: PortConnectionState,
}

pub trait RawInputPort: Send + Sync {
    fn name(&self) -> &str;

    /// Register a listener that receives every incoming message.
    fn add_message_listener(&self, listener: MessageListener) -> Result<ListenerToken, PortError>;

    /// Returns `false` if the listener is unknown.
    fn remove_message_listener(&self, token: ListenerToken) -> bool;
}

pub trait RawOutputPort: Send + Sync {
    fn name(&self) -> &str;

    /// Transmit a message.
    ///
    /// Fire-and-forget, there is no acknowledgement from the receiver.
    fn send(&self, message: &[u8]) -> OutputResult<()>;
}

/// Granted access to the enumerated ports of the host.
pub trait MidiAccess: Send + Sync {
    /// Currently available input ports.
    fn input_ports(&self) -> Vec<Arc<dyn RawInputPort>>;

    /// Currently available output ports.
    fn output_ports(&self) -> Vec<Arc<dyn RawOutputPort>>;

    fn add_state_change_listener(&self, listener: StateChangeListener) -> ListenerToken;

    /// Returns `false` if the listener is unknown.
    fn remove_state_change_listener(&self, token: ListenerToken) -> bool;

    /// Find an input port by its exact name.
    fn input_port(&self, name: &str) -> Option<Arc<dyn RawInputPort>> {
        self.input_ports().into_iter().find(|port| port.name() == name)
    }

    /// Find an output port by its exact name.
    fn output_port(&self, name: &str) -> Option<Arc<dyn RawOutputPort>> {
        self.output_ports()
            .into_iter()
            .find(|port| port.name() == name)
    }
}

pub trait MidiHost: Send + Sync {
    type Access: MidiAccess + 'static;

    /// Request access to the MIDI ports of the host.
    ///
    /// Might suspend, e.g. while waiting for a permission to be granted.
    fn request_access(&self) -> impl Future<Output = Result<Self::Access, AccessError>> + Send;
}
