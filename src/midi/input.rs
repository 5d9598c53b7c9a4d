// SPDX-FileCopyrightText: The k2io authors
// SPDX-License-Identifier: MPL-2.0

use std::{fmt, sync::Arc};

use strum::IntoEnumIterator as _;

use super::{
    decode_midi_message, Channel, ListenerToken, MidiEvent, MidiEventKind, PortError, RawInputPort,
};
use crate::event::{EventBus, SubscriptionId};

/// Input port bound to a single MIDI channel.
///
/// Decodes all incoming messages of the underlying port and publishes
/// those that have been sent on the bound channel. Messages on other
/// channels, even if they share the same port, are never visible to
/// subscribers.
pub struct ChannelInput {
    name: String,
    channel: Channel,
    raw_port: Arc<dyn RawInputPort>,
    listener: ListenerToken,
    events: Arc<EventBus<MidiEvent>>,
}

impl fmt::Debug for ChannelInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelInput")
            .field("name", &self.name)
            .field("channel", &self.channel)
            .field("listener", &self.listener)
            .finish_non_exhaustive()
    }
}

// Adapter for the raw message listener
fn handle_message(name: &str, channel: Channel, events: &EventBus<MidiEvent>, message: &[u8]) {
    log::trace!("Received MIDI input on \"{name}\": {message:02x?}");
    let Some(decoded) = decode_midi_message(message) else {
        log::trace!("Ignoring unsupported MIDI input on \"{name}\": {message:02x?}");
        return;
    };
    if decoded.channel != channel {
        return;
    }
    events.publish(&decoded.event);
}

impl ChannelInput {
    /// Attach to a raw input port.
    ///
    /// Registers exactly one listener on the raw port that is removed
    /// again when dropped.
    pub fn new(
        name: impl Into<String>,
        channel: Channel,
        raw_port: Arc<dyn RawInputPort>,
    ) -> Result<Self, PortError> {
        let name = name.into();
        let events = Arc::new(EventBus::new());
        let listener = raw_port.add_message_listener(Box::new({
            let name = name.clone();
            let events = Arc::clone(&events);
            move |message| handle_message(&name, channel, &events, message)
        }))?;
        log::debug!("Attached input \"{name}\" on channel {channel}");
        Ok(Self {
            name,
            channel,
            raw_port,
            listener,
            events,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn channel(&self) -> Channel {
        self.channel
    }

    /// Subscribe to all events of the given kind.
    pub fn on(
        &self,
        kind: MidiEventKind,
        handler: impl Fn(&MidiEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.events.subscribe(kind, handler)
    }

    /// Unsubscribe a handler.
    ///
    /// Returns `false` if the handler is not subscribed.
    pub fn off(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Number of handlers for all kinds of events.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        MidiEventKind::iter()
            .map(|kind| self.events.subscriber_count(kind))
            .sum()
    }
}

impl Drop for ChannelInput {
    fn drop(&mut self) {
        if !self.raw_port.remove_message_listener(self.listener) {
            log::debug!("Listener of input \"{name}\" already removed", name = self.name);
        }
    }
}
