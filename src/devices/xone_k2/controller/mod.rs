// SPDX-FileCopyrightText: The k2io authors
// SPDX-License-Identifier: MPL-2.0

//! Connection handling, input translation, and LED feedback.

use std::{collections::HashMap, fmt, sync::Arc};

use parking_lot::Mutex;
use strum::{EnumCount, EnumIter, IntoStaticStr};
use thiserror::Error;

use super::{
    button_by_midi_note, button_by_name, control_by_cc, led_by_name, Button, Color, Control,
    ControlCategory, Led, DEFAULT_CHANNEL, DEVICE_DESCRIPTOR, ENCODER_CW_VALUE, LEDS,
    LED_OFF_VELOCITY, LED_ON_VELOCITY,
};
use crate::{
    event::{Event, EventBus, SubscriptionId},
    midi::{
        Channel, ChannelInput, ChannelOutput, ControlChangeData, MidiEvent, MidiEventKind,
        MidiHost, NoteData,
    },
    provider::{MidiProvider, PortId, ProviderError},
};

#[cfg(test)]
mod tests;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XoneK2Config {
    /// Name of both the input and the output port.
    pub port_name: String,
    pub channel: Channel,
}

impl Default for XoneK2Config {
    fn default() -> Self {
        Self {
            port_name: DEVICE_DESCRIPTOR.port_name.to_owned(),
            channel: DEFAULT_CHANNEL,
        }
    }
}

impl XoneK2Config {
    #[must_use]
    pub fn port_id(&self) -> PortId {
        PortId::new(self.port_name.clone(), self.channel)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error(transparent)]
    Access(#[from] ProviderError),
    #[error("neither input nor output port \"{port_name}\" found")]
    PortsNotFound { port_name: String },
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, IntoStaticStr, EnumIter, EnumCount,
)]
pub enum ControllerEventKind {
    #[strum(serialize = "connect")]
    Connect,
    #[strum(serialize = "connection.error")]
    ConnectionError,
    #[strum(serialize = "button.press")]
    ButtonPress,
    #[strum(serialize = "button.release")]
    ButtonRelease,
    #[strum(serialize = "encoder.turn")]
    EncoderTurn,
    #[strum(serialize = "fader.change")]
    FaderChange,
    #[strum(serialize = "knob.change")]
    KnobChange,
}

#[derive(Debug, Clone)]
pub enum ControllerEvent {
    Connect,
    ConnectionError(Arc<ConnectionError>),
    ButtonPress(Button),
    ButtonRelease(Button),
    /// A single encoder step, either `1` (clockwise) or `-1`
    /// (counter-clockwise).
    EncoderTurn {
        name: &'static str,
        value: i8,
    },
    /// Normalized position within `0.0..=1.0`.
    FaderChange {
        name: &'static str,
        value: f64,
    },
    /// Normalized position within `0.0..=1.0`.
    KnobChange {
        name: &'static str,
        value: f64,
    },
}

impl Event for ControllerEvent {
    type Kind = ControllerEventKind;

    fn kind(&self) -> ControllerEventKind {
        match self {
            Self::Connect => ControllerEventKind::Connect,
            Self::ConnectionError(_) => ControllerEventKind::ConnectionError,
            Self::ButtonPress(_) => ControllerEventKind::ButtonPress,
            Self::ButtonRelease(_) => ControllerEventKind::ButtonRelease,
            Self::EncoderTurn { .. } => ControllerEventKind::EncoderTurn,
            Self::FaderChange { .. } => ControllerEventKind::FaderChange,
            Self::KnobChange { .. } => ControllerEventKind::KnobChange,
        }
    }
}

fn normalize_cc_value(value: u8) -> f64 {
    f64::from(value) / 127.0
}

/// Map a MIDI event of the device onto a controller event.
///
/// The velocity of note on messages is ignored. Buttons are released
/// by note off messages exclusively.
#[must_use]
pub fn translate_midi_event(event: &MidiEvent) -> Option<ControllerEvent> {
    match *event {
        MidiEvent::NoteOn(NoteData { note, .. }) => {
            let Some(button) = button_by_midi_note(note) else {
                log::debug!("Unmapped note on: {note}");
                return None;
            };
            Some(ControllerEvent::ButtonPress(*button))
        }
        MidiEvent::NoteOff(NoteData { note, .. }) => {
            let Some(button) = button_by_midi_note(note) else {
                log::debug!("Unmapped note off: {note}");
                return None;
            };
            Some(ControllerEvent::ButtonRelease(*button))
        }
        MidiEvent::ControlChange(ControlChangeData { cc, value }) => {
            let Some(Control { category, name, .. }) = control_by_cc(cc) else {
                log::debug!("Unmapped control change: {cc} = {value}");
                return None;
            };
            let event = match category {
                ControlCategory::Encoder => ControllerEvent::EncoderTurn {
                    name,
                    value: if value == ENCODER_CW_VALUE { 1 } else { -1 },
                },
                ControlCategory::Fader => ControllerEvent::FaderChange {
                    name,
                    value: normalize_cc_value(value),
                },
                ControlCategory::Knob => ControllerEvent::KnobChange {
                    name,
                    value: normalize_cc_value(value),
                },
            };
            Some(event)
        }
        MidiEvent::ProgramChange(_) => None,
    }
}

#[derive(Default)]
struct Ports {
    input: Option<Arc<ChannelInput>>,
    input_subscriptions: Vec<SubscriptionId>,
    output: Option<Arc<ChannelOutput>>,
}

impl Ports {
    fn detach(self) {
        let Self {
            input,
            input_subscriptions,
            ..
        } = self;
        let Some(input) = input else {
            return;
        };
        for id in input_subscriptions {
            input.off(id);
        }
    }
}

/// Allen & Heath Xone:K2 controller.
///
/// Connects to the input and output port of the configured name on
/// the configured channel. LED operations require the output port,
/// events require the input port.
pub struct XoneK2<H: MidiHost> {
    config: XoneK2Config,
    provider: Arc<MidiProvider<H>>,
    state: Mutex<ConnectionState>,
    ports: Mutex<Ports>,
    highlighted_leds: Mutex<HashMap<&'static str, Color>>,
    events: Arc<EventBus<ControllerEvent>>,
    #[cfg(feature = "observables")]
    observable_state: discro::Publisher<ConnectionState>,
}

impl<H: MidiHost> fmt::Debug for XoneK2<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XoneK2")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("highlighted_leds", &self.highlighted_leds())
            .finish_non_exhaustive()
    }
}

impl<H: MidiHost> XoneK2<H> {
    #[must_use]
    pub fn new(config: XoneK2Config, provider: Arc<MidiProvider<H>>) -> Self {
        Self {
            config,
            provider,
            state: Mutex::new(ConnectionState::Disconnected),
            ports: Default::default(),
            highlighted_leds: Default::default(),
            events: Default::default(),
            #[cfg(feature = "observables")]
            observable_state: discro::Publisher::new(ConnectionState::Disconnected),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &XoneK2Config {
        &self.config
    }

    #[must_use]
    pub const fn provider(&self) -> &Arc<MidiProvider<H>> {
        &self.provider
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Observe the connection state.
    #[cfg(feature = "observables")]
    #[must_use]
    pub fn subscribe_state(&self) -> discro::Subscriber<ConnectionState> {
        self.observable_state.subscribe()
    }

    fn transition(&self, state: &mut ConnectionState, next: ConnectionState) {
        log::debug!("Connection state: {state} -> {next}");
        *state = next;
        #[cfg(feature = "observables")]
        self.observable_state.write(next);
    }

    /// Connect to the device.
    ///
    /// Completes after the outcome has been published, either as
    /// [`ControllerEvent::Connect`] or as [`ControllerEvent::ConnectionError`].
    /// Does nothing while connecting or connected.
    pub async fn connect(&self) {
        {
            let mut state = self.state.lock();
            match *state {
                ConnectionState::Connecting | ConnectionState::Connected => {
                    log::debug!("Ignoring connect request while {state}", state = *state);
                    return;
                }
                ConnectionState::Disconnected | ConnectionState::Error => {
                    self.transition(&mut state, ConnectionState::Connecting);
                }
            }
        }
        if let Err(err) = self.provider.connect().await {
            self.fail(err.into());
            return;
        }
        let port_id = self.config.port_id();
        let input = self.provider.get_input(&port_id);
        let output = self.provider.get_output(&port_id);
        if input.is_none() && output.is_none() {
            self.fail(ConnectionError::PortsNotFound {
                port_name: self.config.port_name.clone(),
            });
            return;
        }
        {
            let mut state = self.state.lock();
            if *state != ConnectionState::Connecting {
                log::info!("Connecting to {port_id} has been aborted");
                return;
            }
            let input_subscriptions = if let Some(input) = &input {
                self.attach_input(input)
            } else {
                log::warn!("Input port {port_id} not found");
                Vec::new()
            };
            if output.is_none() {
                log::warn!("Output port {port_id} not found");
            }
            *self.ports.lock() = Ports {
                input,
                input_subscriptions,
                output,
            };
            self.transition(&mut state, ConnectionState::Connected);
        }
        log::info!("Connected to {port_id}");
        self.events.publish(&ControllerEvent::Connect);
    }

    fn fail(&self, err: ConnectionError) {
        {
            let mut state = self.state.lock();
            if *state != ConnectionState::Connecting {
                return;
            }
            self.transition(&mut state, ConnectionState::Error);
        }
        log::warn!("Failed to connect: {err}");
        self.events
            .publish(&ControllerEvent::ConnectionError(Arc::new(err)));
    }

    fn attach_input(&self, input: &ChannelInput) -> Vec<SubscriptionId> {
        [
            MidiEventKind::NoteOn,
            MidiEventKind::NoteOff,
            MidiEventKind::ControlChange,
        ]
        .into_iter()
        .map(|kind| {
            let events = Arc::clone(&self.events);
            input.on(kind, move |event| {
                if let Some(event) = translate_midi_event(event) {
                    events.publish(&event);
                }
            })
        })
        .collect()
    }

    /// Switch off all LEDs and detach from the ports.
    pub fn disconnect(&self) {
        let mut state = self.state.lock();
        if *state == ConnectionState::Disconnected {
            return;
        }
        self.unhighlight_all_leds();
        let ports = std::mem::take(&mut *self.ports.lock());
        ports.detach();
        self.transition(&mut state, ConnectionState::Disconnected);
        log::info!("Disconnected from {port_id}", port_id = self.config.port_id());
    }

    /// Subscribe to controller events.
    pub fn on(
        &self,
        kind: ControllerEventKind,
        handler: impl Fn(&ControllerEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.events.subscribe(kind, handler)
    }

    pub fn off(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    fn output(&self) -> Option<Arc<ChannelOutput>> {
        self.ports.lock().output.clone()
    }

    fn send_led_note_off(output: &ChannelOutput, led: &Led, color: Color) {
        let note_name = led.note_name(color);
        if let Err(err) = output.send_note_off(note_name, LED_OFF_VELOCITY) {
            log::warn!(
                "Failed to switch off {color} LED \"{name}\": {err}",
                name = led.name
            );
        }
    }

    /// Switch on an LED in the given color.
    ///
    /// A different color that is currently switched on is switched
    /// off before.
    pub fn highlight_led(&self, name: &str, color: Color) {
        let Some(led) = led_by_name(name) else {
            log::warn!("LED \"{name}\" not found");
            return;
        };
        let Some(output) = self.output() else {
            log::warn!("Cannot highlight LED \"{name}\" without output port");
            return;
        };
        let previous_color = self.highlighted_leds.lock().insert(led.name, color);
        if let Some(previous_color) = previous_color.filter(|previous| *previous != color) {
            Self::send_led_note_off(&output, led, previous_color);
        }
        if let Err(err) = output.send_note_on(led.note_name(color), LED_ON_VELOCITY) {
            log::warn!("Failed to highlight LED \"{name}\" in {color}: {err}");
        }
    }

    /// Switch off an LED in the color it has been highlighted with.
    pub fn unhighlight_led(&self, name: &str) {
        let Some(led) = led_by_name(name) else {
            log::warn!("LED \"{name}\" not found");
            return;
        };
        let Some(color) = self.highlighted_leds.lock().remove(led.name) else {
            log::warn!("LED \"{name}\" is not highlighted");
            return;
        };
        let Some(output) = self.output() else {
            log::warn!("Cannot unhighlight LED \"{name}\" without output port");
            return;
        };
        Self::send_led_note_off(&output, led, color);
    }

    /// Switch off all highlighted LEDs.
    pub fn unhighlight_all_leds(&self) {
        let highlighted_leds = std::mem::take(&mut *self.highlighted_leds.lock());
        if highlighted_leds.is_empty() {
            return;
        }
        let Some(output) = self.output() else {
            log::warn!("Cannot unhighlight LEDs without output port");
            return;
        };
        for led in LEDS {
            if let Some(color) = highlighted_leds.get(led.name) {
                Self::send_led_note_off(&output, led, *color);
            }
        }
    }

    /// Highlight the LED of a button.
    pub fn highlight_button(&self, name: &str, color: Color) {
        if button_by_name(name).is_none() {
            log::warn!("Button \"{name}\" not found");
            return;
        }
        self.highlight_led(name, color);
    }

    /// Unhighlight the LED of a button.
    pub fn unhighlight_button(&self, name: &str) {
        if button_by_name(name).is_none() {
            log::warn!("Button \"{name}\" not found");
            return;
        }
        self.unhighlight_led(name);
    }

    /// The color of a highlighted LED.
    #[must_use]
    pub fn led_color(&self, name: &str) -> Option<Color> {
        self.highlighted_leds.lock().get(name).copied()
    }

    /// All highlighted LEDs and their colors, in table order.
    #[must_use]
    pub fn highlighted_leds(&self) -> Vec<(&'static str, Color)> {
        let highlighted_leds = self.highlighted_leds.lock();
        LEDS.iter()
            .filter_map(|led| {
                highlighted_leds
                    .get(led.name)
                    .map(|color| (led.name, *color))
            })
            .collect()
    }
}

impl<H: MidiHost> Drop for XoneK2<H> {
    fn drop(&mut self) {
        std::mem::take(&mut *self.ports.lock()).detach();
    }
}
