// SPDX-FileCopyrightText: The k2io authors
// SPDX-License-Identifier: MPL-2.0

//! Allen & Heath Xone:K2
//!
//! Controls are enumerated row by row, starting at the top of the device.
//! Buttons and LEDs are addressed by note numbers, all other controls by
//! control change numbers. The note names follow the notation of the
//! device documentation, e.g. `D#0` for the *Exit Setup* button.
//!
//! Each LED has 3 independent colors that are switched on and off by
//! sending note on/off messages for the corresponding note.

use strum::{EnumCount, EnumIter, EnumString, IntoStaticStr};

use crate::{midi::Channel, DeviceDescriptor};

pub mod controller;
pub use self::controller::{
    ConnectionError, ConnectionState, ControllerEvent, ControllerEventKind, XoneK2, XoneK2Config,
};

#[cfg(feature = "animation")]
pub mod animation;
#[cfg(feature = "animation")]
pub use self::animation::{play_startup_animation, STARTUP_ANIMATION_STEP};

#[cfg(test)]
mod tests;

pub const DEVICE_DESCRIPTOR: &DeviceDescriptor = &DeviceDescriptor {
    vendor_name: "Allen & Heath",
    product_name: "Xone:K2",
    port_name: "XONE:K2",
};

/// Factory default MIDI channel of the device.
pub const DEFAULT_CHANNEL: Channel = match Channel::new(15) {
    Some(channel) => channel,
    None => panic!("invalid channel"),
};

/// Velocity for switching on an LED.
pub const LED_ON_VELOCITY: u8 = 0x7f;

/// Velocity for switching off an LED.
pub const LED_OFF_VELOCITY: u8 = 0x00;

/// Control change value of a clockwise encoder step.
///
/// All other values are interpreted as a counter-clockwise step.
pub const ENCODER_CW_VALUE: u8 = 0x7f;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Button {
    pub name: &'static str,
    pub note_name: &'static str,
    pub midi_note: u8,
}

impl Button {
    const fn new(name: &'static str, note_name: &'static str, midi_note: u8) -> Self {
        Self {
            name,
            note_name,
            midi_note,
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    EnumString,
    IntoStaticStr,
    EnumIter,
    EnumCount,
)]
#[strum(serialize_all = "lowercase")]
pub enum Color {
    Red,
    Amber,
    Green,
}

/// An LED with the note names of its colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Led {
    pub name: &'static str,
    pub red: &'static str,
    pub amber: &'static str,
    pub green: &'static str,
}

impl Led {
    const fn new(
        name: &'static str,
        red: &'static str,
        amber: &'static str,
        green: &'static str,
    ) -> Self {
        Self {
            name,
            red,
            amber,
            green,
        }
    }

    #[must_use]
    pub const fn note_name(&self, color: Color) -> &'static str {
        match color {
            Color::Red => self.red,
            Color::Amber => self.amber,
            Color::Green => self.green,
        }
    }
}

/// A knob, fader, or encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CcControl {
    pub name: &'static str,
    pub cc: u8,
}

impl CcControl {
    const fn new(name: &'static str, cc: u8) -> Self {
        Self { name, cc }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum ControlCategory {
    Knob,
    Fader,
    Encoder,
}

/// A [`CcControl`] tagged with its category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Control {
    pub category: ControlCategory,
    pub name: &'static str,
    pub cc: u8,
}

pub const BUTTONS: &[Button] = &[
    Button::new("encoder-1", "E3", 52),
    Button::new("encoder-2", "F3", 53),
    Button::new("encoder-3", "F#3", 54),
    Button::new("encoder-4", "G3", 55),
    Button::new("button-1", "C3", 48),
    Button::new("button-2", "C#3", 49),
    Button::new("button-3", "D3", 50),
    Button::new("button-4", "D#3", 51),
    Button::new("button-5", "G#2", 44),
    Button::new("button-6", "A2", 45),
    Button::new("button-7", "A#2", 46),
    Button::new("button-8", "B2", 47),
    Button::new("button-9", "E2", 40),
    Button::new("button-10", "F2", 41),
    Button::new("button-11", "F#2", 42),
    Button::new("button-12", "G2", 43),
    Button::new("A", "C2", 36),
    Button::new("B", "C#2", 37),
    Button::new("C", "D2", 38),
    Button::new("D", "D#2", 39),
    Button::new("E", "G#1", 32),
    Button::new("F", "A1", 33),
    Button::new("G", "A#1", 34),
    Button::new("H", "B1", 35),
    Button::new("I", "E1", 28),
    Button::new("J", "F1", 29),
    Button::new("K", "F#1", 30),
    Button::new("L", "G1", 31),
    Button::new("M", "C1", 24),
    Button::new("N", "C#1", 25),
    Button::new("O", "D1", 26),
    Button::new("P", "D#1", 27),
    Button::new("layer", "C0", 12),
    Button::new("encoder-5", "C#0", 13),
    Button::new("encoder-6", "D0", 14),
    Button::new("exit-setup", "D#0", 15),
];

pub const LEDS: &[Led] = &[
    Led::new("encoder-1", "E3", "E6", "E9"),
    Led::new("encoder-2", "F3", "F6", "F9"),
    Led::new("encoder-3", "F#3", "F#6", "F#9"),
    Led::new("encoder-4", "G3", "G6", "G9"),
    Led::new("button-1", "C3", "C6", "C9"),
    Led::new("button-2", "C#3", "C#6", "C#9"),
    Led::new("button-3", "D3", "D6", "D9"),
    Led::new("button-4", "D#3", "D#6", "D#9"),
    Led::new("button-5", "G#2", "G#5", "G#8"),
    Led::new("button-6", "A2", "A5", "A8"),
    Led::new("button-7", "A#2", "A#5", "A#8"),
    Led::new("button-8", "B2", "B5", "B8"),
    Led::new("button-9", "E2", "E5", "E8"),
    Led::new("button-10", "F2", "F5", "F8"),
    Led::new("button-11", "F#2", "F#5", "F#8"),
    Led::new("button-12", "G2", "G5", "G8"),
    Led::new("A", "C2", "C5", "C8"),
    Led::new("B", "C#2", "C#5", "C#8"),
    Led::new("C", "D2", "D5", "D8"),
    Led::new("D", "D#2", "D#5", "D#8"),
    Led::new("E", "G#1", "G#4", "G#7"),
    Led::new("F", "A1", "A4", "A7"),
    Led::new("G", "A#1", "A#4", "A#7"),
    Led::new("H", "B1", "B4", "B7"),
    Led::new("I", "E1", "E4", "E7"),
    Led::new("J", "F1", "F4", "F7"),
    Led::new("K", "F#1", "F#4", "F#7"),
    Led::new("L", "G1", "G4", "G7"),
    Led::new("M", "C1", "C4", "C7"),
    Led::new("N", "C#1", "C#4", "C#7"),
    Led::new("O", "D1", "D4", "D7"),
    Led::new("P", "D#1", "D#4", "D#7"),
    Led::new("layer", "C0", "E0", "G#0"),
    Led::new("exit-setup", "D#0", "G0", "B0"),
];

pub const KNOBS: &[CcControl] = &[
    CcControl::new("knob-1", 4),
    CcControl::new("knob-2", 5),
    CcControl::new("knob-3", 6),
    CcControl::new("knob-4", 7),
    CcControl::new("knob-5", 8),
    CcControl::new("knob-6", 9),
    CcControl::new("knob-7", 10),
    CcControl::new("knob-8", 11),
    CcControl::new("knob-9", 12),
    CcControl::new("knob-10", 13),
    CcControl::new("knob-11", 14),
    CcControl::new("knob-12", 15),
];

pub const FADERS: &[CcControl] = &[
    CcControl::new("fader-1", 16),
    CcControl::new("fader-2", 17),
    CcControl::new("fader-3", 18),
    CcControl::new("fader-4", 19),
];

pub const ENCODERS: &[CcControl] = &[
    CcControl::new("encoder-1", 0),
    CcControl::new("encoder-2", 1),
    CcControl::new("encoder-3", 2),
    CcControl::new("encoder-4", 3),
    CcControl::new("encoder-5", 20),
    CcControl::new("encoder-6", 21),
];

#[must_use]
pub fn button_by_midi_note(midi_note: u8) -> Option<&'static Button> {
    BUTTONS.iter().find(|button| button.midi_note == midi_note)
}

#[must_use]
pub fn button_by_name(name: &str) -> Option<&'static Button> {
    BUTTONS.iter().find(|button| button.name == name)
}

#[must_use]
pub fn led_by_name(name: &str) -> Option<&'static Led> {
    LEDS.iter().find(|led| led.name == name)
}

/// Find a knob, fader, or encoder by its control change number.
#[must_use]
pub fn control_by_cc(cc: u8) -> Option<Control> {
    [
        (ControlCategory::Knob, KNOBS),
        (ControlCategory::Fader, FADERS),
        (ControlCategory::Encoder, ENCODERS),
    ]
    .into_iter()
    .find_map(|(category, controls)| {
        controls
            .iter()
            .find(|control| control.cc == cc)
            .map(|&CcControl { name, cc }| Control { category, name, cc })
    })
}
