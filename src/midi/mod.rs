// SPDX-FileCopyrightText: The k2io authors
// SPDX-License-Identifier: MPL-2.0

//! MIDI 1.0 channel messages and channel-bound ports.

use strum::{EnumCount, EnumIter, EnumString, IntoStaticStr};

use crate::event::Event;

pub mod host;
pub use self::host::{
    AccessError, ListenerToken, ListenerTokenGenerator, MessageListener, MidiAccess, MidiHost,
    PortConnectionState, PortDirection, PortError, PortStateChange, RawInputPort, RawOutputPort,
    StateChangeListener,
};

mod listeners;

pub mod input;
pub use self::input::ChannelInput;

pub mod output;
pub use self::output::ChannelOutput;

pub mod virtual_host;
pub use self::virtual_host::{VirtualAccess, VirtualHost, VirtualInputPort, VirtualOutputPort};

#[cfg(feature = "midir")]
pub mod midir;


pub const MIDI_STATUS_TYPE_MASK: u8 = 0xf0;
pub const MIDI_STATUS_CHANNEL_MASK: u8 = 0x0f;

pub const MIDI_STATUS_NOTE_OFF: u8 = 0x80;
pub const MIDI_STATUS_NOTE_ON: u8 = 0x90;
pub const MIDI_STATUS_CONTROL_CHANGE: u8 = 0xb0;
pub const MIDI_STATUS_PROGRAM_CHANGE: u8 = 0xc0;

const MIDI_DATA_MASK: u8 = 0x7f;

/// Logical, 1-based MIDI channel.
///
/// The wire format encodes the channel 0-based in the lower nibble
/// of the status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
#[repr(transparent)]
pub struct Channel(u8);

impl Channel {
    pub const MIN: Self = Self(1);
    pub const MAX: Self = Self(16);

    /// Returns `None` if the number is not within 1..=16.
    #[must_use]
    pub const fn new(number: u8) -> Option<Self> {
        if number < Self::MIN.0 || number > Self::MAX.0 {
            return None;
        }
        Some(Self(number))
    }

    #[must_use]
    pub const fn from_status(status: u8) -> Self {
        Self((status & MIDI_STATUS_CHANNEL_MASK) + 1)
    }

    #[must_use]
    pub const fn number(self) -> u8 {
        self.0
    }

    /// The 0-based channel as encoded in the status byte.
    #[must_use]
    pub const fn status_nibble(self) -> u8 {
        self.0 - 1
    }

    #[must_use]
    pub const fn status(self, message_type: u8) -> u8 {
        (message_type & MIDI_STATUS_TYPE_MASK) | self.status_nibble()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid MIDI channel {0}")]
pub struct InvalidChannel(pub u8);

impl TryFrom<u8> for Channel {
    type Error = InvalidChannel;

    fn try_from(from: u8) -> Result<Self, Self::Error> {
        Self::new(from).ok_or(InvalidChannel(from))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoteData {
    pub note: u8,
    pub velocity: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlChangeData {
    pub cc: u8,
    pub value: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramChangeData {
    pub program: u8,
}

/// The names are stable and could be used for
/// parsing or displaying event types.
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
pub enum MidiEventKind {
    #[strum(serialize = "note.on")]
    NoteOn,
    #[strum(serialize = "note.off")]
    NoteOff,
    #[strum(serialize = "control.change")]
    ControlChange,
    #[strum(serialize = "program.change")]
    ProgramChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MidiEvent {
    NoteOn(NoteData),
    NoteOff(NoteData),
    ControlChange(ControlChangeData),
    ProgramChange(ProgramChangeData),
}

impl Event for MidiEvent {
    type Kind = MidiEventKind;

    fn kind(&self) -> MidiEventKind {
        match self {
            Self::NoteOn(_) => MidiEventKind::NoteOn,
            Self::NoteOff(_) => MidiEventKind::NoteOff,
            Self::ControlChange(_) => MidiEventKind::ControlChange,
            Self::ProgramChange(_) => MidiEventKind::ProgramChange,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecodedMessage {
    pub channel: Channel,
    pub event: MidiEvent,
}

/// Decode a raw MIDI message.
///
/// Returns `None` for all messages that are not supported, e.g. system
/// messages, pitch bend, or aftertouch. Truncated messages are not
/// supported either. Trailing bytes are ignored. Data bytes with the
/// most significant bit set are rejected.
#[must_use]
pub fn decode_midi_message(message: &[u8]) -> Option<DecodedMessage> {
    let (&status, data) = message.split_first()?;
    let data_len = if status & MIDI_STATUS_TYPE_MASK == MIDI_STATUS_PROGRAM_CHANGE {
        1
    } else {
        2
    };
    if data
        .iter()
        .take(data_len)
        .any(|&byte| byte & !MIDI_DATA_MASK != 0)
    {
        return None;
    }
    let event = match (status & MIDI_STATUS_TYPE_MASK, data) {
        (MIDI_STATUS_NOTE_ON, &[note, velocity, ..]) => MidiEvent::NoteOn(NoteData { note, velocity }),
        (MIDI_STATUS_NOTE_OFF, &[note, velocity, ..]) => {
            MidiEvent::NoteOff(NoteData { note, velocity })
        }
        (MIDI_STATUS_CONTROL_CHANGE, &[cc, value, ..]) => {
            MidiEvent::ControlChange(ControlChangeData { cc, value })
        }
        (MIDI_STATUS_PROGRAM_CHANGE, &[program, ..]) => {
            MidiEvent::ProgramChange(ProgramChangeData { program })
        }
        _ => return None,
    };
    let channel = Channel::from_status(status);
    Some(DecodedMessage { channel, event })
}

/// An encoded MIDI channel message with 2 or 3 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedMessage {
    bytes: [u8; 3],
    len: usize,
}

impl EncodedMessage {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

impl AsRef<[u8]> for EncodedMessage {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// Encode an event for the given channel.
///
/// Data bytes are truncated to 7 bits.
#[must_use]
pub const fn encode_midi_message(channel: Channel, event: &MidiEvent) -> EncodedMessage {
    let (message_type, data1, data2, len) = match *event {
        MidiEvent::NoteOn(NoteData { note, velocity }) => (MIDI_STATUS_NOTE_ON, note, velocity, 3),
        MidiEvent::NoteOff(NoteData { note, velocity }) => {
            (MIDI_STATUS_NOTE_OFF, note, velocity, 3)
        }
        MidiEvent::ControlChange(ControlChangeData { cc, value }) => {
            (MIDI_STATUS_CONTROL_CHANGE, cc, value, 3)
        }
        MidiEvent::ProgramChange(ProgramChangeData { program }) => {
            (MIDI_STATUS_PROGRAM_CHANGE, program, 0, 2)
        }
    };
    EncodedMessage {
        bytes: [
            channel.status(message_type),
            data1 & MIDI_DATA_MASK,
            data2 & MIDI_DATA_MASK,
        ],
        len,
    }
}
