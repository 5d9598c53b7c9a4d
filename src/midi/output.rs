// SPDX-FileCopyrightText: The k2io authors
// SPDX-License-Identifier: MPL-2.0

use std::{fmt, sync::Arc};

use super::{
    encode_midi_message, Channel, ControlChangeData, MidiEvent, NoteData, ProgramChangeData,
    RawOutputPort,
};
use crate::{NoteRef, OutputResult};

/// Output port bound to a single MIDI channel.
pub struct ChannelOutput {
    name: String,
    channel: Channel,
    raw_port: Arc<dyn RawOutputPort>,
}

impl fmt::Debug for ChannelOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelOutput")
            .field("name", &self.name)
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

impl ChannelOutput {
    #[must_use]
    pub fn new(name: impl Into<String>, channel: Channel, raw_port: Arc<dyn RawOutputPort>) -> Self {
        Self {
            name: name.into(),
            channel,
            raw_port,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn channel(&self) -> Channel {
        self.channel
    }

    pub fn send(&self, event: &MidiEvent) -> OutputResult<()> {
        let message = encode_midi_message(self.channel, event);
        log::trace!(
            "Sending MIDI output on \"{name}\": {bytes:02x?}",
            name = self.name,
            bytes = message.as_bytes()
        );
        self.raw_port.send(message.as_bytes())
    }

    /// Send a note-on message.
    ///
    /// Notes could either be given by number or by name, e.g. `"C4"`.
    pub fn send_note_on(&self, note: impl Into<NoteRef>, velocity: u8) -> OutputResult<()> {
        let note = note.into().to_number()?;
        self.send(&MidiEvent::NoteOn(NoteData { note, velocity }))
    }

    /// Send a note-off message.
    ///
    /// Notes could either be given by number or by name, e.g. `"C4"`.
    pub fn send_note_off(&self, note: impl Into<NoteRef>, velocity: u8) -> OutputResult<()> {
        let note = note.into().to_number()?;
        self.send(&MidiEvent::NoteOff(NoteData { note, velocity }))
    }

    pub fn send_control_change(&self, cc: u8, value: u8) -> OutputResult<()> {
        self.send(&MidiEvent::ControlChange(ControlChangeData { cc, value }))
    }

    pub fn send_program_change(&self, program: u8) -> OutputResult<()> {
        self.send(&MidiEvent::ProgramChange(ProgramChangeData { program }))
    }
}
