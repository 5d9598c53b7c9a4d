// SPDX-FileCopyrightText: The k2io authors
// SPDX-License-Identifier: MPL-2.0

//! Note names like `C4`, `F#3`, or `Eb-1`.
//!
//! The octave numbering follows the convention where MIDI note 60
//! is `C4` and MIDI note 0 is `C-1`.

use std::borrow::Cow;

use derive_more::From;
use thiserror::Error;


/// Largest note number that fits into a MIDI data byte.
pub const MAX_NOTE_NUMBER: u8 = 0x7f;

const SEMITONES_PER_OCTAVE: i32 = 12;

// Only the combinations listed here are valid, i.e. `E#`, `Fb`,
// `B#`, and `Cb` are rejected.
const NOTE_OFFSETS: &[(&str, i32)] = &[
    ("C", 0),
    ("C#", 1),
    ("Db", 1),
    ("D", 2),
    ("D#", 3),
    ("Eb", 3),
    ("E", 4),
    ("F", 5),
    ("F#", 6),
    ("Gb", 6),
    ("G", 7),
    ("G#", 8),
    ("Ab", 8),
    ("A", 9),
    ("A#", 10),
    ("Bb", 10),
    ("B", 11),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NoteNameError {
    #[error("invalid note format: \"{0}\"")]
    InvalidFormat(String),
    #[error("unknown note: \"{0}\"")]
    UnknownNote(String),
    #[error("note \"{name}\" is out of the MIDI range: {number}")]
    OutOfRange { name: String, number: i32 },
}

struct ParsedNoteName {
    pitch_class: String,
    octave: i32,
}

// Accepts `^[A-Ga-g](#|b)?-?[0-9]$`
fn parse_note_name(name: &str) -> Option<ParsedNoteName> {
    let mut chars = name.chars().peekable();
    let base = chars.next().filter(|c| matches!(c, 'A'..='G' | 'a'..='g'))?;
    let accidental = chars.next_if(|c| matches!(c, '#' | 'b'));
    let negative = chars.next_if_eq(&'-').is_some();
    let digit = chars.next()?.to_digit(10)?;
    if chars.next().is_some() {
        return None;
    }
    let mut pitch_class = base.to_ascii_uppercase().to_string();
    pitch_class.extend(accidental);
    // Single digit, cannot overflow
    #[allow(clippy::cast_possible_wrap)]
    let octave = if negative {
        -(digit as i32)
    } else {
        digit as i32
    };
    Some(ParsedNoteName {
        pitch_class,
        octave,
    })
}

/// Convert a note name into a MIDI note number.
pub fn note_name_to_number(name: &str) -> Result<u8, NoteNameError> {
    let Some(ParsedNoteName {
        pitch_class,
        octave,
    }) = parse_note_name(name)
    else {
        return Err(NoteNameError::InvalidFormat(name.to_owned()));
    };
    let Some(offset) = NOTE_OFFSETS
        .iter()
        .find_map(|(candidate, offset)| (*candidate == pitch_class).then_some(*offset))
    else {
        return Err(NoteNameError::UnknownNote(pitch_class));
    };
    let number = (octave + 1) * SEMITONES_PER_OCTAVE + offset;
    u8::try_from(number)
        .ok()
        .filter(|number| *number <= MAX_NOTE_NUMBER)
        .ok_or_else(|| NoteNameError::OutOfRange {
            name: name.to_owned(),
            number,
        })
}

/// A note, given either by number or by name.
#[derive(Debug, Clone, PartialEq, Eq, From)]
pub enum NoteRef {
    Number(u8),
    Name(Cow<'static, str>),
}

impl From<&'static str> for NoteRef {
    fn from(from: &'static str) -> Self {
        Self::Name(Cow::Borrowed(from))
    }
}

impl From<String> for NoteRef {
    fn from(from: String) -> Self {
        Self::Name(Cow::Owned(from))
    }
}

impl NoteRef {
    /// Resolve the MIDI note number.
    ///
    /// Numbers above [`MAX_NOTE_NUMBER`] are rejected.
    pub fn to_number(&self) -> Result<u8, NoteNameError> {
        match self {
            Self::Number(number) if *number > MAX_NOTE_NUMBER => Err(NoteNameError::OutOfRange {
                name: number.to_string(),
                number: i32::from(*number),
            }),
            Self::Number(number) => Ok(*number),
            Self::Name(name) => note_name_to_number(name),
        }
    }
}
