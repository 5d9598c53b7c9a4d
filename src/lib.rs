// SPDX-FileCopyrightText: The k2io authors
// SPDX-License-Identifier: MPL-2.0

#![allow(rustdoc::invalid_rust_codeblocks)]
#![doc = include_str!("../README.md")]
#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![warn(missing_debug_implementations)]
#![warn(unreachable_pub)]
#![warn(unsafe_code)]
#![warn(clippy::pedantic)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(rustdoc::broken_intra_doc_links)]
// Repetitions of module/type names occur frequently when using many
// modules for keeping the size of the source files handy. Often
// types have the same name as their parent module.
#![allow(clippy::module_name_repetitions)]
// Repeating the type name in `..Default::default()` expressions
// is not needed since the context is obvious.
#![allow(clippy::default_trait_access)]

pub mod devices;
pub use self::devices::DeviceDescriptor;

pub mod event;
pub use self::event::{Event, EventBus, SubscriptionId};

pub mod midi;
pub use self::midi::{
    decode_midi_message, encode_midi_message, Channel, ChannelInput, ChannelOutput, MidiEvent,
    MidiEventKind, MidiHost, VirtualHost,
};

#[cfg(feature = "midir")]
pub use self::midi::midir::{MidirAccess, MidirHost};

pub mod note;
pub use self::note::{note_name_to_number, NoteNameError, NoteRef};

mod output;
pub use self::output::{Error as OutputError, Result as OutputResult};

pub mod provider;
pub use self::provider::{MidiProvider, PortId, ProviderError, ProviderEvent, ProviderEventKind};
