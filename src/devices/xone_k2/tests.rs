// SPDX-FileCopyrightText: The k2io authors
// SPDX-License-Identifier: MPL-2.0

use std::{collections::HashSet, str::FromStr as _};

use strum::IntoEnumIterator as _;

use super::*;
use crate::note_name_to_number;

#[test]
fn table_sizes() {
    assert_eq!(36, BUTTONS.len());
    assert_eq!(34, LEDS.len());
    assert_eq!(12, KNOBS.len());
    assert_eq!(4, FADERS.len());
    assert_eq!(6, ENCODERS.len());
}

#[test]
fn unique_names() {
    for names in [
        BUTTONS.iter().map(|button| button.name).collect::<Vec<_>>(),
        LEDS.iter().map(|led| led.name).collect(),
        KNOBS
            .iter()
            .chain(FADERS)
            .chain(ENCODERS)
            .map(|control| control.name)
            .collect(),
    ] {
        assert_eq!(names.len(), names.iter().collect::<HashSet<_>>().len());
    }
}

#[test]
fn unique_midi_notes() {
    let midi_notes = BUTTONS
        .iter()
        .map(|button| button.midi_note)
        .collect::<HashSet<_>>();
    assert_eq!(BUTTONS.len(), midi_notes.len());
}

#[test]
fn unique_cc_numbers_across_all_categories() {
    let cc_numbers = KNOBS
        .iter()
        .chain(FADERS)
        .chain(ENCODERS)
        .map(|control| control.cc)
        .collect::<HashSet<_>>();
    assert_eq!(KNOBS.len() + FADERS.len() + ENCODERS.len(), cc_numbers.len());
}

#[test]
fn button_note_names_match_midi_notes() {
    for button in BUTTONS {
        assert_eq!(
            Ok(button.midi_note),
            note_name_to_number(button.note_name),
            "{button:?}"
        );
    }
}

#[test]
fn led_colors_have_distinct_valid_notes() {
    let mut all_notes = HashSet::new();
    for led in LEDS {
        for color in Color::iter() {
            let note = note_name_to_number(led.note_name(color)).unwrap();
            assert!(all_notes.insert(note), "{led:?} {color}");
        }
    }
}

#[test]
fn every_led_belongs_to_a_button() {
    for led in LEDS {
        let button = button_by_name(led.name).unwrap();
        // The red color shares the note of the button
        assert_eq!(button.note_name, led.red);
    }
}

#[test]
fn exit_setup_button() {
    let button = button_by_midi_note(15).unwrap();
    assert_eq!("exit-setup", button.name);
    assert_eq!("D#0", button.note_name);
    assert_eq!(Some(button), button_by_name("exit-setup"));
}

#[test]
fn unknown_buttons() {
    assert!(button_by_midi_note(0).is_none());
    assert!(button_by_midi_note(127).is_none());
    assert!(button_by_name("button-13").is_none());
}

#[test]
fn exit_setup_led() {
    let led = led_by_name("exit-setup").unwrap();
    assert_eq!("D#0", led.note_name(Color::Red));
    assert_eq!("G0", led.note_name(Color::Amber));
    assert_eq!("B0", led.note_name(Color::Green));
}

#[test]
fn encoder_push_buttons_of_the_bottom_row_have_no_led() {
    assert!(button_by_name("encoder-5").is_some());
    assert!(led_by_name("encoder-5").is_none());
    assert!(led_by_name("encoder-6").is_none());
}

#[test]
fn controls_by_cc() {
    assert_eq!(
        Some(Control {
            category: ControlCategory::Encoder,
            name: "encoder-1",
            cc: 0,
        }),
        control_by_cc(0)
    );
    assert_eq!(
        Some(Control {
            category: ControlCategory::Knob,
            name: "knob-7",
            cc: 10,
        }),
        control_by_cc(10)
    );
    assert_eq!(
        Some(Control {
            category: ControlCategory::Fader,
            name: "fader-1",
            cc: 16,
        }),
        control_by_cc(16)
    );
    assert_eq!(
        Some(ControlCategory::Encoder),
        control_by_cc(21).map(|control| control.category)
    );
    assert!(control_by_cc(22).is_none());
    assert!(control_by_cc(127).is_none());
}

#[test]
fn color_names() {
    assert_eq!("amber", Color::Amber.to_string());
    assert_eq!(Ok(Color::Green), Color::from_str("green"));
    assert_eq!(3, Color::COUNT);
}

#[test]
fn device_descriptor() {
    assert_eq!("XONE:K2", DEVICE_DESCRIPTOR.port_name);
}
