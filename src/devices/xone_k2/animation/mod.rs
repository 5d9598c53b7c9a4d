// SPDX-FileCopyrightText: The k2io authors
// SPDX-License-Identifier: MPL-2.0

//! LED animations.

use std::time::Duration;

use super::{Color, XoneK2, LEDS};
use crate::midi::MidiHost;


/// Default duration of a single step of [`play_startup_animation()`].
pub const STARTUP_ANIMATION_STEP: Duration = Duration::from_millis(50);

const CHASER_COLORS: [Color; 3] = [Color::Red, Color::Green, Color::Amber];

/// Run a chaser of 3 colored LEDs once through all LEDs.
///
/// All LEDs are switched off when finished.
pub async fn play_startup_animation<H: MidiHost>(controller: &XoneK2<H>, step: Duration) {
    log::debug!("Playing startup animation");
    let chaser = |offset: usize| {
        CHASER_COLORS
            .iter()
            .enumerate()
            .map(move |(index, color)| (&LEDS[(offset + index) % LEDS.len()], *color))
    };
    for offset in 0..LEDS.len() {
        for (led, color) in chaser(offset) {
            controller.highlight_led(led.name, color);
        }
        tokio::time::sleep(step).await;
        for (led, _) in chaser(offset) {
            controller.unhighlight_led(led.name);
        }
    }
    controller.unhighlight_all_leds();
}
