// SPDX-FileCopyrightText: The k2io authors
// SPDX-License-Identifier: MPL-2.0

use float_cmp::approx_eq;
use strum::IntoEnumIterator as _;

use super::*;
use crate::{
    midi::{AccessError, VirtualHost, VirtualInputPort, VirtualOutputPort},
    note_name_to_number,
};

const PORT_NAME: &str = "XONE:K2";

// 0x9e/0x8e/0xbe are note on/note off/control change on channel 15
const NOTE_ON: u8 = 0x9e;
const NOTE_OFF: u8 = 0x8e;
const CONTROL_CHANGE: u8 = 0xbe;

fn new_controller(host: &VirtualHost) -> XoneK2<VirtualHost> {
    let provider = Arc::new(MidiProvider::new(host.clone()));
    XoneK2::new(XoneK2Config::default(), provider)
}

fn record_events(controller: &XoneK2<VirtualHost>) -> Arc<Mutex<Vec<ControllerEvent>>> {
    let recorded = Arc::new(Mutex::new(Vec::new()));
    for kind in ControllerEventKind::iter() {
        let recorded = Arc::clone(&recorded);
        controller.on(kind, move |event| recorded.lock().push(event.clone()));
    }
    recorded
}

struct Fixture {
    host: VirtualHost,
    input: Arc<VirtualInputPort>,
    output: Arc<VirtualOutputPort>,
    controller: XoneK2<VirtualHost>,
    events: Arc<Mutex<Vec<ControllerEvent>>>,
}

async fn connected_fixture() -> Fixture {
    let host = VirtualHost::new();
    let (input, output) = host.add_device(PORT_NAME);
    let controller = new_controller(&host);
    let events = record_events(&controller);
    controller.connect().await;
    assert_eq!(ConnectionState::Connected, controller.state());
    events.lock().clear();
    Fixture {
        host,
        input,
        output,
        controller,
        events,
    }
}

fn note(name: &str) -> u8 {
    note_name_to_number(name).unwrap()
}

#[test]
fn default_config() {
    let config = XoneK2Config::default();
    assert_eq!("XONE:K2", config.port_name);
    assert_eq!(15, config.channel.number());
    assert_eq!("XONE:K2-15", config.port_id().to_string());
}

#[test]
fn translate_buttons() {
    let press = translate_midi_event(&MidiEvent::NoteOn(NoteData {
        note: 15,
        velocity: 127,
    }));
    assert!(matches!(
        press,
        Some(ControllerEvent::ButtonPress(Button {
            name: "exit-setup",
            midi_note: 15,
            ..
        }))
    ));
    let release = translate_midi_event(&MidiEvent::NoteOff(NoteData {
        note: 15,
        velocity: 0,
    }));
    assert!(matches!(
        release,
        Some(ControllerEvent::ButtonRelease(Button {
            name: "exit-setup",
            midi_note: 15,
            ..
        }))
    ));
}

#[test]
fn note_on_with_zero_velocity_is_a_press() {
    assert!(matches!(
        translate_midi_event(&MidiEvent::NoteOn(NoteData {
            note: 36,
            velocity: 0,
        })),
        Some(ControllerEvent::ButtonPress(Button { name: "A", .. }))
    ));
}

#[test]
fn translate_unmapped_events() {
    assert!(translate_midi_event(&MidiEvent::NoteOn(NoteData {
        note: 0,
        velocity: 127,
    }))
    .is_none());
    assert!(
        translate_midi_event(&MidiEvent::ControlChange(ControlChangeData {
            cc: 100,
            value: 1,
        }))
        .is_none()
    );
    assert!(
        translate_midi_event(&MidiEvent::ProgramChange(crate::midi::ProgramChangeData {
            program: 1,
        }))
        .is_none()
    );
}

#[test]
fn translate_normalized_controls() {
    let Some(ControllerEvent::FaderChange { name, value }) =
        translate_midi_event(&MidiEvent::ControlChange(ControlChangeData {
            cc: 16,
            value: 64,
        }))
    else {
        panic!("fader expected");
    };
    assert_eq!("fader-1", name);
    assert!(approx_eq!(f64, 64.0 / 127.0, value));

    let Some(ControllerEvent::KnobChange { name, value }) =
        translate_midi_event(&MidiEvent::ControlChange(ControlChangeData {
            cc: 10,
            value: 20,
        }))
    else {
        panic!("knob expected");
    };
    assert_eq!("knob-7", name);
    assert!(approx_eq!(f64, 20.0 / 127.0, value));

    for (cc_value, expected) in [(0, 0.0), (127, 1.0)] {
        let Some(ControllerEvent::KnobChange { value, .. }) =
            translate_midi_event(&MidiEvent::ControlChange(ControlChangeData {
                cc: 4,
                value: cc_value,
            }))
        else {
            panic!("knob expected");
        };
        assert!(approx_eq!(f64, expected, value));
    }
}

#[test]
fn translate_encoder_steps() {
    for (cc_value, expected) in [(127, 1), (0, -1), (1, -1), (126, -1)] {
        assert!(
            matches!(
                translate_midi_event(&MidiEvent::ControlChange(ControlChangeData {
                    cc: 0,
                    value: cc_value,
                })),
                Some(ControllerEvent::EncoderTurn { name: "encoder-1", value }) if value == expected
            ),
            "{cc_value}"
        );
    }
}

#[tokio::test]
async fn connect_publishes_connect_event() {
    let host = VirtualHost::new();
    let (input, _output) = host.add_device(PORT_NAME);
    let controller = new_controller(&host);
    let events = record_events(&controller);
    assert_eq!(ConnectionState::Disconnected, controller.state());

    controller.connect().await;

    assert_eq!(ConnectionState::Connected, controller.state());
    assert!(matches!(events.lock().as_slice(), [ControllerEvent::Connect]));
    assert_eq!(1, input.listener_count());
}

#[tokio::test]
async fn connect_twice_concurrently() {
    let host = VirtualHost::new();
    host.add_device(PORT_NAME);
    let controller = new_controller(&host);
    let events = record_events(&controller);

    futures_util::future::join(controller.connect(), controller.connect()).await;
    controller.connect().await;

    assert_eq!(1, host.access_request_count());
    assert!(matches!(events.lock().as_slice(), [ControllerEvent::Connect]));
}

#[tokio::test]
async fn connect_without_ports() {
    let host = VirtualHost::new();
    host.add_device("other device");
    let controller = new_controller(&host);
    let events = record_events(&controller);

    controller.connect().await;

    assert_eq!(ConnectionState::Error, controller.state());
    let events = events.lock();
    let [ControllerEvent::ConnectionError(err)] = events.as_slice() else {
        panic!("unexpected events: {events:?}");
    };
    assert!(matches!(
        **err,
        ConnectionError::PortsNotFound { ref port_name } if port_name == PORT_NAME
    ));
}

#[tokio::test]
async fn connect_with_access_denied_and_retry() {
    let host = VirtualHost::new();
    host.add_device(PORT_NAME);
    host.deny_access("denied");
    let controller = new_controller(&host);
    let events = record_events(&controller);

    controller.connect().await;

    assert_eq!(ConnectionState::Error, controller.state());
    assert!(matches!(
        events.lock().as_slice(),
        [ControllerEvent::ConnectionError(err)]
            if matches!(**err, ConnectionError::Access(ProviderError::AccessDenied(AccessError::Denied { .. })))
    ));

    host.grant_access();
    controller.connect().await;

    assert_eq!(ConnectionState::Connected, controller.state());
    assert!(matches!(events.lock().last(), Some(ControllerEvent::Connect)));
}

#[tokio::test]
async fn connect_with_output_only() {
    let host = VirtualHost::new();
    let output = host.add_output(PORT_NAME);
    let controller = new_controller(&host);

    controller.connect().await;

    assert_eq!(ConnectionState::Connected, controller.state());
    controller.highlight_led("A", Color::Red);
    assert_eq!(vec![vec![NOTE_ON, note("C2"), 127]], output.sent_messages());
}

#[tokio::test]
async fn connect_with_input_only() {
    let host = VirtualHost::new();
    let input = host.add_input(PORT_NAME);
    let controller = new_controller(&host);
    let events = record_events(&controller);

    controller.connect().await;
    assert_eq!(ConnectionState::Connected, controller.state());

    input.receive(&[NOTE_ON, 15, 127]);
    assert!(matches!(
        events.lock().as_slice(),
        [ControllerEvent::Connect, ControllerEvent::ButtonPress(_)]
    ));

    // LEDs are not available
    controller.highlight_led("A", Color::Red);
    assert_eq!(None, controller.led_color("A"));
}

#[tokio::test]
async fn button_press_and_release() {
    let fixture = connected_fixture().await;

    fixture.input.receive(&[NOTE_ON, 15, 127]);
    fixture.input.receive(&[NOTE_OFF, 15, 0]);

    let events = fixture.events.lock();
    let [ControllerEvent::ButtonPress(pressed), ControllerEvent::ButtonRelease(released)] =
        events.as_slice()
    else {
        panic!("unexpected events: {events:?}");
    };
    assert_eq!("exit-setup", pressed.name);
    assert_eq!(15, pressed.midi_note);
    assert_eq!(pressed, released);
}

#[tokio::test]
async fn ignores_other_channels_and_unmapped_controls() {
    let fixture = connected_fixture().await;

    // Channel 14
    fixture.input.receive(&[0x9d, 15, 127]);
    // Channel 16
    fixture.input.receive(&[0xbf, 16, 64]);
    // Unmapped
    fixture.input.receive(&[NOTE_ON, 0, 127]);
    fixture.input.receive(&[CONTROL_CHANGE, 100, 64]);

    assert!(fixture.events.lock().is_empty());
}

#[tokio::test]
async fn control_changes() {
    let fixture = connected_fixture().await;

    fixture.input.receive(&[CONTROL_CHANGE, 16, 64]);
    fixture.input.receive(&[CONTROL_CHANGE, 10, 20]);
    fixture.input.receive(&[CONTROL_CHANGE, 0, 127]);
    fixture.input.receive(&[CONTROL_CHANGE, 0, 0]);

    let events = fixture.events.lock();
    let [ControllerEvent::FaderChange {
        name: "fader-1",
        value: fader_value,
    }, ControllerEvent::KnobChange {
        name: "knob-7",
        value: knob_value,
    }, ControllerEvent::EncoderTurn {
        name: "encoder-1",
        value: 1,
    }, ControllerEvent::EncoderTurn {
        name: "encoder-1",
        value: -1,
    }] = events.as_slice()
    else {
        panic!("unexpected events: {events:?}");
    };
    assert!(approx_eq!(f64, 64.0 / 127.0, *fader_value));
    assert!(approx_eq!(f64, 20.0 / 127.0, *knob_value));
}

#[tokio::test]
async fn led_round_trip() {
    let fixture = connected_fixture().await;

    fixture.controller.highlight_led("exit-setup", Color::Green);
    assert_eq!(Some(Color::Green), fixture.controller.led_color("exit-setup"));
    fixture.controller.unhighlight_led("exit-setup");
    assert_eq!(None, fixture.controller.led_color("exit-setup"));

    let green = note("B0");
    assert_eq!(
        vec![vec![NOTE_ON, green, 127], vec![NOTE_OFF, green, 0]],
        fixture.output.take_sent_messages()
    );
}

#[tokio::test]
async fn highlight_button_alias() {
    let fixture = connected_fixture().await;

    fixture.controller.highlight_button("exit-setup", Color::Amber);
    fixture.controller.unhighlight_button("exit-setup");
    // Buttons without LED
    fixture.controller.highlight_button("encoder-5", Color::Amber);
    fixture.controller.highlight_button("button-13", Color::Amber);

    let amber = note("G0");
    assert_eq!(
        vec![vec![NOTE_ON, amber, 127], vec![NOTE_OFF, amber, 0]],
        fixture.output.take_sent_messages()
    );
}

#[tokio::test]
async fn rehighlight_switches_off_the_previous_color() {
    let fixture = connected_fixture().await;

    fixture.controller.highlight_led("layer", Color::Red);
    fixture.controller.highlight_led("layer", Color::Red);
    fixture.controller.highlight_led("layer", Color::Amber);

    assert_eq!(
        vec![
            vec![NOTE_ON, note("C0"), 127],
            vec![NOTE_ON, note("C0"), 127],
            vec![NOTE_OFF, note("C0"), 0],
            vec![NOTE_ON, note("E0"), 127],
        ],
        fixture.output.take_sent_messages()
    );
    assert_eq!(Some(Color::Amber), fixture.controller.led_color("layer"));
}

#[tokio::test]
async fn unknown_and_unlit_leds_are_ignored() {
    let fixture = connected_fixture().await;

    fixture.controller.highlight_led("unknown", Color::Red);
    fixture.controller.unhighlight_led("unknown");
    fixture.controller.unhighlight_led("A");

    assert!(fixture.output.sent_messages().is_empty());
    assert!(fixture.controller.highlighted_leds().is_empty());
}

#[tokio::test]
async fn unhighlight_all_leds() {
    let fixture = connected_fixture().await;

    fixture.controller.highlight_led("P", Color::Green);
    fixture.controller.highlight_led("A", Color::Red);
    assert_eq!(
        vec![("A", Color::Red), ("P", Color::Green)],
        fixture.controller.highlighted_leds()
    );
    fixture.output.take_sent_messages();

    fixture.controller.unhighlight_all_leds();

    assert!(fixture.controller.highlighted_leds().is_empty());
    assert_eq!(
        vec![vec![NOTE_OFF, note("C2"), 0], vec![NOTE_OFF, note("D#7"), 0]],
        fixture.output.take_sent_messages()
    );
}

#[tokio::test]
async fn disconnect_detaches_and_switches_off_leds() {
    let fixture = connected_fixture().await;
    fixture.controller.highlight_led("M", Color::Amber);
    fixture.output.take_sent_messages();

    fixture.controller.disconnect();

    assert_eq!(ConnectionState::Disconnected, fixture.controller.state());
    assert_eq!(
        vec![vec![NOTE_OFF, note("C4"), 0]],
        fixture.output.take_sent_messages()
    );
    fixture.input.receive(&[NOTE_ON, 15, 127]);
    assert!(fixture.events.lock().is_empty());

    // Reconnect
    fixture.controller.connect().await;
    assert_eq!(ConnectionState::Connected, fixture.controller.state());
    fixture.input.receive(&[NOTE_ON, 15, 127]);
    assert_eq!(2, fixture.events.lock().len());
    assert_eq!(1, fixture.host.access_request_count());
}

#[tokio::test]
async fn reconnect_after_unplugging_while_disconnected() {
    let fixture = connected_fixture().await;
    fixture.controller.disconnect();
    fixture.controller.provider().disconnect();

    fixture.host.remove_device(PORT_NAME);
    fixture.controller.connect().await;

    assert_eq!(ConnectionState::Error, fixture.controller.state());
    assert!(matches!(
        fixture.events.lock().as_slice(),
        [ControllerEvent::ConnectionError(_)]
    ));
}

#[tokio::test]
async fn dropping_the_controller_detaches_from_the_input() {
    let fixture = connected_fixture().await;
    let provider = Arc::clone(fixture.controller.provider());
    let input = provider
        .get_input(&fixture.controller.config().port_id())
        .unwrap();
    assert_eq!(3, input.subscriber_count());

    drop(fixture.controller);

    assert_eq!(0, input.subscriber_count());
}

#[cfg(feature = "observables")]
#[tokio::test]
async fn observe_connection_state() {
    let host = VirtualHost::new();
    host.add_device(PORT_NAME);
    let controller = new_controller(&host);
    let subscriber = controller.subscribe_state();
    assert_eq!(ConnectionState::Disconnected, *subscriber.read());

    controller.connect().await;
    assert_eq!(ConnectionState::Connected, *subscriber.read());

    controller.disconnect();
    assert_eq!(ConnectionState::Disconnected, *subscriber.read());
}
