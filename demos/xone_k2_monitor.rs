// SPDX-FileCopyrightText: The k2io authors
// SPDX-License-Identifier: MPL-2.0

//! Log all events of a connected Xone:K2.
//!
//! Usage: `cargo run --example xone-k2-monitor [PORT_NAME] [CHANNEL]`

use std::{sync::Arc, time::Duration};

use k2io::{
    devices::xone_k2::{
        play_startup_animation, Color, ConnectionState, ControllerEventKind, XoneK2, XoneK2Config,
        STARTUP_ANIMATION_STEP,
    },
    Channel, MidiProvider, MidirHost, ProviderEventKind,
};
use strum::IntoEnumIterator as _;

const REFRESH_PORTS_INTERVAL: Duration = Duration::from_secs(1);

fn config_from_args() -> anyhow::Result<XoneK2Config> {
    let mut config = XoneK2Config::default();
    let mut args = std::env::args().skip(1);
    if let Some(port_name) = args.next() {
        config.port_name = port_name;
    }
    if let Some(channel) = args.next() {
        config.channel = Channel::try_from(channel.parse::<u8>()?)?;
    }
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let config = config_from_args()?;
    let provider = Arc::new(MidiProvider::new(MidirHost::default()));
    provider.on(ProviderEventKind::StateChange, |event| {
        println!("{event:?}");
    });
    let controller = XoneK2::new(config, Arc::clone(&provider));
    for kind in ControllerEventKind::iter() {
        controller.on(kind, |event| {
            println!("{event:?}");
        });
    }

    controller.connect().await;
    if controller.state() != ConnectionState::Connected {
        anyhow::bail!(
            "failed to connect to {port_id}",
            port_id = controller.config().port_id()
        );
    }
    play_startup_animation(&controller, STARTUP_ANIMATION_STEP).await;
    controller.highlight_button("layer", Color::Green);

    let Some(access) = provider.access() else {
        anyhow::bail!("not connected");
    };
    println!("Starting endless loop, press CTRL-C to exit...");
    let mut interval = tokio::time::interval(REFRESH_PORTS_INTERVAL);
    loop {
        interval.tick().await;
        access.refresh_ports();
    }
}
