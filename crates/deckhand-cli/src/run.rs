//! `deckhand run`: connect to the surface and dispatch until interrupted.

use anyhow::{Context, Result};
use crossbeam_channel::RecvTimeoutError;
use deckhand_core::{
    Bindings, Config, Controller, Engine, HostAdapter, MemorySettings, Model, Session,
    SessionChange, SettingsStore, SurfaceOutput, TomlSettings,
};
use deckhand_midi::{
    open_input, open_output, MidiHost, MidiSurfaceOutput, MidiWriter, SurfaceMapping,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Host used when no host port is configured: changes stay in the mirror.
#[derive(Debug, Default)]
struct LoggingHost;

impl HostAdapter for LoggingHost {
    fn apply(&mut self, change: &SessionChange) -> deckhand_core::Result<()> {
        log::debug!("[HOST] {:?}", change);
        Ok(())
    }
}

pub fn run(config: Config, host_port: Option<String>, tracks: usize) -> Result<()> {
    let midi = &config.midi;
    let input_name = midi
        .input_port
        .clone()
        .context("No input port configured (set midi.input_port or pass --input)")?;
    let output_name = midi.output_port.clone().unwrap_or_else(|| input_name.clone());

    let mapping = SurfaceMapping::new(midi, &config.surface);
    let (events_tx, events_rx) = crossbeam_channel::unbounded();
    let input = open_input(&midi.client_name, &input_name, mapping.clone(), events_tx)
        .with_context(|| format!("Failed to open input '{}'", input_name))?;
    let sink = open_output(&midi.client_name, &output_name)
        .with_context(|| format!("Failed to open output '{}'", output_name))?;
    let surface_writer = MidiWriter::spawn(sink, midi.sysex_spacing())?;
    let output = MidiSurfaceOutput::new(mapping, surface_writer.sender());

    let settings: Box<dyn SettingsStore> = match TomlSettings::open_default() {
        Ok(store) => Box::new(store),
        Err(e) => {
            log::warn!("Preferences will not be kept: {}", e);
            Box::new(MemorySettings::new())
        }
    };
    let session = Session::with_tracks(tracks, 8, 2);
    let model = Model::new(config.clone(), session, settings, Instant::now());
    let controller = Controller::with_defaults(model);
    let bindings = Bindings::reference(&config);

    log::info!("Surface connected on '{}'", input.name());

    // a missing host port is not fatal, the surface still runs
    let host_sink = host_port.and_then(|port| match open_output(&midi.client_name, &port) {
        Ok(sink) => Some(sink),
        Err(e) => {
            log::warn!("Continuing without host port '{}': {}", port, e);
            None
        }
    });

    match host_sink {
        Some(sink) => {
            let host_writer = MidiWriter::spawn(sink, midi.sysex_spacing())?;
            let host = MidiHost::new(host_writer.sender(), midi.channel);
            dispatch(Engine::new(controller, bindings, output, host), &config, events_rx)
        }
        None => {
            let engine = Engine::new(controller, bindings, output, LoggingHost);
            dispatch(engine, &config, events_rx)
        }
    }
}

fn dispatch<O: SurfaceOutput, H: HostAdapter>(
    mut engine: Engine<O, H>,
    config: &Config,
    events: crossbeam_channel::Receiver<deckhand_core::ControlEvent>,
) -> Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, shutdown.clone())?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, shutdown.clone())?;

    let tick = config.timing.refresh();
    engine.activate(Instant::now());
    log::info!("Running (press Ctrl+C to exit)");

    let mut next_tick = Instant::now() + tick;
    while !shutdown.load(Ordering::Relaxed) {
        let timeout = next_tick.saturating_duration_since(Instant::now());
        match events.recv_timeout(timeout) {
            Ok(event) => engine.handle(event, Instant::now()),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                log::warn!("Input port closed");
                break;
            }
        }
        let now = Instant::now();
        if now >= next_tick {
            engine.flush(now);
            next_tick = now + tick;
        }
    }

    engine.shutdown();
    log::info!("Exiting...");
    Ok(())
}
