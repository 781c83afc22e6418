//! `deckhand simulate`: drive the engine from a script with a simulated
//! clock and log what the surface and the host would receive.

use crate::script::Step;
use anyhow::Result;
use deckhand_core::display::{HardwareWrite, LightId};
use deckhand_core::session::{Device, Parameter};
use deckhand_core::{
    Bindings, Config, Controller, Engine, MemoryHost, MemorySettings, Model, RecordingOutput,
    Session, SessionChange,
};
use std::time::Instant;

type SimEngine = Engine<RecordingOutput, MemoryHost>;

/// What a simulation run produced
#[derive(Debug, Default)]
pub struct Summary {
    pub light_writes: usize,
    pub text_writes: usize,
    pub host_changes: Vec<SessionChange>,
}

/// Session used by the simulator: empty clips except for the first scene,
/// one device with eight parameters.
pub fn demo_session(tracks: usize) -> Session {
    let mut session = Session::with_tracks(tracks, 8, 2);
    for track in &mut session.tracks {
        if let Some(slot) = track.slots.first_mut() {
            slot.has_content = true;
        }
    }
    session.devices.push(Device {
        name: "Poly Synth".to_string(),
        parameters: (0..8)
            .map(|i| Parameter {
                name: format!("Macro {}", i + 1),
                value: 0.5,
            })
            .collect(),
    });
    session
}

pub fn simulate(config: Config, steps: Vec<Step>, tracks: usize) -> Result<Summary> {
    let start = Instant::now();
    let model = Model::new(
        config.clone(),
        demo_session(tracks),
        Box::new(MemorySettings::new()),
        start,
    );
    let bindings = Bindings::reference(&config);
    let mut engine = Engine::new(
        Controller::with_defaults(model),
        bindings,
        RecordingOutput::new(),
        MemoryHost::default(),
    );
    engine.activate(start);

    let mut summary = Summary::default();
    collect(&mut engine, &mut summary, start, start);

    let tick = config.timing.refresh();
    let mut now = start;
    for step in steps {
        match step {
            Step::Event(event) => {
                log::info!("[SIM] {:>6}ms  {:?}", now.duration_since(start).as_millis(), event);
                engine.handle(event, now);
                engine.flush(now);
                collect(&mut engine, &mut summary, start, now);
            }
            Step::Wait(duration) => {
                let end = now + duration;
                while now < end {
                    now = (now + tick).min(end);
                    engine.flush(now);
                    collect(&mut engine, &mut summary, start, now);
                }
            }
        }
    }

    let controller = engine.controller();
    log::info!(
        "[SIM] Finished: mode {:?}, view {:?}",
        controller.modes.active_id(),
        controller.views.active_id()
    );
    let text = controller.render_text();
    for row in 0..text.rows() {
        log::info!("[SIM] | {} |", text.line(row));
    }
    log::info!(
        "[SIM] {} light writes, {} text writes, {} host changes",
        summary.light_writes,
        summary.text_writes,
        summary.host_changes.len()
    );
    Ok(summary)
}

fn collect(engine: &mut SimEngine, summary: &mut Summary, start: Instant, now: Instant) {
    let ms = now.duration_since(start).as_millis();
    for write in engine.output_mut().take() {
        match write {
            HardwareWrite::Light(id, light) => {
                summary.light_writes += 1;
                // pads are too chatty for info
                if matches!(id, LightId::Pad(_)) {
                    log::debug!("[SIM] {:>6}ms  light {:?} = {:?}", ms, id, light);
                } else {
                    log::trace!("[SIM] {:>6}ms  light {:?} = {:?}", ms, id, light);
                }
            }
            HardwareWrite::Text { row, cell, text } => {
                summary.text_writes += 1;
                log::debug!("[SIM] {:>6}ms  text {}:{} = '{}'", ms, row, cell, text);
            }
        }
    }
    for change in std::mem::take(&mut engine.host_mut().applied) {
        log::info!("[SIM] {:>6}ms  host <- {:?}", ms, change);
        summary.host_changes.push(change);
    }
}
