//! The dispatch loop around a [`Controller`].
//!
//! One [`Engine`] serves one surface on one thread. Hardware events are
//! handled as they arrive (or drained from poll-thread channels); once per
//! refresh tick [`Engine::flush`] fires due timers, syncs with the host,
//! pushes recorded session changes and writes the lights and text that
//! changed since the previous tick.

use crate::command::Bindings;
use crate::controller::Controller;
use crate::display::{SurfaceOutput, SurfaceWriter};
use crate::model::TimerPurpose;
use crate::session::HostAdapter;
use crate::surface::ControlEvent;
use crossbeam_channel::Receiver;
use std::time::Instant;

/// Controller, bindings, writer, hardware output and host for one surface.
pub struct Engine<O, H> {
    controller: Controller,
    bindings: Bindings,
    writer: SurfaceWriter,
    output: O,
    host: H,
    inputs: Vec<Receiver<ControlEvent>>,
}

impl<O: SurfaceOutput, H: HostAdapter> Engine<O, H> {
    pub fn new(controller: Controller, bindings: Bindings, output: O, host: H) -> Self {
        Self {
            controller,
            bindings,
            writer: SurfaceWriter::new(),
            output,
            host,
            inputs: Vec::new(),
        }
    }

    /// Drain `events` on every flush (poll threads, transport callbacks)
    pub fn add_input(&mut self, events: Receiver<ControlEvent>) {
        self.inputs.push(events);
    }

    /// Switch in the start-up mode and view and send a full frame.
    pub fn activate(&mut self, now: Instant) {
        self.controller.model.set_now(now);
        self.controller.activate();
        self.writer.invalidate();
        self.flush(now);
    }

    /// Handle one hardware event.
    pub fn handle(&mut self, event: ControlEvent, now: Instant) {
        log::trace!("[ENGINE] {:?}", event);
        self.controller.model.set_now(now);
        self.bindings.dispatch(&mut self.controller, event);
    }

    /// Run one refresh tick.
    pub fn flush(&mut self, now: Instant) {
        let pending: Vec<ControlEvent> = self.inputs.iter().flat_map(|rx| rx.try_iter()).collect();
        for event in pending {
            self.handle(event, now);
        }
        self.controller.model.set_now(now);
        self.fire_timers(now);
        self.sync_host();
        self.write_frames();
    }

    /// Write out anything still pending before the engine goes away.
    pub fn shutdown(&mut self) {
        if self.controller.model.save_pending() {
            self.controller.model.save_settings();
        }
    }

    /// Earliest pending timer, for sleeping between ticks
    pub fn next_deadline(&self) -> Option<Instant> {
        self.controller.model.timers.next_deadline()
    }

    /// Force the next flush to resend everything (e.g. after a reconnect).
    pub fn invalidate(&mut self) {
        self.writer.invalidate();
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut Controller {
        &mut self.controller
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    fn fire_timers(&mut self, now: Instant) {
        for purpose in self.controller.model.timers.poll(now) {
            match purpose {
                TimerPurpose::LongPress(button) => {
                    self.bindings.long_press(&mut self.controller, button)
                }
                other => self.controller.on_timer(other),
            }
        }
    }

    fn sync_host(&mut self) {
        let model = &mut self.controller.model;
        if let Err(e) = self.host.poll(&mut model.session) {
            log::warn!("[ENGINE] Host poll failed: {}", e);
        }
        model.sync_banks();
        self.controller.process_selections();

        for change in self.controller.model.session.drain_changes() {
            if let Err(e) = self.host.apply(&change) {
                log::warn!("[ENGINE] Host rejected {:?}: {}", change, e);
            }
        }
    }

    fn write_frames(&mut self) {
        let lights = self.controller.render_lights();
        let mut written = self.writer.write_lights(&lights, &mut self.output);

        let model = &mut self.controller.model;
        if model.take_refresh_request() {
            self.writer.invalidate_text();
        }
        // the display is left alone while a knob is turning
        if !model.knobs.is_knob_moving() {
            let text = self.controller.render_text();
            written += self.writer.write_text(&text, &mut self.output);
        }
        if written > 0 {
            self.output.flush();
        }
    }
}

impl<O, H> std::fmt::Debug for Engine<O, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("controller", &self.controller)
            .field("inputs", &self.inputs.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::display::{colors, HardwareWrite, LightId, LightInfo, RecordingOutput};
    use crate::error::{Error, Result};
    use crate::model::Model;
    use crate::session::{MemoryHost, Session, SessionChange};
    use crate::settings::MemorySettings;
    use crate::surface::ButtonId;
    use std::time::Duration;

    fn engine(tracks: usize) -> (Engine<RecordingOutput, MemoryHost>, Instant) {
        let now = Instant::now();
        let config = Config::default();
        let model = Model::new(
            config.clone(),
            Session::with_tracks(tracks, 8, 4),
            Box::new(MemorySettings::new()),
            now,
        );
        let bindings = Bindings::reference(&config);
        let controller = Controller::with_defaults(model);
        let mut engine = Engine::new(
            controller,
            bindings,
            RecordingOutput::new(),
            MemoryHost::default(),
        );
        engine.activate(now);
        (engine, now)
    }

    fn button(id: ButtonId, pressed: bool) -> ControlEvent {
        ControlEvent::Button {
            id,
            pressed,
            velocity: 127,
        }
    }

    #[test]
    fn test_activation_sends_full_frame_once() {
        let (mut engine, now) = engine(8);
        let first = engine.output_mut().take();
        let lights = first.iter().filter(|w| matches!(w, HardwareWrite::Light(..))).count();
        assert_eq!(lights, 64 + 47 + 8);
        assert_eq!(engine.output().flushes, 1);

        engine.flush(now + Duration::from_millis(16));
        assert!(engine.output_mut().take().is_empty());
    }

    #[test]
    fn test_button_change_writes_only_changed_lights() {
        let (mut engine, now) = engine(8);
        engine.output_mut().take();
        engine.handle(button(ButtonId::Play, true), now);
        engine.flush(now);
        let writes = engine.output_mut().take();
        assert!(writes.contains(&HardwareWrite::Light(
            LightId::Button(ButtonId::Play),
            LightInfo::solid(colors::GREEN)
        )));
        assert!(writes.len() < 5);
        assert_eq!(engine.host().applied, vec![SessionChange::Play]);
    }

    #[test]
    fn test_inputs_drained_on_flush() {
        let (mut engine, now) = engine(8);
        let (tx, rx) = crossbeam_channel::unbounded();
        engine.add_input(rx);
        tx.send(ControlEvent::Pad {
            index: 0,
            velocity: 100,
        })
        .unwrap();
        engine.flush(now);
        assert_eq!(
            engine.host().applied,
            vec![SessionChange::NoteOn {
                note: 48,
                velocity: 100
            }]
        );
    }

    #[test]
    fn test_text_waits_for_knob_to_settle() {
        let (mut engine, now) = engine(8);
        engine.output_mut().take();
        engine.handle(ControlEvent::Knob { index: 0, raw: 2 }, now);
        engine.flush(now);
        let texts = |writes: &[HardwareWrite]| {
            writes
                .iter()
                .filter(|w| matches!(w, HardwareWrite::Text { .. }))
                .count()
        };
        let writes = engine.output_mut().take();
        assert_eq!(texts(&writes), 0);
        assert!(writes.iter().any(|w| matches!(w, HardwareWrite::Light(LightId::Knob(0), _))));

        let mut t = now;
        for _ in 0..4 {
            t += Duration::from_millis(100);
            engine.flush(t);
        }
        // settled: one full display refresh
        let writes = engine.output_mut().take();
        assert_eq!(texts(&writes), 16);
    }

    #[test]
    fn test_long_press_fires_from_flush() {
        let (mut engine, now) = engine(8);
        engine.handle(button(ButtonId::Device, true), now);
        engine.flush(now + Duration::from_millis(100));
        assert!(!engine.controller().modes.is_temporary());
        engine.flush(now + Duration::from_millis(400));
        assert!(engine.controller().modes.is_temporary());
        assert_eq!(engine.controller().model.notification(), Some("Please select a Device..."));
        engine.handle(button(ButtonId::Device, false), now + Duration::from_millis(500));
        assert!(!engine.controller().modes.is_temporary());
    }

    struct FailingHost;

    impl HostAdapter for FailingHost {
        fn apply(&mut self, _change: &SessionChange) -> Result<()> {
            Err(Error::Host("offline".to_string()))
        }
    }

    #[test]
    fn test_host_errors_are_dropped() {
        let now = Instant::now();
        let model = Model::new(
            Config::default(),
            Session::with_tracks(2, 2, 0),
            Box::new(MemorySettings::new()),
            now,
        );
        let bindings = Bindings::reference(&model.config);
        let mut engine = Engine::new(
            Controller::with_defaults(model),
            bindings,
            RecordingOutput::new(),
            FailingHost,
        );
        engine.activate(now);
        engine.handle(button(ButtonId::Play, true), now);
        engine.flush(now);
        assert!(engine.controller().model.session.pending_changes().is_empty());
        assert!(engine.controller().model.session.transport.playing);
    }
}
