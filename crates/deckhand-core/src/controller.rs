//! Engine root for one surface.
//!
//! [`Controller`] owns the model and the two layer managers. Commands reach
//! the active mode or view through it; the engine asks it for frames once
//! per refresh tick.

use crate::display::{colors, LightFrame, TextFrame};
use crate::knob::Recheck;
use crate::mode::{self, ModeId, ModeManager};
use crate::model::{BankKind, Model, SelectionEvent, TimerPurpose};
use crate::surface::ButtonId;
use crate::view::{self, ViewId, ViewManager};

/// Mode buttons of the reference surface and the mode each one selects
const MODE_BUTTONS: [(ButtonId, ModeId); 6] = [
    (ButtonId::Volume, ModeId::Volume),
    (ButtonId::Pan, ModeId::Pan),
    (ButtonId::Track, ModeId::Track),
    (ButtonId::Device, ModeId::Device),
    (ButtonId::Transport, ModeId::Transport),
    (ButtonId::ScaleSettings, ModeId::Scales),
];

/// View buttons of the reference surface
const VIEW_BUTTONS: [(ButtonId, ViewId); 4] = [
    (ButtonId::Note, ViewId::Play),
    (ButtonId::Drum, ViewId::Drum),
    (ButtonId::Sequencer, ViewId::Sequencer),
    (ButtonId::Session, ViewId::Session),
];

/// Model plus mode and view managers.
#[derive(Debug)]
pub struct Controller {
    pub model: Model,
    pub modes: ModeManager,
    pub views: ViewManager,
}

impl Controller {
    /// Controller without any registered modes or views
    pub fn new(model: Model) -> Self {
        Self {
            model,
            modes: ModeManager::new("MODES"),
            views: ViewManager::new(),
        }
    }

    /// Controller with every mode and view of the reference surface
    /// registered. Call [`Controller::activate`] to switch them in.
    pub fn with_defaults(model: Model) -> Self {
        let mut controller = Self::new(model);
        mode::register_defaults(&mut controller.modes);
        view::register_defaults(&mut controller.views);
        controller
    }

    /// Switch in the configured start-up mode and view.
    pub fn activate(&mut self) {
        let behavior = &self.model.config.behavior;
        let mode = ModeId::from_name(&behavior.default_mode).unwrap_or_else(|| {
            log::warn!(
                "[CONTROLLER] Unknown default mode '{}', using volume",
                behavior.default_mode
            );
            ModeId::Volume
        });
        let view = ViewId::from_name(&behavior.default_view).unwrap_or_else(|| {
            log::warn!(
                "[CONTROLLER] Unknown default view '{}', using play",
                behavior.default_view
            );
            ViewId::Play
        });
        self.modes.set_active(mode, &mut self.model);
        self.views.set_active(view, &mut self.model);
        log::info!("[CONTROLLER] Activated with mode {:?} and view {:?}", mode, view);
    }

    /// Permanently switch mode, showing its name.
    pub fn set_mode(&mut self, id: ModeId) -> bool {
        if self.modes.is_active(id) && !self.modes.is_temporary() {
            return false;
        }
        self.announce_mode(id);
        self.modes.set_active(id, &mut self.model)
    }

    /// Route events to `id` until [`Controller::end_peek_mode`].
    pub fn peek_mode(&mut self, id: ModeId) -> bool {
        if self.modes.is_active(id) {
            return false;
        }
        self.announce_mode(id);
        self.modes.set_temporary(id, &mut self.model)
    }

    pub fn end_peek_mode(&mut self, id: ModeId) -> bool {
        self.modes.end_temporary(id, &mut self.model)
    }

    /// Explicit view switch (remembered for the selected track)
    pub fn set_view(&mut self, id: ViewId) -> bool {
        self.views.switch_to(id, &mut self.model)
    }

    pub fn peek_view(&mut self, id: ViewId) -> bool {
        self.views.set_temporary(id, &mut self.model)
    }

    pub fn end_peek_view(&mut self, id: ViewId) -> bool {
        self.views.end_temporary(id, &mut self.model)
    }

    fn announce_mode(&mut self, id: ModeId) {
        if let Some(name) = self.modes.get(id).map(|m| m.name()) {
            self.model.notify(name);
        }
    }

    /// Handle a timer owned by the controller. Long presses belong to the
    /// bindings and are ignored here.
    pub fn on_timer(&mut self, purpose: TimerPurpose) {
        match purpose {
            TimerPurpose::KnobRecheck => {
                let now = self.model.now();
                match self.model.knobs.on_recheck(now) {
                    Recheck::Reschedule(at) => {
                        self.model.timers.schedule(TimerPurpose::KnobRecheck, at);
                    }
                    Recheck::Settled => self.model.request_refresh(),
                    Recheck::Idle => {}
                }
            }
            TimerPurpose::ClearNotification => self.model.clear_notification(),
            TimerPurpose::SaveSettings => self.model.save_settings(),
            TimerPurpose::LongPress(_) => {}
        }
    }

    /// Apply the selection changes reported by the banks since the last
    /// call.
    pub fn process_selections(&mut self) {
        for event in self.model.take_selection_events() {
            self.on_selection(event);
        }
    }

    fn on_selection(&mut self, event: SelectionEvent) {
        log::debug!("[CONTROLLER] {:?} selection {:?} -> {:?}", event.bank, event.old, event.new);
        match event.bank {
            BankKind::Track => {
                let Some(track) = event.new else {
                    return;
                };
                self.model.session.select_track(track);
                self.model.sync_banks();
                self.views.restore_preferred(track, &mut self.model);
            }
            BankKind::Device => {
                let Some(device) = event.new else {
                    return;
                };
                self.model.session.select_device(device);
                self.model.sync_banks();
                self.model.parameter_bank.scroll_to(0);
            }
            BankKind::Scene | BankKind::Send | BankKind::Parameter => {}
        }
    }

    /// Desired state of every light.
    pub fn render_lights(&self) -> LightFrame {
        let model = &self.model;
        let mut lights = model.layout().blank_lights();
        if let Some(view) = self.views.active() {
            view.draw_grid(model, &mut lights);
            view.update_buttons(model, &mut lights);
        }
        if let Some(mode) = self.modes.active() {
            mode.update_knob_leds(model, &mut lights);
            mode.update_row_buttons(model, &mut lights);
        }
        self.render_global_buttons(&mut lights);
        lights
    }

    fn render_global_buttons(&self, lights: &mut LightFrame) {
        let model = &self.model;
        let transport = &model.session.transport;
        let lit = |on: bool| if on { colors::WHITE } else { colors::DARK_GRAY };

        lights.set_button(ButtonId::Shift, lit(model.is_shift()));
        lights.set_button(ButtonId::Select, lit(model.is_select()));
        lights.set_button(
            ButtonId::Play,
            if transport.playing { colors::GREEN } else { colors::DARK_GRAY },
        );
        lights.set_button(
            ButtonId::Record,
            if transport.recording { colors::RED } else { colors::DARK_GRAY },
        );
        lights.set_button(ButtonId::Stop, colors::DARK_GRAY);

        for (button, mode) in MODE_BUTTONS {
            lights.set_button(button, lit(self.modes.is_active(mode)));
        }
        let sends = matches!(self.modes.active_id(), Some(ModeId::Send(_)));
        lights.set_button(ButtonId::Sends, lit(sends));
        for (button, view) in VIEW_BUTTONS {
            lights.set_button(button, lit(self.views.is_active(view)));
        }

        let (back, forward) = match self.modes.active().and_then(|m| m.as_bank_navigable_ref()) {
            Some(nav) => (nav.can_select_previous(model), nav.can_select_next(model)),
            None => (
                model.track_bank.can_scroll_backwards(),
                model.track_bank.can_scroll_forwards(),
            ),
        };
        let off_unless = |on: bool| if on { colors::WHITE } else { colors::OFF };
        lights.set_button(ButtonId::Left, off_unless(back));
        lights.set_button(ButtonId::Right, off_unless(forward));
        lights.set_button(ButtonId::Up, off_unless(model.scene_bank.can_scroll_backwards()));
        lights.set_button(ButtonId::Down, off_unless(model.scene_bank.can_scroll_forwards()));
    }

    /// Desired display content; a pending notification replaces row 0.
    pub fn render_text(&self) -> TextFrame {
        let mut text = self.model.layout().blank_text();
        if let Some(mode) = self.modes.active() {
            mode.update_display(&self.model, &mut text);
        }
        if let Some(notification) = self.model.notification() {
            text.set_line(0, notification);
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Bindings;
    use crate::display::{LightId, LightInfo};
    use crate::model::tests::model_with_tracks;
    use crate::surface::ControlEvent;
    use std::time::Duration;

    fn controller(tracks: usize) -> Controller {
        let mut controller = Controller::with_defaults(model_with_tracks(tracks));
        controller.activate();
        controller
    }

    fn press(bindings: &Bindings, controller: &mut Controller, id: ButtonId, pressed: bool) {
        bindings.dispatch(
            controller,
            ControlEvent::Button {
                id,
                pressed,
                velocity: 127,
            },
        );
    }

    /// Advance the model clock and fire due timers the way the engine does
    fn advance(bindings: &Bindings, controller: &mut Controller, by: Duration) {
        let now = controller.model.now() + by;
        controller.model.set_now(now);
        for purpose in controller.model.timers.poll(now) {
            match purpose {
                TimerPurpose::LongPress(id) => bindings.long_press(controller, id),
                other => controller.on_timer(other),
            }
        }
    }

    #[test]
    fn test_activate_uses_configured_defaults() {
        let mut model = model_with_tracks(2);
        model.config.behavior.default_mode = "send2".to_string();
        model.config.behavior.default_view = "bogus".to_string();
        let mut controller = Controller::with_defaults(model);
        controller.activate();
        assert_eq!(controller.modes.active_id(), Some(ModeId::Send(1)));
        assert_eq!(controller.views.active_id(), Some(ViewId::Play));
    }

    #[test]
    fn test_tap_switches_mode_permanently() {
        let mut controller = controller(4);
        let bindings = Bindings::reference(&controller.model.config);
        press(&bindings, &mut controller, ButtonId::Pan, true);
        press(&bindings, &mut controller, ButtonId::Pan, false);
        assert_eq!(controller.modes.permanent_id(), Some(ModeId::Pan));
        assert_eq!(controller.modes.previous_id(), Some(ModeId::Volume));
        assert_eq!(controller.model.notification(), Some("Pan"));
    }

    #[test]
    fn test_hold_peeks_mode_and_restores() {
        let mut controller = controller(4);
        let bindings = Bindings::reference(&controller.model.config);
        press(&bindings, &mut controller, ButtonId::Transport, true);
        advance(&bindings, &mut controller, Duration::from_millis(450));
        assert!(controller.modes.is_temporary());
        assert_eq!(controller.modes.active_id(), Some(ModeId::Transport));

        press(&bindings, &mut controller, ButtonId::Transport, false);
        assert!(!controller.modes.is_temporary());
        assert_eq!(controller.modes.active_id(), Some(ModeId::Volume));
        assert!(!controller.model.is_long_pressed(ButtonId::Transport));
    }

    #[test]
    fn test_sends_button_cycles() {
        let mut controller = controller(4);
        let bindings = Bindings::reference(&controller.model.config);
        for expected in [0, 1, 2, 3, 0] {
            press(&bindings, &mut controller, ButtonId::Sends, true);
            press(&bindings, &mut controller, ButtonId::Sends, false);
            assert_eq!(controller.modes.active_id(), Some(ModeId::Send(expected)));
        }
    }

    #[test]
    fn test_track_selection_restores_preferred_view() {
        let mut controller = controller(4);
        let bindings = Bindings::reference(&controller.model.config);
        controller.model.track_bank.select(1);
        controller.process_selections();
        press(&bindings, &mut controller, ButtonId::Drum, true);
        press(&bindings, &mut controller, ButtonId::Drum, false);
        assert_eq!(controller.views.preferred_for(1), Some(ViewId::Drum));

        controller.model.track_bank.select(2);
        controller.process_selections();
        controller.set_view(ViewId::Session);

        controller.model.track_bank.select(1);
        controller.process_selections();
        assert_eq!(controller.views.active_id(), Some(ViewId::Drum));
        assert!(controller
            .model
            .session
            .drain_changes()
            .contains(&crate::session::SessionChange::SelectTrack(2)));
    }

    #[test]
    fn test_navigation_without_capability_uses_track_bank() {
        let mut controller = controller(20);
        controller.set_mode(ModeId::Transport);
        let bindings = Bindings::reference(&controller.model.config);
        press(&bindings, &mut controller, ButtonId::Right, true);
        assert_eq!(controller.model.selected_track(), Some(0));
        press(&bindings, &mut controller, ButtonId::Right, false);
        press(&bindings, &mut controller, ButtonId::Right, true);
        assert_eq!(controller.model.selected_track(), Some(1));
    }

    #[test]
    fn test_octave_without_capability_is_noop() {
        let mut controller = controller(2);
        controller.set_view(ViewId::Session);
        let bindings = Bindings::reference(&controller.model.config);
        let octave = controller.model.scales.octave;
        press(&bindings, &mut controller, ButtonId::OctaveUp, true);
        assert_eq!(controller.model.scales.octave, octave);
    }

    #[test]
    fn test_render_lights_global_buttons() {
        let mut controller = controller(20);
        controller.model.session.play();
        let lights = controller.render_lights();
        let button = |id| lights.get(LightId::Button(id));
        assert_eq!(button(ButtonId::Play), Some(LightInfo::solid(colors::GREEN)));
        assert_eq!(button(ButtonId::Volume), Some(LightInfo::solid(colors::WHITE)));
        assert_eq!(button(ButtonId::Note), Some(LightInfo::solid(colors::WHITE)));
        assert_eq!(button(ButtonId::Drum), Some(LightInfo::solid(colors::DARK_GRAY)));
        assert_eq!(button(ButtonId::Right), Some(LightInfo::solid(colors::WHITE)));
    }

    #[test]
    fn test_notification_overlays_first_row() {
        let mut controller = controller(2);
        controller.model.notify("Octave +1");
        let text = controller.render_text();
        assert_eq!(text.cell(0, 0), "Octave +");
        assert_eq!(text.cell(0, 1), "1");
        assert_eq!(text.cell(1, 0), "Track 1");

        controller.on_timer(TimerPurpose::ClearNotification);
        assert_eq!(controller.render_text().cell(0, 0), "0.0dB");
    }

    #[test]
    fn test_knob_settle_requests_refresh() {
        let mut controller = controller(2);
        let bindings = Bindings::reference(&controller.model.config);
        bindings.dispatch(&mut controller, ControlEvent::Knob { index: 0, raw: 1 });
        assert!(controller.model.knobs.is_knob_moving());
        for _ in 0..4 {
            advance(&bindings, &mut controller, Duration::from_millis(100));
        }
        assert!(!controller.model.knobs.is_knob_moving());
        assert!(controller.model.take_refresh_request());
    }
}
