//! Commands: small adapters from hardware events to the engine.
//!
//! A command owns no state beyond its wiring (which button, which knob). It
//! resolves the receiver at the time of the event (the active mode or view)
//! and delegates; when the receiver lacks the capability a command needs,
//! the event is dropped.
//!
//! [`Bindings`] maps every control of a surface to its command and is the
//! single entry point for decoded [`ControlEvent`]s.

use crate::config::Config;
use crate::controller::Controller;
use crate::mode::{ModeId, MAX_SENDS};
use crate::model::TimerPurpose;
use crate::settings::RibbonMode;
use crate::surface::{ButtonId, ControlEvent};
use crate::value::ValueChanger;
use crate::view::ViewId;
use std::collections::HashMap;

/// Phase of a button press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    Down,
    Up,
    /// Still held after the long-press delay
    Long,
}

/// Command bound to a button.
pub trait TriggerCommand {
    /// Dispatch to the shifted or normal variant.
    fn execute(&self, controller: &mut Controller, event: ButtonEvent, velocity: u8) {
        if controller.model.is_shift() {
            self.execute_shifted(controller, event, velocity);
        } else {
            self.execute_normal(controller, event, velocity);
        }
    }

    fn execute_normal(&self, controller: &mut Controller, event: ButtonEvent, velocity: u8);

    fn execute_shifted(&self, controller: &mut Controller, event: ButtonEvent, velocity: u8) {
        self.execute_normal(controller, event, velocity);
    }
}

/// Command bound to a continuous control (knob, fader, ribbon).
pub trait ContinuousCommand {
    fn execute(&self, controller: &mut Controller, value: u16);
}

/// Holds the shift modifier while pressed
#[derive(Debug, Default)]
pub struct ShiftCommand;

impl TriggerCommand for ShiftCommand {
    fn execute(&self, controller: &mut Controller, event: ButtonEvent, velocity: u8) {
        self.execute_normal(controller, event, velocity);
    }

    fn execute_normal(&self, controller: &mut Controller, event: ButtonEvent, _velocity: u8) {
        match event {
            ButtonEvent::Down => controller.model.modifiers.shift = true,
            ButtonEvent::Up => controller.model.modifiers.shift = false,
            ButtonEvent::Long => {}
        }
    }
}

/// Holds the select modifier while pressed
#[derive(Debug, Default)]
pub struct SelectCommand;

impl TriggerCommand for SelectCommand {
    fn execute_normal(&self, controller: &mut Controller, event: ButtonEvent, _velocity: u8) {
        match event {
            ButtonEvent::Down => controller.model.modifiers.select = true,
            ButtonEvent::Up => controller.model.modifiers.select = false,
            ButtonEvent::Long => {}
        }
    }
}

/// Mode button: a tap switches permanently, holding peeks at the mode until
/// the button is released.
#[derive(Debug)]
pub struct ModeSelectCommand {
    button: ButtonId,
    mode: ModeId,
}

impl ModeSelectCommand {
    pub fn new(button: ButtonId, mode: ModeId) -> Self {
        Self { button, mode }
    }
}

impl TriggerCommand for ModeSelectCommand {
    fn execute_normal(&self, controller: &mut Controller, event: ButtonEvent, _velocity: u8) {
        match event {
            ButtonEvent::Down => {}
            ButtonEvent::Long => {
                controller.peek_mode(self.mode);
            }
            ButtonEvent::Up => {
                if controller.model.is_long_pressed(self.button) {
                    controller.end_peek_mode(self.mode);
                } else {
                    controller.set_mode(self.mode);
                }
            }
        }
    }

    fn execute_shifted(&self, controller: &mut Controller, event: ButtonEvent, velocity: u8) {
        // shift + tapping the active mode's button toggles back
        let tapped = event == ButtonEvent::Up && !controller.model.is_long_pressed(self.button);
        if tapped && !controller.modes.is_temporary() && controller.modes.is_active(self.mode) {
            controller.modes.activate_previous(&mut controller.model);
            return;
        }
        self.execute_normal(controller, event, velocity);
    }
}

/// Sends button: cycles through the send modes, holding peeks at the
/// current one.
#[derive(Debug)]
pub struct SendModeCommand {
    button: ButtonId,
}

impl SendModeCommand {
    pub fn new(button: ButtonId) -> Self {
        Self { button }
    }

    fn next_send(controller: &Controller) -> ModeId {
        let count = controller
            .model
            .send_bank
            .item_count()
            .clamp(1, MAX_SENDS as usize) as u8;
        match controller.modes.active_id() {
            Some(ModeId::Send(n)) => ModeId::Send((n + 1) % count),
            _ => ModeId::Send(0),
        }
    }

    fn current_send(controller: &Controller) -> ModeId {
        match controller.modes.active_id() {
            Some(id @ ModeId::Send(_)) => id,
            _ => ModeId::Send(0),
        }
    }
}

impl TriggerCommand for SendModeCommand {
    fn execute_normal(&self, controller: &mut Controller, event: ButtonEvent, _velocity: u8) {
        match event {
            ButtonEvent::Down => {}
            ButtonEvent::Long => {
                let mode = Self::current_send(controller);
                controller.peek_mode(mode);
            }
            ButtonEvent::Up => {
                if controller.model.is_long_pressed(self.button) {
                    let mode = Self::current_send(controller);
                    controller.end_peek_mode(mode);
                } else {
                    let mode = Self::next_send(controller);
                    controller.set_mode(mode);
                }
            }
        }
    }
}

/// View button: a tap switches (and is remembered for the selected track),
/// holding peeks at the view.
#[derive(Debug)]
pub struct ViewSelectCommand {
    button: ButtonId,
    view: ViewId,
}

impl ViewSelectCommand {
    pub fn new(button: ButtonId, view: ViewId) -> Self {
        Self { button, view }
    }
}

impl TriggerCommand for ViewSelectCommand {
    fn execute_normal(&self, controller: &mut Controller, event: ButtonEvent, _velocity: u8) {
        match event {
            ButtonEvent::Down => {}
            ButtonEvent::Long => {
                controller.peek_view(self.view);
            }
            ButtonEvent::Up => {
                if controller.model.is_long_pressed(self.button) {
                    controller.end_peek_view(self.view);
                } else {
                    controller.set_view(self.view);
                }
            }
        }
    }
}

/// Play / stop toggle; shift toggles the metronome
#[derive(Debug, Default)]
pub struct PlayCommand;

impl TriggerCommand for PlayCommand {
    fn execute_normal(&self, controller: &mut Controller, event: ButtonEvent, _velocity: u8) {
        if event == ButtonEvent::Down {
            controller.model.session.toggle_play();
        }
    }

    fn execute_shifted(&self, controller: &mut Controller, event: ButtonEvent, _velocity: u8) {
        if event == ButtonEvent::Down {
            controller.model.session.toggle_metronome();
            let state = if controller.model.session.transport.metronome {
                "On"
            } else {
                "Off"
            };
            controller.model.notify(format!("Metronome {}", state));
        }
    }
}

/// Record toggle; shift creates a scene
#[derive(Debug, Default)]
pub struct RecordCommand;

impl TriggerCommand for RecordCommand {
    fn execute_normal(&self, controller: &mut Controller, event: ButtonEvent, _velocity: u8) {
        if event == ButtonEvent::Down {
            controller.model.session.toggle_record();
        }
    }

    fn execute_shifted(&self, controller: &mut Controller, event: ButtonEvent, _velocity: u8) {
        if event == ButtonEvent::Down {
            controller.model.session.create_scene();
            controller.model.sync_banks();
        }
    }
}

/// Stop; shift stops the clips of every track
#[derive(Debug, Default)]
pub struct StopCommand;

impl TriggerCommand for StopCommand {
    fn execute_normal(&self, controller: &mut Controller, event: ButtonEvent, _velocity: u8) {
        if event == ButtonEvent::Down {
            controller.model.session.stop();
        }
    }

    fn execute_shifted(&self, controller: &mut Controller, event: ButtonEvent, _velocity: u8) {
        if event == ButtonEvent::Down {
            for track in 0..controller.model.session.tracks.len() {
                controller.model.session.stop_track(track);
            }
        }
    }
}

/// Direction of a navigation button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

/// Arrow buttons.
///
/// Left/right page the active mode's bank (single items; shift pages), or
/// the track bank when the mode has none. Up/down scroll the steps of a
/// sequencer view, otherwise the scene bank.
#[derive(Debug)]
pub struct NavigationCommand {
    direction: Direction,
}

impl NavigationCommand {
    pub fn new(direction: Direction) -> Self {
        Self { direction }
    }

    fn horizontal(controller: &mut Controller, forwards: bool) {
        let page = controller.model.is_shift();
        let model = &mut controller.model;
        if let Some(nav) = controller
            .modes
            .active_mut()
            .and_then(|mode| mode.as_bank_navigable())
        {
            if forwards {
                nav.select_next(model, page);
            } else {
                nav.select_previous(model, page);
            }
            return;
        }
        let bank = &mut model.track_bank;
        match (forwards, page) {
            (true, false) => bank.select_next_item(),
            (false, false) => bank.select_previous_item(),
            (true, true) => bank.select_next_page(),
            (false, true) => bank.select_previous_page(),
        };
    }

    fn vertical(controller: &mut Controller, forwards: bool) {
        let model = &mut controller.model;
        if let Some(sequencer) = controller
            .views
            .active_mut()
            .and_then(|view| view.as_sequencer())
        {
            sequencer.scroll_steps(if forwards { 1 } else { -1 }, model);
            return;
        }
        if forwards {
            model.scene_bank.select_next_page();
        } else {
            model.scene_bank.select_previous_page();
        }
    }
}

impl TriggerCommand for NavigationCommand {
    fn execute(&self, controller: &mut Controller, event: ButtonEvent, _velocity: u8) {
        if event != ButtonEvent::Down {
            return;
        }
        match self.direction {
            Direction::Left => Self::horizontal(controller, false),
            Direction::Right => Self::horizontal(controller, true),
            Direction::Up => Self::vertical(controller, false),
            Direction::Down => Self::vertical(controller, true),
        }
    }

    fn execute_normal(&self, controller: &mut Controller, event: ButtonEvent, velocity: u8) {
        self.execute(controller, event, velocity);
    }
}

/// Octave buttons; with shift they change the sequencer resolution
#[derive(Debug)]
pub struct OctaveCommand {
    up: bool,
}

impl OctaveCommand {
    pub fn new(up: bool) -> Self {
        Self { up }
    }
}

impl TriggerCommand for OctaveCommand {
    fn execute_normal(&self, controller: &mut Controller, event: ButtonEvent, _velocity: u8) {
        if event != ButtonEvent::Down {
            return;
        }
        let model = &mut controller.model;
        let Some(view) = controller.views.active_mut() else {
            return;
        };
        if let Some(transposable) = view.as_transposable() {
            if self.up {
                transposable.octave_up(model);
            } else {
                transposable.octave_down(model);
            }
        }
    }

    fn execute_shifted(&self, controller: &mut Controller, event: ButtonEvent, _velocity: u8) {
        if event != ButtonEvent::Down {
            return;
        }
        let model = &mut controller.model;
        let Some(view) = controller.views.active_mut() else {
            return;
        };
        if let Some(sequencer) = view.as_sequencer() {
            if self.up {
                sequencer.resolution_up(model);
            } else {
                sequencer.resolution_down(model);
            }
        }
    }
}

/// One button of the rows under the display, owned by the active mode
#[derive(Debug)]
pub struct RowButtonCommand {
    row: usize,
    index: usize,
}

impl RowButtonCommand {
    pub fn new(row: usize, index: usize) -> Self {
        Self { row, index }
    }
}

impl TriggerCommand for RowButtonCommand {
    fn execute_normal(&self, controller: &mut Controller, event: ButtonEvent, _velocity: u8) {
        if let Some(mode) = controller.modes.active_mut() {
            mode.on_row_button(self.row, self.index, event, &mut controller.model);
        }
    }
}

/// One scene button, owned by the active view
#[derive(Debug)]
pub struct SceneButtonCommand {
    index: usize,
}

impl SceneButtonCommand {
    pub fn new(index: usize) -> Self {
        Self { index }
    }
}

impl TriggerCommand for SceneButtonCommand {
    fn execute_normal(&self, controller: &mut Controller, event: ButtonEvent, _velocity: u8) {
        if let Some(view) = controller.views.active_mut() {
            view.on_scene_button(self.index, event, &mut controller.model);
        }
    }
}

/// Toggles a drum view between playing and step editing
#[derive(Debug, Default)]
pub struct StepEditCommand;

impl TriggerCommand for StepEditCommand {
    fn execute_normal(&self, controller: &mut Controller, event: ButtonEvent, _velocity: u8) {
        if event != ButtonEvent::Down {
            return;
        }
        let model = &mut controller.model;
        if let Some(pads) = controller
            .views
            .active_mut()
            .and_then(|view| view.as_drum_pads())
        {
            pads.toggle_step_edit(model);
        }
    }
}

/// Knob touch sensor: Down = touched, Up = released
#[derive(Debug)]
pub struct KnobTouchCommand {
    index: usize,
}

impl KnobTouchCommand {
    pub fn new(index: usize) -> Self {
        Self { index }
    }
}

impl TriggerCommand for KnobTouchCommand {
    fn execute(&self, controller: &mut Controller, event: ButtonEvent, velocity: u8) {
        self.execute_normal(controller, event, velocity);
    }

    fn execute_normal(&self, controller: &mut Controller, event: ButtonEvent, _velocity: u8) {
        let touched = match event {
            ButtonEvent::Down => true,
            ButtonEvent::Up => false,
            ButtonEvent::Long => return,
        };
        if let Some(mode) = controller.modes.active_mut() {
            mode.on_knob_touch(self.index, touched, &mut controller.model);
        }
    }
}

/// Knob of the active mode
#[derive(Debug)]
pub struct KnobCommand {
    index: usize,
    changer: ValueChanger,
}

impl KnobCommand {
    pub fn new(index: usize, changer: ValueChanger) -> Self {
        Self { index, changer }
    }
}

impl ContinuousCommand for KnobCommand {
    fn execute(&self, controller: &mut Controller, value: u16) {
        let model = &mut controller.model;
        model.on_knob_delta();
        let input = self.changer.decode(value, model.is_fine());
        if let Some(mode) = controller.modes.active_mut() {
            mode.on_knob_value(self.index, input, model);
        }
    }
}

/// Ribbon / pitch bend wheel, routed by the persisted ribbon mode
#[derive(Debug, Default)]
pub struct PitchbendCommand;

impl ContinuousCommand for PitchbendCommand {
    fn execute(&self, controller: &mut Controller, value: u16) {
        let value = value.min(16383);
        let model = &mut controller.model;
        match model.preferences.ribbon_mode {
            RibbonMode::PitchBend => model.session.pitch_bend(value),
            RibbonMode::Cc1 => model.session.control_change(1, (value >> 7) as u8),
            RibbonMode::Cc11 => model.session.control_change(11, (value >> 7) as u8),
            RibbonMode::Volume => {
                if let Some(track) = model.selected_track() {
                    model.session.set_track_volume(track, value as f64 / 16383.0);
                }
            }
        }
    }
}

/// Pressure: channel pressure is forwarded, per-pad pressure goes to the
/// note the pad currently plays.
#[derive(Debug, Default)]
pub struct AftertouchCommand;

impl AftertouchCommand {
    pub fn execute_poly(&self, controller: &mut Controller, index: usize, pressure: u8) {
        let note = controller
            .views
            .active()
            .and_then(|view| view.pad_note(index, &controller.model));
        match note {
            Some(note) => controller.model.session.poly_pressure(note, pressure),
            None => log::trace!("[COMMANDS] Dropping pressure for unmapped pad {}", index),
        }
    }
}

impl ContinuousCommand for AftertouchCommand {
    fn execute(&self, controller: &mut Controller, value: u16) {
        controller.model.session.channel_pressure(value.min(127) as u8);
    }
}

/// Grid pads, routed to the active view with the accent preference applied
#[derive(Debug, Default)]
pub struct PadCommand;

impl PadCommand {
    pub fn execute(&self, controller: &mut Controller, index: usize, velocity: u8) {
        let velocity = controller.model.preferences.velocity(velocity);
        if let Some(view) = controller.views.active_mut() {
            view.on_grid_note(index, velocity, &mut controller.model);
        }
    }
}

/// Control → command table of one surface.
pub struct Bindings {
    buttons: HashMap<ButtonId, Box<dyn TriggerCommand>>,
    knobs: Vec<KnobCommand>,
    knob_touch: Vec<KnobTouchCommand>,
    pads: PadCommand,
    pitchbend: PitchbendCommand,
    aftertouch: AftertouchCommand,
}

impl Default for Bindings {
    fn default() -> Self {
        Self::new()
    }
}

impl Bindings {
    /// Bindings with pads, ribbon and pressure wired and nothing else
    pub fn new() -> Self {
        Self {
            buttons: HashMap::new(),
            knobs: Vec::new(),
            knob_touch: Vec::new(),
            pads: PadCommand,
            pitchbend: PitchbendCommand,
            aftertouch: AftertouchCommand,
        }
    }

    /// The reference grid controller wiring.
    pub fn reference(config: &Config) -> Self {
        let mut bindings = Self::new();
        let layout = &config.surface;

        bindings.bind(ButtonId::Shift, ShiftCommand);
        bindings.bind(ButtonId::Select, SelectCommand);
        bindings.bind(ButtonId::Play, PlayCommand);
        bindings.bind(ButtonId::Record, RecordCommand);
        bindings.bind(ButtonId::Stop, StopCommand);
        bindings.bind(ButtonId::Left, NavigationCommand::new(Direction::Left));
        bindings.bind(ButtonId::Right, NavigationCommand::new(Direction::Right));
        bindings.bind(ButtonId::Up, NavigationCommand::new(Direction::Up));
        bindings.bind(ButtonId::Down, NavigationCommand::new(Direction::Down));
        bindings.bind(ButtonId::OctaveUp, OctaveCommand::new(true));
        bindings.bind(ButtonId::OctaveDown, OctaveCommand::new(false));
        bindings.bind(ButtonId::StepEdit, StepEditCommand);

        for (button, mode) in [
            (ButtonId::Volume, ModeId::Volume),
            (ButtonId::Pan, ModeId::Pan),
            (ButtonId::Track, ModeId::Track),
            (ButtonId::Device, ModeId::Device),
            (ButtonId::Transport, ModeId::Transport),
            (ButtonId::ScaleSettings, ModeId::Scales),
        ] {
            bindings.bind(button, ModeSelectCommand::new(button, mode));
        }
        bindings.bind(ButtonId::Sends, SendModeCommand::new(ButtonId::Sends));

        for (button, view) in [
            (ButtonId::Note, ViewId::Play),
            (ButtonId::Drum, ViewId::Drum),
            (ButtonId::Sequencer, ViewId::Sequencer),
            (ButtonId::Session, ViewId::Session),
        ] {
            bindings.bind(button, ViewSelectCommand::new(button, view));
        }

        for i in 0..layout.row_buttons {
            bindings.bind(ButtonId::Row1(i as u8), RowButtonCommand::new(0, i));
            bindings.bind(ButtonId::Row2(i as u8), RowButtonCommand::new(1, i));
        }
        for i in 0..layout.scene_buttons {
            bindings.bind(ButtonId::Scene(i as u8), SceneButtonCommand::new(i));
        }

        let changer = ValueChanger::new(config.midi.knob_encoding);
        for i in 0..layout.knobs {
            bindings.knobs.push(KnobCommand::new(i, changer));
            bindings.knob_touch.push(KnobTouchCommand::new(i));
        }
        bindings
    }

    /// Bind a button, replacing any previous command
    pub fn bind<C: TriggerCommand + 'static>(&mut self, button: ButtonId, command: C) {
        self.buttons.insert(button, Box::new(command));
    }

    pub fn is_bound(&self, button: ButtonId) -> bool {
        self.buttons.contains_key(&button)
    }

    /// Route one decoded event. Unbound controls are ignored.
    pub fn dispatch(&self, controller: &mut Controller, event: ControlEvent) {
        match event {
            ControlEvent::Button {
                id,
                pressed,
                velocity,
            } => self.dispatch_button(controller, id, pressed, velocity),
            ControlEvent::Pad { index, velocity } => {
                if index < controller.model.layout().grid_size() {
                    self.pads.execute(controller, index, velocity);
                }
            }
            ControlEvent::Knob { index, raw } => {
                if let Some(knob) = self.knobs.get(index) {
                    knob.execute(controller, raw);
                }
            }
            ControlEvent::KnobTouch { index, touched } => {
                if let Some(touch) = self.knob_touch.get(index) {
                    let event = if touched {
                        ButtonEvent::Down
                    } else {
                        ButtonEvent::Up
                    };
                    touch.execute(controller, event, 127);
                }
            }
            ControlEvent::PitchBend { value } => self.pitchbend.execute(controller, value),
            ControlEvent::PolyPressure { index, pressure } => {
                self.aftertouch.execute_poly(controller, index, pressure)
            }
            ControlEvent::ChannelPressure { pressure } => {
                self.aftertouch.execute(controller, pressure as u16)
            }
        }
    }

    /// A long-press timer fired for `button`.
    pub fn long_press(&self, controller: &mut Controller, button: ButtonId) {
        if !controller.model.is_button_pressed(button) {
            return;
        }
        controller.model.set_long_pressed(button, true);
        if let Some(command) = self.buttons.get(&button) {
            command.execute(controller, ButtonEvent::Long, 127);
        }
    }

    fn dispatch_button(
        &self,
        controller: &mut Controller,
        id: ButtonId,
        pressed: bool,
        velocity: u8,
    ) {
        let model = &mut controller.model;
        // repeated edges from the hardware are dropped
        if model.is_button_pressed(id) == pressed {
            return;
        }
        model.set_button_pressed(id, pressed);
        let purpose = TimerPurpose::LongPress(id);
        if pressed {
            let at = model.now() + model.config.timing.long_press();
            model.timers.schedule(purpose, at);
        } else {
            model.timers.cancel(purpose);
        }

        let event = if pressed {
            ButtonEvent::Down
        } else {
            ButtonEvent::Up
        };
        match self.buttons.get(&id) {
            Some(command) => command.execute(controller, event, velocity),
            None => log::trace!("[COMMANDS] Unbound button {:?}", id),
        }
        if !pressed {
            controller.model.set_long_pressed(id, false);
        }
    }
}

impl std::fmt::Debug for Bindings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bindings")
            .field("buttons", &self.buttons.len())
            .field("knobs", &self.knobs)
            .finish_non_exhaustive()
    }
}
