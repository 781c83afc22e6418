//! Drum pads plus a step sequencer for the selected voice.
//!
//! ```text
//! row 7  | steps  0..7              |
//! row 6  | steps  8..15             |   upper half: steps of the
//! row 5  | steps 16..23             |   selected pad's note
//! row 4  | steps 24..31             |
//! row 3  | pads 12..15 |            |
//! ...    |             |  (unused)  |   lower-left 4x4: drum pads
//! row 0  | pads  0..3  |            |
//! ```

use super::{
    track_color, DrumPads, SequencerCapable, Transposable, View, DEFAULT_RESOLUTION, RESOLUTIONS,
};
use crate::command::ButtonEvent;
use crate::display::{colors, LightFrame, LightInfo};
use crate::layer::Layer;
use crate::model::Model;
use crate::surface::ButtonId;

/// Sub-state of the drum view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrumMode {
    /// Pads play their note and select the voice
    #[default]
    Play,
    /// Pads only select the voice
    StepEdit,
}

#[derive(Debug)]
pub struct DrumView {
    mode: DrumMode,
    selected_pad: usize,
    resolution_index: usize,
    step_page: u32,
    held_pads: Vec<(usize, u8)>,
}

impl Default for DrumView {
    fn default() -> Self {
        Self::new()
    }
}

impl DrumView {
    pub fn new() -> Self {
        Self {
            mode: DrumMode::Play,
            selected_pad: 0,
            resolution_index: DEFAULT_RESOLUTION,
            step_page: 0,
            held_pads: Vec::new(),
        }
    }

    pub fn mode(&self) -> DrumMode {
        self.mode
    }

    pub fn step_page(&self) -> u32 {
        self.step_page
    }

    fn step_rows(model: &Model) -> usize {
        model.layout().grid_rows / 2
    }

    fn steps_per_page(model: &Model) -> u32 {
        (Self::step_rows(model) * model.layout().grid_cols) as u32
    }

    /// Step shown on a grid index, if the index is in the step area
    fn step_at(&self, index: usize, model: &Model) -> Option<u32> {
        let layout = model.layout();
        let row = index / layout.grid_cols;
        let col = index % layout.grid_cols;
        let first_step_row = layout.grid_rows - Self::step_rows(model);
        if row < first_step_row || row >= layout.grid_rows {
            return None;
        }
        let line = layout.grid_rows - 1 - row;
        Some(self.step_page * Self::steps_per_page(model) + (line * layout.grid_cols + col) as u32)
    }

    fn selected_note(&self, model: &Model) -> Option<u8> {
        model.keys.map_drum(self.selected_pad)
    }

    fn current_step(model: &Model) -> Option<u32> {
        let transport = &model.session.transport;
        let clip = &model.session.clip;
        if !transport.playing || clip.step_length <= 0.0 || clip.length == 0 {
            return None;
        }
        Some((transport.position / clip.step_length).floor() as u32 % clip.length)
    }
}

impl Layer<Model> for DrumView {
    fn on_activate(&mut self, model: &mut Model) {
        model.update_note_mapping();
        let (length, _) = RESOLUTIONS[self.resolution_index];
        if model.session.clip.step_length != length {
            model.session.set_step_length(length);
        }
    }

    fn on_deactivate(&mut self, model: &mut Model) {
        for (_, note) in self.held_pads.drain(..) {
            model.note_input(note, 0);
        }
    }
}

impl View for DrumView {
    fn on_grid_note(&mut self, index: usize, velocity: u8, model: &mut Model) {
        if let Some(step) = self.step_at(index, model) {
            if velocity == 0 || step >= model.session.clip.length {
                return;
            }
            if let Some(note) = self.selected_note(model) {
                model.session.toggle_step(step, note, velocity);
            }
            return;
        }
        let Some(note) = model.keys.map_drum(index) else {
            return;
        };
        if velocity > 0 {
            self.selected_pad = index;
            if self.mode == DrumMode::Play {
                self.held_pads.push((index, note));
                model.note_input(note, velocity);
            }
        } else if let Some(i) = self.held_pads.iter().position(|(pad, _)| *pad == index) {
            let (_, note) = self.held_pads.remove(i);
            model.note_input(note, 0);
        }
    }

    fn draw_grid(&self, model: &Model, lights: &mut LightFrame) {
        let color = track_color(model);
        let clip = &model.session.clip;
        let selected_note = self.selected_note(model);
        let playing_step = Self::current_step(model);

        for index in 0..model.layout().grid_size() {
            let light = if let Some(step) = self.step_at(index, model) {
                let set = selected_note.and_then(|n| clip.step(step, n)).is_some();
                if step >= clip.length {
                    LightInfo::OFF
                } else if playing_step == Some(step) {
                    LightInfo::solid(colors::GREEN)
                } else if set {
                    LightInfo::solid(color)
                } else {
                    LightInfo::solid(colors::DARK_GRAY)
                }
            } else if let Some(note) = model.keys.map_drum(index) {
                if model.keys.is_key_pressed(note) {
                    LightInfo::solid(colors::GREEN)
                } else if index == self.selected_pad {
                    match self.mode {
                        DrumMode::Play => LightInfo::solid(colors::WHITE),
                        DrumMode::StepEdit => {
                            LightInfo::blinking(colors::WHITE, colors::ORANGE, false)
                        }
                    }
                } else if clip.iter().any(|((_, n), _)| n == note) {
                    LightInfo::solid(color)
                } else {
                    LightInfo::solid(colors::GRAY)
                }
            } else {
                LightInfo::OFF
            };
            lights.set_pad(index, light);
        }
    }

    fn update_buttons(&self, model: &Model, lights: &mut LightFrame) {
        let step_edit = match self.mode {
            DrumMode::Play => colors::GRAY,
            DrumMode::StepEdit => colors::ORANGE,
        };
        lights.set_button(ButtonId::StepEdit, step_edit);
        lights.set_button(ButtonId::OctaveUp, colors::WHITE);
        lights.set_button(ButtonId::OctaveDown, colors::WHITE);

        let pages = model.session.clip.length.div_ceil(Self::steps_per_page(model).max(1));
        for i in 0..model.layout().scene_buttons.min(pages as usize) {
            let color = if i as u32 == self.step_page {
                colors::GREEN
            } else {
                colors::DARK_GRAY
            };
            lights.set_button(ButtonId::Scene(i as u8), color);
        }
    }

    fn on_scene_button(&mut self, index: usize, event: ButtonEvent, model: &mut Model) {
        if event != ButtonEvent::Down {
            return;
        }
        let page = index as u32;
        if page * Self::steps_per_page(model) < model.session.clip.length {
            self.step_page = page;
        }
    }

    fn pad_note(&self, index: usize, model: &Model) -> Option<u8> {
        model.keys.map_drum(index)
    }

    fn as_sequencer(&mut self) -> Option<&mut dyn SequencerCapable> {
        Some(self)
    }

    fn as_transposable(&mut self) -> Option<&mut dyn Transposable> {
        Some(self)
    }

    fn as_drum_pads(&mut self) -> Option<&mut dyn DrumPads> {
        Some(self)
    }
}

impl SequencerCapable for DrumView {
    fn resolution_index(&self) -> usize {
        self.resolution_index
    }

    fn set_resolution_index(&mut self, index: usize, model: &mut Model) {
        let index = index.min(RESOLUTIONS.len() - 1);
        if index == self.resolution_index {
            return;
        }
        self.resolution_index = index;
        let (length, name) = RESOLUTIONS[index];
        model.session.set_step_length(length);
        model.notify(format!("Resolution: {}", name));
    }

    fn scroll_steps(&mut self, pages: i32, model: &mut Model) -> bool {
        let per_page = Self::steps_per_page(model).max(1);
        let last_page = model.session.clip.length.saturating_sub(1) / per_page;
        let page = (self.step_page as i64 + pages as i64).clamp(0, last_page as i64) as u32;
        let moved = page != self.step_page;
        self.step_page = page;
        moved
    }
}

/// Octave buttons move the drum bank.
impl Transposable for DrumView {
    fn octave_up(&mut self, model: &mut Model) -> bool {
        if !model.scales.change_drum_bank(1) {
            return false;
        }
        model.update_note_mapping();
        model.notify(format!("Drum bank {}", model.scales.drum_bank + 1));
        true
    }

    fn octave_down(&mut self, model: &mut Model) -> bool {
        if !model.scales.change_drum_bank(-1) {
            return false;
        }
        model.update_note_mapping();
        model.notify(format!("Drum bank {}", model.scales.drum_bank + 1));
        true
    }
}

impl DrumPads for DrumView {
    fn selected_pad(&self) -> usize {
        self.selected_pad
    }

    fn toggle_step_edit(&mut self, model: &mut Model) {
        self.mode = match self.mode {
            DrumMode::Play => DrumMode::StepEdit,
            DrumMode::StepEdit => DrumMode::Play,
        };
        log::debug!("[DRUM] Sub-mode {:?}", self.mode);
        model.request_refresh();
    }
}
