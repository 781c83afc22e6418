use super::{track_color, SequencerCapable, Transposable, View, DEFAULT_RESOLUTION, RESOLUTIONS};
use crate::display::{colors, LightFrame, LightInfo};
use crate::layer::Layer;
use crate::model::Model;
use crate::surface::ButtonId;

/// Melodic step sequencer: columns are steps, rows are scale degrees from
/// the current root (bottom row = root).
#[derive(Debug)]
pub struct SequencerView {
    resolution_index: usize,
    step_page: u32,
}

impl Default for SequencerView {
    fn default() -> Self {
        Self::new()
    }
}

impl SequencerView {
    pub fn new() -> Self {
        Self {
            resolution_index: DEFAULT_RESOLUTION,
            step_page: 0,
        }
    }

    pub fn step_page(&self) -> u32 {
        self.step_page
    }

    fn cell(&self, index: usize, model: &Model) -> Option<(u32, u8)> {
        let cols = model.layout().grid_cols;
        let row = index / cols;
        let col = index % cols;
        let note = model.scales.degree_note(row)?;
        Some((self.step_page * cols as u32 + col as u32, note))
    }

    fn shift_octave(&mut self, model: &mut Model, delta: i8) -> bool {
        if !model.scales.change_octave(delta) {
            return false;
        }
        model.update_note_mapping();
        model.notify(format!("Octave {:+}", model.scales.octave));
        true
    }
}

impl Layer<Model> for SequencerView {
    fn on_activate(&mut self, model: &mut Model) {
        let (length, _) = RESOLUTIONS[self.resolution_index];
        if model.session.clip.step_length != length {
            model.session.set_step_length(length);
        }
    }
}

impl View for SequencerView {
    fn on_grid_note(&mut self, index: usize, velocity: u8, model: &mut Model) {
        if velocity == 0 {
            return;
        }
        let Some((step, note)) = self.cell(index, model) else {
            return;
        };
        if step < model.session.clip.length {
            model.session.toggle_step(step, note, velocity);
        }
    }

    fn draw_grid(&self, model: &Model, lights: &mut LightFrame) {
        let color = track_color(model);
        let clip = &model.session.clip;
        let transport = &model.session.transport;
        let playing_step = (transport.playing && clip.step_length > 0.0 && clip.length > 0)
            .then(|| (transport.position / clip.step_length).floor() as u32 % clip.length);

        for index in 0..model.layout().grid_size() {
            let light = match self.cell(index, model) {
                Some((step, _)) if step >= clip.length => LightInfo::OFF,
                Some((step, note)) => {
                    let set = clip.step(step, note).is_some();
                    if set {
                        LightInfo::solid(color)
                    } else if playing_step == Some(step) {
                        LightInfo::solid(colors::GRAY)
                    } else if model.scales.is_tonic(note) {
                        LightInfo::solid(colors::DARK_GRAY)
                    } else {
                        LightInfo::OFF
                    }
                }
                None => LightInfo::OFF,
            };
            lights.set_pad(index, light);
        }
    }

    fn update_buttons(&self, _model: &Model, lights: &mut LightFrame) {
        lights.set_button(ButtonId::OctaveUp, colors::WHITE);
        lights.set_button(ButtonId::OctaveDown, colors::WHITE);
    }

    fn as_sequencer(&mut self) -> Option<&mut dyn SequencerCapable> {
        Some(self)
    }

    fn as_transposable(&mut self) -> Option<&mut dyn Transposable> {
        Some(self)
    }
}

impl SequencerCapable for SequencerView {
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
        let per_page = model.layout().grid_cols.max(1) as u32;
        let last_page = model.session.clip.length.saturating_sub(1) / per_page;
        let page = (self.step_page as i64 + pages as i64).clamp(0, last_page as i64) as u32;
        let moved = page != self.step_page;
        self.step_page = page;
        moved
    }
}

impl Transposable for SequencerView {
    fn octave_up(&mut self, model: &mut Model) -> bool {
        self.shift_octave(model, 1)
    }

    fn octave_down(&mut self, model: &mut Model) -> bool {
        self.shift_octave(model, -1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::LightId;
    use crate::model::tests::model_with_tracks;

    #[test]
    fn test_rows_are_scale_degrees() {
        let mut model = model_with_tracks(1);
        let mut view = SequencerView::new();
        // row 2, column 3: third degree of C major at step 3
        view.on_grid_note(2 * 8 + 3, 100, &mut model);
        assert_eq!(model.session.clip.step(3, 52), Some(100));

        view.scroll_steps(1, &mut model);
        view.on_grid_note(0, 80, &mut model);
        assert_eq!(model.session.clip.step(8, 48), Some(80));
    }

    #[test]
    fn test_draw_marks_set_steps_and_tonic_rows() {
        let mut model = model_with_tracks(1);
        let mut view = SequencerView::new();
        view.on_grid_note(9, 100, &mut model);
        let mut lights = model.layout().blank_lights();
        view.draw_grid(&model, &mut lights);
        assert_eq!(lights.get(LightId::Pad(9)), Some(LightInfo::solid(colors::WHITE)));
        assert_eq!(lights.get(LightId::Pad(0)), Some(LightInfo::solid(colors::DARK_GRAY)));
        assert_eq!(lights.get(LightId::Pad(8)), Some(LightInfo::OFF));
        // row 7 is the octave above the root
        assert_eq!(lights.get(LightId::Pad(56)), Some(LightInfo::solid(colors::DARK_GRAY)));
    }

    #[test]
    fn test_octave_shifts_rows() {
        let mut model = model_with_tracks(1);
        let mut view = SequencerView::new();
        assert!(view.octave_up(&mut model));
        view.on_grid_note(0, 100, &mut model);
        assert_eq!(model.session.clip.step(0, 60), Some(100));
    }
}
