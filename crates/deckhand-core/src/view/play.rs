use super::{pad_color, track_color, Transposable, View};
use crate::display::{colors, LightFrame, LightInfo};
use crate::layer::Layer;
use crate::model::Model;
use crate::scales::OCTAVE_RANGE;
use crate::surface::ButtonId;
use std::collections::HashMap;

/// Melodic play through the key translation table.
///
/// Remembers which note each pad started so the release reaches the same
/// note even when the layout changed while the pad was held.
#[derive(Debug, Default)]
pub struct PlayView {
    pad_notes: HashMap<usize, u8>,
}

impl PlayView {
    pub fn new() -> Self {
        Self::default()
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

impl Layer<Model> for PlayView {
    fn on_activate(&mut self, model: &mut Model) {
        model.update_note_mapping();
    }

    fn on_deactivate(&mut self, model: &mut Model) {
        for (_, note) in self.pad_notes.drain() {
            model.note_input(note, 0);
        }
    }
}

impl View for PlayView {
    fn on_grid_note(&mut self, index: usize, velocity: u8, model: &mut Model) {
        if velocity > 0 {
            let Some(note) = model.keys.map(index) else {
                return;
            };
            if let Some(previous) = self.pad_notes.insert(index, note) {
                model.note_input(previous, 0);
            }
            model.note_input(note, velocity);
        } else if let Some(note) = self.pad_notes.remove(&index) {
            model.note_input(note, 0);
        }
    }

    fn draw_grid(&self, model: &Model, lights: &mut LightFrame) {
        let color = track_color(model);
        for index in 0..model.layout().grid_size() {
            let state = model.keys.pad_state(index, &model.scales);
            lights.set_pad(index, LightInfo::solid(pad_color(state, color)));
        }
    }

    fn update_buttons(&self, model: &Model, lights: &mut LightFrame) {
        let octave = model.scales.octave;
        let up = if octave < *OCTAVE_RANGE.end() { colors::WHITE } else { colors::OFF };
        let down = if octave > *OCTAVE_RANGE.start() { colors::WHITE } else { colors::OFF };
        lights.set_button(ButtonId::OctaveUp, up);
        lights.set_button(ButtonId::OctaveDown, down);
    }

    fn pad_note(&self, index: usize, model: &Model) -> Option<u8> {
        self.pad_notes.get(&index).copied().or_else(|| model.keys.map(index))
    }

    fn as_transposable(&mut self) -> Option<&mut dyn Transposable> {
        Some(self)
    }
}

impl Transposable for PlayView {
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
    use crate::session::SessionChange;

    #[test]
    fn test_release_uses_pressed_note() {
        let mut model = model_with_tracks(1);
        let mut view = PlayView::new();
        view.on_activate(&mut model);

        view.on_grid_note(0, 100, &mut model);
        assert!(view.octave_up(&mut model));
        assert_eq!(view.pad_note(0, &model), Some(48));
        view.on_grid_note(0, 0, &mut model);

        assert_eq!(
            model.session.drain_changes(),
            vec![
                SessionChange::NoteOn { note: 48, velocity: 100 },
                SessionChange::NoteOff { note: 48 },
            ]
        );
        assert_eq!(view.pad_note(0, &model), Some(60));
    }

    #[test]
    fn test_pressed_pad_highlighted() {
        let mut model = model_with_tracks(1);
        let mut view = PlayView::new();
        view.on_grid_note(1, 90, &mut model);

        let mut lights = model.layout().blank_lights();
        view.draw_grid(&model, &mut lights);
        assert_eq!(lights.get(LightId::Pad(1)), Some(LightInfo::solid(colors::GREEN)));
        assert_eq!(lights.get(LightId::Pad(2)), Some(LightInfo::solid(colors::WHITE)));

        view.on_deactivate(&mut model);
        assert!(!model.keys.is_key_pressed(50));
    }

    #[test]
    fn test_octave_limits() {
        let mut model = model_with_tracks(1);
        let mut view = PlayView::new();
        for _ in 0..3 {
            assert!(view.octave_down(&mut model));
        }
        assert!(!view.octave_down(&mut model));
        let mut lights = model.layout().blank_lights();
        view.update_buttons(&model, &mut lights);
        assert_eq!(lights.get(LightId::Button(ButtonId::OctaveDown)), Some(LightInfo::OFF));
    }
}
