use super::Mode;
use crate::command::ButtonEvent;
use crate::display::{colors, LightFrame, LightId, TextFrame};
use crate::layer::Layer;
use crate::model::Model;
use crate::scales::{pitch_class_name, Scale, OCTAVE_RANGE};
use crate::surface::ButtonId;
use crate::value::KnobInput;

/// Scale, base note, octave and in-key layout of the pad grid.
///
/// Every change rebuilds the pad translation and is written to the
/// preferences.
#[derive(Debug, Default)]
pub struct ScaleMode;

impl ScaleMode {
    pub fn new() -> Self {
        Self
    }

    fn apply(model: &mut Model, change: ScaleChange) {
        let scales = &mut model.scales;
        let changed = match change {
            ScaleChange::Scale(steps) => scales.change_scale(steps),
            ScaleChange::Base(semitones) => {
                scales.change_base(semitones);
                semitones % 12 != 0
            }
            ScaleChange::Octave(delta) => scales.change_octave(delta),
            ScaleChange::InKey(in_key) => {
                let changed = scales.in_key != in_key;
                scales.in_key = in_key;
                changed
            }
        };
        if !changed {
            return;
        }
        model.update_note_mapping();
        model.persist_scales();
        log::debug!("[SCALES] {}", model.scales.describe());
    }

    fn relative_change(index: usize, direction: i32) -> Option<ScaleChange> {
        if direction == 0 {
            return None;
        }
        match index {
            0 => Some(ScaleChange::Scale(direction)),
            1 => Some(ScaleChange::Base(direction)),
            2 => Some(ScaleChange::Octave(direction as i8)),
            3 => Some(ScaleChange::InKey(direction > 0)),
            _ => None,
        }
    }

    /// Knob position mapped across each list, as a step from the current entry.
    fn absolute_change(index: usize, value: f64, model: &Model) -> Option<ScaleChange> {
        let scales = &model.scales;
        let input = KnobInput::Absolute(value);
        let change = match index {
            0 => {
                let current = scales.scale.position() as i32;
                let last = Scale::ALL.len() as i32 - 1;
                ScaleChange::Scale(input.apply_range(current, 0, last, 1.0) - current)
            }
            1 => {
                let current = scales.base as i32;
                ScaleChange::Base(input.apply_range(current, 0, 11, 1.0) - current)
            }
            2 => {
                let current = scales.octave as i32;
                let (min, max) = (*OCTAVE_RANGE.start() as i32, *OCTAVE_RANGE.end() as i32);
                ScaleChange::Octave((input.apply_range(current, min, max, 1.0) - current) as i8)
            }
            3 => ScaleChange::InKey(value >= 0.5),
            _ => return None,
        };
        Some(change)
    }
}

#[derive(Debug, Clone, Copy)]
enum ScaleChange {
    Scale(i32),
    Base(i32),
    Octave(i8),
    InKey(bool),
}

impl Layer<Model> for ScaleMode {}

impl Mode for ScaleMode {
    fn name(&self) -> String {
        "Scales".to_string()
    }

    fn on_knob_value(&mut self, index: usize, input: KnobInput, model: &mut Model) {
        let change = match input {
            KnobInput::Absolute(value) => Self::absolute_change(index, value, model),
            KnobInput::Delta(_) => Self::relative_change(index, input.direction()),
        };
        if let Some(change) = change {
            Self::apply(model, change);
        }
    }

    fn on_row_button(&mut self, row: usize, index: usize, event: ButtonEvent, model: &mut Model) {
        if event != ButtonEvent::Down || row != 0 {
            return;
        }
        let change = match index {
            0 => ScaleChange::Scale(-1),
            1 => ScaleChange::Scale(1),
            2 => ScaleChange::Base(-1),
            3 => ScaleChange::Base(1),
            4 => ScaleChange::Octave(-1),
            5 => ScaleChange::Octave(1),
            6 => ScaleChange::InKey(!model.scales.in_key),
            _ => return,
        };
        Self::apply(model, change);
    }

    fn update_display(&self, model: &Model, text: &mut TextFrame) {
        let scales = &model.scales;
        text.set(0, 0, "Scale");
        text.set(1, 0, scales.scale.name());
        text.set(0, 1, "Base");
        text.set(1, 1, pitch_class_name(scales.base));
        text.set(0, 2, "Octave");
        text.set(1, 2, &format!("{:+}", scales.octave));
        text.set(0, 3, "Layout");
        text.set(1, 3, if scales.in_key { "In Key" } else { "Chromat." });
    }

    fn update_row_buttons(&self, model: &Model, lights: &mut LightFrame) {
        for i in 0..6u8 {
            lights.set_color(LightId::Button(ButtonId::Row1(i)), colors::GRAY);
        }
        let in_key = if model.scales.in_key {
            colors::GREEN
        } else {
            colors::DARK_GRAY
        };
        lights.set_color(LightId::Button(ButtonId::Row1(6)), in_key);
    }
}
