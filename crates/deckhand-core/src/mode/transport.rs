use super::Mode;
use crate::command::ButtonEvent;
use crate::display::{colors, LightFrame, LightId, TextFrame};
use crate::layer::Layer;
use crate::model::Model;
use crate::session::{MAX_TEMPO, MIN_TEMPO};
use crate::settings::RibbonMode;
use crate::surface::ButtonId;
use crate::value::{KnobInput, DEFAULT_SENSITIVITY};

/// Lower-row button that toggles accent
const ACCENT_BUTTON: usize = 7;

/// Transport and play preferences.
///
/// Knob 0 changes the tempo, knob 1 moves the play position. The upper row
/// holds play/stop/record/metronome, the lower row picks the ribbon mode and
/// toggles accent.
#[derive(Debug, Default)]
pub struct TransportMode;

impl TransportMode {
    pub fn new() -> Self {
        Self
    }
}

impl Layer<Model> for TransportMode {}

impl Mode for TransportMode {
    fn name(&self) -> String {
        "Transport".to_string()
    }

    fn on_knob_value(&mut self, index: usize, input: KnobInput, model: &mut Model) {
        let step = if model.is_fine() { 0.1 } else { 1.0 };
        match index {
            0 => {
                let tempo = match input {
                    KnobInput::Absolute(v) => MIN_TEMPO + v * (MAX_TEMPO - MIN_TEMPO),
                    KnobInput::Delta(d) => {
                        model.session.transport.tempo + (d / DEFAULT_SENSITIVITY).round() * step
                    }
                };
                model.session.set_tempo(tempo);
            }
            1 => {
                if let KnobInput::Delta(d) = input {
                    let beats = (d / DEFAULT_SENSITIVITY).round() * step;
                    let position = model.session.transport.position + beats;
                    model.session.set_position(position);
                }
            }
            _ => {}
        }
    }

    fn on_row_button(&mut self, row: usize, index: usize, event: ButtonEvent, model: &mut Model) {
        if event != ButtonEvent::Down {
            return;
        }
        if row == 0 {
            match index {
                0 => model.session.toggle_play(),
                1 => model.session.stop(),
                2 => model.session.toggle_record(),
                3 => model.session.toggle_metronome(),
                _ => {}
            }
            return;
        }
        if index == ACCENT_BUTTON {
            model.preferences.accent = !model.preferences.accent;
            let state = if model.preferences.accent { "On" } else { "Off" };
            model.notify(format!("Accent: {}", state));
        } else if let Some(mode) = RibbonMode::ALL.get(index) {
            model.preferences.ribbon_mode = *mode;
            model.notify(format!("Ribbon: {}", mode.as_str()));
        } else {
            return;
        }
        model.persist_preferences();
    }

    fn update_display(&self, model: &Model, text: &mut TextFrame) {
        let transport = &model.session.transport;
        text.set(0, 0, "Tempo");
        text.set(1, 0, &format!("{:.2}", transport.tempo));
        text.set(0, 1, "Position");
        let bar = (transport.position / 4.0).floor() as i64 + 1;
        let beat = (transport.position % 4.0).floor() as i64 + 1;
        text.set(1, 1, &format!("{}.{}", bar, beat));
        text.set(0, 2, "Ribbon");
        text.set(1, 2, model.preferences.ribbon_mode.as_str());
        text.set(0, 3, "Accent");
        let accent = if model.preferences.accent {
            model.preferences.accent_velocity.to_string()
        } else {
            "Off".to_string()
        };
        text.set(1, 3, &accent);
    }

    fn update_row_buttons(&self, model: &Model, lights: &mut LightFrame) {
        let transport = &model.session.transport;
        let upper = [
            if transport.playing { colors::GREEN } else { colors::DARK_GRAY },
            colors::GRAY,
            if transport.recording { colors::RED } else { colors::DARK_GRAY },
            if transport.metronome { colors::YELLOW } else { colors::DARK_GRAY },
        ];
        for (i, color) in upper.into_iter().enumerate() {
            lights.set_color(LightId::Button(ButtonId::Row1(i as u8)), color);
        }
        for (i, mode) in RibbonMode::ALL.iter().enumerate() {
            let color = if *mode == model.preferences.ribbon_mode {
                colors::CYAN
            } else {
                colors::DARK_GRAY
            };
            lights.set_color(LightId::Button(ButtonId::Row2(i as u8)), color);
        }
        let accent = if model.preferences.accent {
            colors::ORANGE
        } else {
            colors::DARK_GRAY
        };
        lights.set_color(LightId::Button(ButtonId::Row2(ACCENT_BUTTON as u8)), accent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::model_with_tracks;
    use crate::settings::{keys, SettingValue};

    #[test]
    fn test_tempo_knob() {
        let mut model = model_with_tracks(1);
        let mut mode = TransportMode::new();
        mode.on_knob_value(0, KnobInput::Delta(3.0 * DEFAULT_SENSITIVITY), &mut model);
        assert_eq!(model.session.transport.tempo, 123.0);
        mode.on_knob_value(0, KnobInput::Absolute(1.0), &mut model);
        assert_eq!(model.session.transport.tempo, MAX_TEMPO);
        mode.on_knob_value(0, KnobInput::Delta(-1.0), &mut model);
        assert_eq!(model.session.transport.tempo, 538.0);
    }

    #[test]
    fn test_ribbon_mode_persisted() {
        let mut model = model_with_tracks(1);
        let mut mode = TransportMode::new();
        mode.on_row_button(1, 2, ButtonEvent::Down, &mut model);
        assert_eq!(model.preferences.ribbon_mode, RibbonMode::Cc11);
        assert_eq!(
            model.settings.get(keys::RIBBON_MODE),
            Some(SettingValue::Text("cc11".to_string()))
        );
        mode.on_row_button(1, ACCENT_BUTTON, ButtonEvent::Down, &mut model);
        assert!(model.preferences.accent);
        assert_eq!(model.notification(), Some("Accent: On"));
    }

    #[test]
    fn test_position_display() {
        let mut model = model_with_tracks(1);
        model.session.transport.position = 9.0;
        let mut text = model.layout().blank_text();
        TransportMode::new().update_display(&model, &mut text);
        assert_eq!(text.cell(1, 1), "3.2");
        assert_eq!(text.cell(1, 0), "120.00");
    }
}
