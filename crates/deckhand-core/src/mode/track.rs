use super::{format_pan, format_percent, format_volume, set_ring, BankNavigable, Mode};
use crate::command::ButtonEvent;
use crate::display::{colors, LightFrame, LightId, TextFrame};
use crate::layer::Layer;
use crate::model::Model;
use crate::surface::ButtonId;
use crate::value::KnobInput;

/// Mixer channel of the selected track: volume, pan, then one knob per send
/// of the send bank page.
#[derive(Debug, Default)]
pub struct TrackMode;

impl TrackMode {
    pub fn new() -> Self {
        Self
    }
}

impl Layer<Model> for TrackMode {
    fn on_activate(&mut self, model: &mut Model) {
        if model.selected_track().is_none() {
            model.notify("Please select a Track...");
        }
    }
}

impl Mode for TrackMode {
    fn name(&self) -> String {
        "Track".to_string()
    }

    fn on_knob_value(&mut self, index: usize, input: KnobInput, model: &mut Model) {
        let Some(position) = model.selected_track() else {
            return;
        };
        let Some(track) = model.session.tracks.get(position) else {
            return;
        };
        match index {
            0 => {
                let value = input.apply(track.volume);
                model.session.set_track_volume(position, value);
            }
            1 => {
                let value = input.apply(track.pan);
                model.session.set_track_pan(position, value);
            }
            _ => {
                let send = model.send_bank.item(&track.sends, index - 2);
                let Some(level) = send.get().copied() else {
                    return;
                };
                let send = send.position();
                model.session.set_track_send(position, send, input.apply(level));
            }
        }
    }

    fn on_row_button(&mut self, row: usize, index: usize, event: ButtonEvent, model: &mut Model) {
        if event != ButtonEvent::Down {
            return;
        }
        if row == 1 {
            model.track_bank.select_item(index);
            return;
        }
        let Some(position) = model.selected_track() else {
            return;
        };
        match index {
            0 => model.session.toggle_mute(position),
            1 => model.session.toggle_solo(position),
            2 => model.session.toggle_arm(position),
            _ => {}
        }
    }

    fn update_display(&self, model: &Model, text: &mut TextFrame) {
        let Some(track) = model.selected_track().and_then(|t| model.session.tracks.get(t)) else {
            text.set_line(0, "Please select a Track...");
            return;
        };
        text.set(0, 0, "Volume");
        text.set(1, 0, &format_volume(track.volume));
        text.set(0, 1, "Pan");
        text.set(1, 1, &format_pan(track.pan));
        for slot in model.send_bank.items(&track.sends) {
            let cell = slot.index() + 2;
            if let Some(level) = slot.get() {
                text.set(0, cell, &format!("Send {}", slot.position() + 1));
                text.set(1, cell, &format_percent(*level));
            }
        }
    }

    fn update_knob_leds(&self, model: &Model, lights: &mut LightFrame) {
        let track = model.selected_track().and_then(|t| model.session.tracks.get(t));
        set_ring(lights, 0, track.map(|t| t.volume));
        set_ring(lights, 1, track.map(|t| t.pan));
        let Some(track) = track else {
            return;
        };
        for slot in model.send_bank.items(&track.sends) {
            set_ring(lights, slot.index() + 2, slot.get().copied());
        }
    }

    fn update_row_buttons(&self, model: &Model, lights: &mut LightFrame) {
        if let Some(track) = model.selected_track().and_then(|t| model.session.tracks.get(t)) {
            let states = [
                (track.mute, colors::YELLOW),
                (track.solo, colors::BLUE),
                (track.arm, colors::RED),
            ];
            for (i, (on, color)) in states.into_iter().enumerate() {
                let color = if on { color } else { colors::DARK_GRAY };
                lights.set_color(LightId::Button(ButtonId::Row1(i as u8)), color);
            }
        }
        let selected = model.track_bank.selected_index();
        for slot in model.track_bank.items(&model.session.tracks) {
            if let Some(track) = slot.get() {
                let color = if selected == Some(slot.index()) {
                    colors::WHITE
                } else {
                    track.color
                };
                lights.set_color(LightId::Button(ButtonId::Row2(slot.index() as u8)), color);
            }
        }
    }

    fn as_bank_navigable(&mut self) -> Option<&mut dyn BankNavigable> {
        Some(self)
    }

    fn as_bank_navigable_ref(&self) -> Option<&dyn BankNavigable> {
        Some(self)
    }
}

/// Left/right walk through the sends; with shift they page.
impl BankNavigable for TrackMode {
    fn can_select_previous(&self, model: &Model) -> bool {
        model.send_bank.can_scroll_backwards()
    }

    fn can_select_next(&self, model: &Model) -> bool {
        model.send_bank.can_scroll_forwards()
    }

    fn select_previous(&mut self, model: &mut Model, _page: bool) -> bool {
        model.send_bank.select_previous_page()
    }

    fn select_next(&mut self, model: &mut Model, _page: bool) -> bool {
        model.send_bank.select_next_page()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::model_with_tracks;
    use crate::session::SessionChange;

    #[test]
    fn test_knobs_edit_selected_track() {
        let mut model = model_with_tracks(3);
        let mut mode = TrackMode::new();
        mode.on_knob_value(0, KnobInput::Absolute(0.2), &mut model);
        assert!(model.session.drain_changes().is_empty());

        model.track_bank.select(1);
        mode.on_knob_value(1, KnobInput::Absolute(0.0), &mut model);
        mode.on_knob_value(3, KnobInput::Absolute(0.5), &mut model);
        mode.on_knob_value(7, KnobInput::Absolute(0.5), &mut model);
        assert_eq!(
            model.session.drain_changes(),
            vec![
                SessionChange::TrackPan { track: 1, value: 0.0 },
                SessionChange::TrackSend { track: 1, send: 1, value: 0.5 },
            ]
        );
    }

    #[test]
    fn test_no_track_prompts() {
        let mut model = model_with_tracks(3);
        let mut mode = TrackMode::new();
        mode.on_activate(&mut model);
        assert_eq!(model.notification(), Some("Please select a Track..."));
        let mut text = model.layout().blank_text();
        mode.update_display(&model, &mut text);
        assert_eq!(text.cell(0, 0), "Please s");
    }
}
