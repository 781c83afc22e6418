//! One mixer property of every track in the track bank.

use super::{format_pan, format_percent, format_volume, set_ring, BankNavigable, Mode};
use crate::command::ButtonEvent;
use crate::display::{colors, LightFrame, LightId, TextFrame};
use crate::layer::Layer;
use crate::model::Model;
use crate::session::Track;
use crate::surface::ButtonId;
use crate::value::KnobInput;

/// The track property a [`TrackParamMode`] edits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackProperty {
    Volume,
    Pan,
    Send(u8),
}

impl TrackProperty {
    fn value(self, track: &Track) -> Option<f64> {
        match self {
            TrackProperty::Volume => Some(track.volume),
            TrackProperty::Pan => Some(track.pan),
            TrackProperty::Send(n) => track.sends.get(n as usize).copied(),
        }
    }

    fn default_value(self) -> f64 {
        match self {
            TrackProperty::Volume => 0.79,
            TrackProperty::Pan => 0.5,
            TrackProperty::Send(_) => 0.0,
        }
    }

    fn format(self, value: f64) -> String {
        match self {
            TrackProperty::Volume => format_volume(value),
            TrackProperty::Pan => format_pan(value),
            TrackProperty::Send(_) => format_percent(value),
        }
    }

    fn set(self, model: &mut Model, track: usize, value: f64) {
        match self {
            TrackProperty::Volume => model.session.set_track_volume(track, value),
            TrackProperty::Pan => model.session.set_track_pan(track, value),
            TrackProperty::Send(n) => model.session.set_track_send(track, n as usize, value),
        }
    }
}

/// Knob `i` edits the property of track slot `i` of the track bank.
///
/// Upper row selects tracks, lower row toggles mute (solo with shift).
#[derive(Debug)]
pub struct TrackParamMode {
    property: TrackProperty,
}

impl TrackParamMode {
    pub fn new(property: TrackProperty) -> Self {
        Self { property }
    }

    pub fn property(&self) -> TrackProperty {
        self.property
    }
}

impl Layer<Model> for TrackParamMode {
    fn on_activate(&mut self, model: &mut Model) {
        if let TrackProperty::Send(n) = self.property {
            let has_send = model
                .session
                .tracks
                .iter()
                .any(|t| t.sends.len() > n as usize);
            if !has_send {
                model.notify(format!("No Send {}", n + 1));
            }
        }
    }
}

impl Mode for TrackParamMode {
    fn name(&self) -> String {
        match self.property {
            TrackProperty::Volume => "Volume".to_string(),
            TrackProperty::Pan => "Pan".to_string(),
            TrackProperty::Send(n) => format!("Send {}", n + 1),
        }
    }

    fn on_knob_value(&mut self, index: usize, input: KnobInput, model: &mut Model) {
        let slot = model.track_bank.item(&model.session.tracks, index);
        let Some(current) = slot.get().and_then(|t| self.property.value(t)) else {
            return;
        };
        let position = slot.position();
        self.property.set(model, position, input.apply(current));
    }

    fn on_knob_touch(&mut self, index: usize, touched: bool, model: &mut Model) {
        // shift + touch resets to the default value
        if !touched || !model.is_shift() {
            return;
        }
        let slot = model.track_bank.item(&model.session.tracks, index);
        if slot.get().and_then(|t| self.property.value(t)).is_none() {
            return;
        }
        let position = slot.position();
        self.property.set(model, position, self.property.default_value());
    }

    fn on_row_button(&mut self, row: usize, index: usize, event: ButtonEvent, model: &mut Model) {
        if event != ButtonEvent::Down {
            return;
        }
        let slot = model.track_bank.item(&model.session.tracks, index);
        if !slot.exists() {
            return;
        }
        let position = slot.position();
        match row {
            0 => {
                model.track_bank.select_item(index);
            }
            _ if model.is_shift() => model.session.toggle_solo(position),
            _ => model.session.toggle_mute(position),
        }
    }

    fn update_display(&self, model: &Model, text: &mut TextFrame) {
        for slot in model.track_bank.items(&model.session.tracks) {
            let Some(track) = slot.get() else {
                continue;
            };
            let value = self
                .property
                .value(track)
                .map(|v| self.property.format(v))
                .unwrap_or_default();
            text.set(0, slot.index(), &value);
            text.set(1, slot.index(), &track.name);
        }
    }

    fn update_knob_leds(&self, model: &Model, lights: &mut LightFrame) {
        for slot in model.track_bank.items(&model.session.tracks) {
            let value = slot.get().and_then(|t| self.property.value(t));
            set_ring(lights, slot.index(), value);
        }
    }

    fn update_row_buttons(&self, model: &Model, lights: &mut LightFrame) {
        let selected = model.track_bank.selected_index();
        for slot in model.track_bank.items(&model.session.tracks) {
            let i = slot.index() as u8;
            let Some(track) = slot.get() else {
                continue;
            };
            let upper = if selected == Some(slot.index()) {
                colors::WHITE
            } else {
                track.color
            };
            let lower = if model.is_shift() {
                if track.solo {
                    colors::BLUE
                } else {
                    colors::DARK_GRAY
                }
            } else if track.mute {
                colors::DARK_GRAY
            } else {
                colors::YELLOW
            };
            lights.set_color(LightId::Button(ButtonId::Row1(i)), upper);
            lights.set_color(LightId::Button(ButtonId::Row2(i)), lower);
        }
    }

    fn as_bank_navigable(&mut self) -> Option<&mut dyn BankNavigable> {
        Some(self)
    }

    fn as_bank_navigable_ref(&self) -> Option<&dyn BankNavigable> {
        Some(self)
    }
}

impl BankNavigable for TrackParamMode {
    fn can_select_previous(&self, model: &Model) -> bool {
        model.track_bank.can_scroll_backwards() || model.selected_track().is_some_and(|s| s > 0)
    }

    fn can_select_next(&self, model: &Model) -> bool {
        model.track_bank.can_scroll_forwards()
            || model
                .selected_track()
                .is_some_and(|s| s + 1 < model.track_bank.item_count())
    }

    fn select_previous(&mut self, model: &mut Model, page: bool) -> bool {
        if page {
            model.track_bank.select_previous_page()
        } else {
            model.track_bank.select_previous_item()
        }
    }

    fn select_next(&mut self, model: &mut Model, page: bool) -> bool {
        if page {
            model.track_bank.select_next_page()
        } else {
            model.track_bank.select_next_item()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::model_with_tracks;
    use crate::session::SessionChange;

    #[test]
    fn test_knob_edits_bank_slot() {
        let mut model = model_with_tracks(12);
        model.track_bank.select_next_page();
        let mut mode = TrackParamMode::new(TrackProperty::Volume);
        mode.on_knob_value(1, KnobInput::Absolute(0.5), &mut model);
        assert_eq!(model.session.tracks[9].volume, 0.5);

        // past the collection end
        mode.on_knob_value(6, KnobInput::Absolute(0.5), &mut model);
        assert_eq!(model.session.drain_changes().len(), 1);
    }

    #[test]
    fn test_missing_send_is_ignored() {
        let mut model = model_with_tracks(2);
        let mut mode = TrackParamMode::new(TrackProperty::Send(6));
        mode.on_knob_value(0, KnobInput::Delta(0.1), &mut model);
        assert!(model.session.drain_changes().is_empty());
        mode.on_activate(&mut model);
        assert_eq!(model.notification(), Some("No Send 7"));
    }

    #[test]
    fn test_row_buttons() {
        let mut model = model_with_tracks(4);
        let mut mode = TrackParamMode::new(TrackProperty::Pan);
        mode.on_row_button(0, 2, ButtonEvent::Down, &mut model);
        assert_eq!(model.selected_track(), Some(2));
        mode.on_row_button(1, 1, ButtonEvent::Down, &mut model);
        assert!(model.session.tracks[1].mute);
        model.modifiers.shift = true;
        mode.on_row_button(1, 1, ButtonEvent::Down, &mut model);
        assert!(model.session.tracks[1].solo);
        mode.on_row_button(1, 7, ButtonEvent::Down, &mut model);
        assert_eq!(
            model.session.drain_changes(),
            vec![
                SessionChange::TrackMute { track: 1, value: true },
                SessionChange::TrackSolo { track: 1, value: true },
            ]
        );
    }

    #[test]
    fn test_display_shows_bank_page() {
        let model = model_with_tracks(3);
        let mode = TrackParamMode::new(TrackProperty::Pan);
        let mut text = model.layout().blank_text();
        mode.update_display(&model, &mut text);
        assert_eq!(text.cell(0, 0), "C");
        assert_eq!(text.cell(1, 2), "Track 3");
        assert_eq!(text.cell(1, 3), "");
    }
}
