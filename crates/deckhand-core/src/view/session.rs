use super::View;
use crate::command::ButtonEvent;
use crate::display::{colors, LightFrame, LightInfo};
use crate::layer::Layer;
use crate::model::Model;
use crate::session::ClipSlot;
use crate::surface::ButtonId;

/// Clip launcher: columns are the track bank page, rows the scene bank page
/// (top row = first scene of the page).
///
/// Holding select turns pads into track selection.
#[derive(Debug, Default)]
pub struct SessionView;

impl SessionView {
    pub fn new() -> Self {
        Self
    }

    /// `(track position, scene position)` under a pad, if both exist
    fn slot_at(index: usize, model: &Model) -> Option<(usize, usize)> {
        let layout = model.layout();
        let row = index / layout.grid_cols;
        let col = index % layout.grid_cols;
        let line = layout.grid_rows.checked_sub(row + 1)?;
        let track = model.track_bank.item(&model.session.tracks, col);
        let scene = model.scene_bank.item(&model.session.scenes, line);
        if !track.exists() || !scene.exists() {
            return None;
        }
        Some((track.position(), scene.position()))
    }

    fn slot_light(slot: &ClipSlot, track_color: u8, armed: bool) -> LightInfo {
        let color = if slot.color != colors::OFF {
            slot.color
        } else {
            track_color
        };
        if slot.recording {
            LightInfo::blinking(colors::RED, colors::DARK_GRAY, true)
        } else if slot.playing {
            LightInfo::blinking(color, colors::GREEN, false)
        } else if slot.has_content {
            LightInfo::solid(color)
        } else if armed {
            LightInfo::solid(colors::DARK_GRAY)
        } else {
            LightInfo::OFF
        }
    }
}

impl Layer<Model> for SessionView {}

impl View for SessionView {
    fn on_grid_note(&mut self, index: usize, velocity: u8, model: &mut Model) {
        if velocity == 0 {
            return;
        }
        let Some((track, scene)) = Self::slot_at(index, model) else {
            return;
        };
        if model.is_select() {
            model.track_bank.select(track);
        } else {
            model.session.launch_slot(track, scene);
        }
    }

    fn draw_grid(&self, model: &Model, lights: &mut LightFrame) {
        for index in 0..model.layout().grid_size() {
            let light = Self::slot_at(index, model)
                .and_then(|(t, s)| {
                    let track = model.session.tracks.get(t)?;
                    let slot = track.slots.get(s)?;
                    Some(Self::slot_light(slot, track.color, track.arm))
                })
                .unwrap_or(LightInfo::OFF);
            lights.set_pad(index, light);
        }
    }

    fn update_buttons(&self, model: &Model, lights: &mut LightFrame) {
        for slot in model.scene_bank.items(&model.session.scenes) {
            if slot.index() >= model.layout().scene_buttons {
                break;
            }
            if let Some(scene) = slot.get() {
                let color = if scene.color != colors::OFF {
                    scene.color
                } else {
                    colors::GRAY
                };
                lights.set_button(ButtonId::Scene(slot.index() as u8), color);
            }
        }
    }

    fn on_scene_button(&mut self, index: usize, event: ButtonEvent, model: &mut Model) {
        if event != ButtonEvent::Down {
            return;
        }
        let slot = model.scene_bank.item(&model.session.scenes, index);
        if slot.exists() {
            let position = slot.position();
            model.session.launch_scene(position);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::LightId;
    use crate::model::tests::model_with_tracks;
    use crate::session::SessionChange;

    #[test]
    fn test_pad_launches_slot() {
        let mut model = model_with_tracks(10);
        model.session.tracks[1].slots[0].has_content = true;
        let mut view = SessionView::new();
        // top row, second column
        view.on_grid_note(57, 127, &mut model);
        assert!(model.session.tracks[1].slots[0].playing);

        let mut lights = model.layout().blank_lights();
        view.draw_grid(&model, &mut lights);
        let color = model.session.tracks[1].color;
        assert_eq!(
            lights.get(LightId::Pad(57)),
            Some(LightInfo::blinking(color, colors::GREEN, false))
        );
        assert_eq!(lights.get(LightId::Pad(58)), Some(LightInfo::OFF));
    }

    #[test]
    fn test_pads_follow_track_bank_page() {
        let mut model = model_with_tracks(10);
        model.track_bank.select_next_page();
        let mut view = SessionView::new();
        view.on_grid_note(56 + 1, 127, &mut model);
        // column 2 of page 2 does not exist
        view.on_grid_note(56 + 2, 127, &mut model);
        assert_eq!(model.session.drain_changes(), vec![SessionChange::StopTrack(9)]);
    }

    #[test]
    fn test_select_held_selects_track() {
        let mut model = model_with_tracks(4);
        model.modifiers.select = true;
        let mut view = SessionView::new();
        view.on_grid_note(3, 127, &mut model);
        assert_eq!(model.selected_track(), Some(3));
        assert!(model.session.drain_changes().is_empty());
    }

    #[test]
    fn test_scene_button_launches_scene() {
        let mut model = model_with_tracks(2);
        let mut view = SessionView::new();
        view.on_scene_button(2, ButtonEvent::Down, &mut model);
        view.on_scene_button(9, ButtonEvent::Down, &mut model);
        assert_eq!(model.session.drain_changes(), vec![SessionChange::LaunchScene(2)]);
    }
}
