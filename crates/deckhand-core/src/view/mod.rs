//! Views: pad grid pages.
//!
//! A view owns the pad grid, the scene buttons and whichever extra buttons
//! its capabilities give meaning to (octave, resolution, step edit).
//! Commands ask for a capability through the `as_*` queries and do nothing
//! when the active view lacks it.

mod drum;
mod play;
mod sequencer;
mod session;

pub use drum::{DrumMode, DrumView};
pub use play::PlayView;
pub use sequencer::SequencerView;
pub use session::SessionView;

use crate::command::ButtonEvent;
use crate::display::{colors, LightFrame};
use crate::keys::PadState;
use crate::layer::{Layer, LayerManager};
use crate::model::Model;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

/// Step resolutions in beats, with display names
pub const RESOLUTIONS: [(f64, &str); 8] = [
    (1.0, "1/4"),
    (2.0 / 3.0, "1/4t"),
    (0.5, "1/8"),
    (1.0 / 3.0, "1/8t"),
    (0.25, "1/16"),
    (1.0 / 6.0, "1/16t"),
    (0.125, "1/32"),
    (1.0 / 12.0, "1/32t"),
];

/// Resolution selected when a sequencer is created (1/16)
pub const DEFAULT_RESOLUTION: usize = 4;

/// Views of the reference surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ViewId {
    Play,
    Drum,
    Sequencer,
    Session,
}

impl ViewId {
    pub const ALL: [ViewId; 4] = [ViewId::Play, ViewId::Drum, ViewId::Sequencer, ViewId::Session];

    /// Configuration name
    pub fn name(self) -> &'static str {
        match self {
            ViewId::Play => "play",
            ViewId::Drum => "drum",
            ViewId::Sequencer => "sequencer",
            ViewId::Session => "session",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Self::ALL.into_iter().find(|v| v.name() == name)
    }
}

/// Views with a step sequencer
pub trait SequencerCapable {
    /// Index into [`RESOLUTIONS`]
    fn resolution_index(&self) -> usize;

    /// Select a resolution (clamped) and push the step length to the clip.
    fn set_resolution_index(&mut self, index: usize, model: &mut Model);

    /// Scroll the visible steps by `pages` pages. Returns whether it moved.
    fn scroll_steps(&mut self, pages: i32, model: &mut Model) -> bool;

    fn resolution_up(&mut self, model: &mut Model) {
        let index = (self.resolution_index() + 1).min(RESOLUTIONS.len() - 1);
        self.set_resolution_index(index, model);
    }

    fn resolution_down(&mut self, model: &mut Model) {
        let index = self.resolution_index().saturating_sub(1);
        self.set_resolution_index(index, model);
    }
}

/// Views whose pads can be shifted by octaves (or drum banks)
pub trait Transposable {
    fn octave_up(&mut self, model: &mut Model) -> bool;
    fn octave_down(&mut self, model: &mut Model) -> bool;
}

/// Views with a drum pad block
pub trait DrumPads {
    /// Grid index of the pad whose steps are shown
    fn selected_pad(&self) -> usize;

    /// Switch between playing the pads and editing steps
    fn toggle_step_edit(&mut self, model: &mut Model);
}

/// A pad-grid page.
pub trait View: Layer<Model> {
    /// A pad was hit (velocity > 0) or released (velocity 0)
    fn on_grid_note(&mut self, index: usize, velocity: u8, model: &mut Model);

    /// Render the pad grid
    fn draw_grid(&self, model: &Model, lights: &mut LightFrame);

    /// Render the buttons the view owns
    fn update_buttons(&self, _model: &Model, _lights: &mut LightFrame) {}

    /// A scene button was pressed, released or held
    fn on_scene_button(&mut self, _index: usize, _event: ButtonEvent, _model: &mut Model) {}

    /// Note currently played by a pad, for per-pad pressure
    fn pad_note(&self, _index: usize, _model: &Model) -> Option<u8> {
        None
    }

    fn as_sequencer(&mut self) -> Option<&mut dyn SequencerCapable> {
        None
    }

    fn as_transposable(&mut self) -> Option<&mut dyn Transposable> {
        None
    }

    fn as_drum_pads(&mut self) -> Option<&mut dyn DrumPads> {
        None
    }
}

/// View registry with per-track preferred views.
///
/// Explicit view switches remember the view for the selected track; when
/// the track selection changes the remembered view comes back.
pub struct ViewManager {
    layers: LayerManager<ViewId, dyn View>,
    preferred: HashMap<usize, ViewId>,
}

impl Default for ViewManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewManager {
    pub fn new() -> Self {
        Self {
            layers: LayerManager::new("VIEWS"),
            preferred: HashMap::new(),
        }
    }

    /// Remember `view` for the track at `track_position`
    pub fn set_preferred(&mut self, track_position: usize, view: ViewId) {
        self.preferred.insert(track_position, view);
    }

    pub fn preferred_for(&self, track_position: usize) -> Option<ViewId> {
        self.preferred.get(&track_position).copied()
    }

    /// Activate the view remembered for a track. No-op without one.
    pub fn restore_preferred(&mut self, track_position: usize, model: &mut Model) -> bool {
        match self.preferred_for(track_position) {
            Some(view) => self.layers.set_active(view, model),
            None => false,
        }
    }

    /// Explicit user switch: activate permanently and remember the view for
    /// the selected track.
    pub fn switch_to(&mut self, view: ViewId, model: &mut Model) -> bool {
        if !self.layers.is_registered(view) {
            return false;
        }
        if let Some(track) = model.selected_track() {
            self.set_preferred(track, view);
        }
        self.layers.set_active(view, model)
    }
}

impl Deref for ViewManager {
    type Target = LayerManager<ViewId, dyn View>;

    fn deref(&self) -> &Self::Target {
        &self.layers
    }
}

impl DerefMut for ViewManager {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.layers
    }
}

impl std::fmt::Debug for ViewManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewManager")
            .field("layers", &self.layers)
            .field("preferred", &self.preferred)
            .finish()
    }
}

/// Register every view of the reference surface.
pub fn register_defaults(views: &mut ViewManager) {
    views.register(ViewId::Play, Box::new(PlayView::new()));
    views.register(ViewId::Drum, Box::new(DrumView::new()));
    views.register(ViewId::Sequencer, Box::new(SequencerView::new()));
    views.register(ViewId::Session, Box::new(SessionView::new()));
}

/// Pad colour for a melodic pad state
pub(crate) fn pad_color(state: PadState, track_color: u8) -> u8 {
    match state {
        PadState::Off => colors::OFF,
        PadState::Pressed => colors::GREEN,
        PadState::Tonic => track_color,
        PadState::InScale => colors::WHITE,
        PadState::OutOfScale => colors::DARK_GRAY,
    }
}

/// Colour of the selected track, or white without a selection
pub(crate) fn track_color(model: &Model) -> u8 {
    model
        .selected_track()
        .and_then(|t| model.session.tracks.get(t))
        .map_or(colors::WHITE, |t| t.color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::model_with_tracks;

    #[test]
    fn test_view_names() {
        for view in ViewId::ALL {
            assert_eq!(ViewId::from_name(view.name()), Some(view));
        }
        assert_eq!(ViewId::from_name("Drum "), Some(ViewId::Drum));
    }

    #[test]
    fn test_preferred_view_per_track() {
        let mut model = model_with_tracks(4);
        let mut views = ViewManager::new();
        register_defaults(&mut views);
        views.set_active(ViewId::Play, &mut model);

        model.track_bank.select(1);
        views.switch_to(ViewId::Drum, &mut model);
        assert_eq!(views.preferred_for(1), Some(ViewId::Drum));

        model.track_bank.select(2);
        views.switch_to(ViewId::Session, &mut model);

        assert!(views.restore_preferred(1, &mut model));
        assert_eq!(views.active_id(), Some(ViewId::Drum));
        assert!(!views.restore_preferred(3, &mut model));
        assert_eq!(views.active_id(), Some(ViewId::Drum));
    }

    #[test]
    fn test_switch_without_selection_records_nothing() {
        let mut model = model_with_tracks(4);
        let mut views = ViewManager::new();
        register_defaults(&mut views);
        assert!(views.switch_to(ViewId::Session, &mut model));
        assert_eq!(views.preferred_for(0), None);
    }

    #[test]
    fn test_missing_capability_is_none() {
        let mut session = SessionView::new();
        assert!(session.as_sequencer().is_none());
        assert!(session.as_transposable().is_none());
        let mut drum = DrumView::new();
        assert!(drum.as_sequencer().is_some());
        assert!(drum.as_drum_pads().is_some());
    }
}
