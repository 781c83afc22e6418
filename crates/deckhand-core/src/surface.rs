//! Physical layout of the reference grid controller and its input events.
//!
//! Transports (MIDI, HID poll threads) translate raw input into
//! [`ControlEvent`]s; everything past this point is transport agnostic.

use crate::display::{LightFrame, LightId, LightInfo, TextFrame};
use serde::{Deserialize, Serialize};

/// Buttons of the reference surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ButtonId {
    Shift,
    Select,
    Play,
    Record,
    Stop,
    Up,
    Down,
    Left,
    Right,
    OctaveUp,
    OctaveDown,
    /// Mode buttons
    Volume,
    Pan,
    Sends,
    Track,
    Device,
    Transport,
    ScaleSettings,
    /// View buttons
    Session,
    Note,
    Drum,
    Sequencer,
    /// Toggles the drum view between playing and step editing
    StepEdit,
    /// Upper button row under the display
    Row1(u8),
    /// Lower button row under the display
    Row2(u8),
    /// Scene launch buttons beside the grid
    Scene(u8),
}

impl ButtonId {
    /// Buttons that exist regardless of the layout's row sizes
    pub const FIXED: [ButtonId; 23] = [
        ButtonId::Shift,
        ButtonId::Select,
        ButtonId::Play,
        ButtonId::Record,
        ButtonId::Stop,
        ButtonId::Up,
        ButtonId::Down,
        ButtonId::Left,
        ButtonId::Right,
        ButtonId::OctaveUp,
        ButtonId::OctaveDown,
        ButtonId::Volume,
        ButtonId::Pan,
        ButtonId::Sends,
        ButtonId::Track,
        ButtonId::Device,
        ButtonId::Transport,
        ButtonId::ScaleSettings,
        ButtonId::Session,
        ButtonId::Note,
        ButtonId::Drum,
        ButtonId::Sequencer,
        ButtonId::StepEdit,
    ];
}

/// A decoded hardware input event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// Button pressed or released
    Button { id: ButtonId, pressed: bool, velocity: u8 },
    /// Grid pad hit (velocity 0 = released)
    Pad { index: usize, velocity: u8 },
    /// Knob or fader moved; raw value before decoding
    Knob { index: usize, raw: u16 },
    /// Touch-sensitive knob touched or released
    KnobTouch { index: usize, touched: bool },
    /// Pitch bend / ribbon, 14-bit (8192 = centre)
    PitchBend { value: u16 },
    /// Per-pad pressure
    PolyPressure { index: usize, pressure: u8 },
    /// Channel pressure
    ChannelPressure { pressure: u8 },
}

/// Dimensions of the surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceLayout {
    /// Pad grid rows
    pub grid_rows: usize,
    /// Pad grid columns
    pub grid_cols: usize,
    /// Number of knobs (with LED rings)
    pub knobs: usize,
    /// Buttons per row under the display
    pub row_buttons: usize,
    /// Scene launch buttons
    pub scene_buttons: usize,
    /// Text display rows
    pub display_rows: usize,
    /// Text cells per display row
    pub display_cells: usize,
    /// Characters per text cell
    pub cell_width: usize,
}

impl Default for SurfaceLayout {
    fn default() -> Self {
        Self {
            grid_rows: 8,
            grid_cols: 8,
            knobs: 8,
            row_buttons: 8,
            scene_buttons: 8,
            display_rows: 2,
            display_cells: 8,
            cell_width: 8,
        }
    }
}

impl SurfaceLayout {
    /// Number of pads
    pub fn grid_size(&self) -> usize {
        self.grid_rows * self.grid_cols
    }

    /// Every button on the surface
    pub fn buttons(&self) -> Vec<ButtonId> {
        let mut buttons = ButtonId::FIXED.to_vec();
        for i in 0..self.row_buttons as u8 {
            buttons.push(ButtonId::Row1(i));
            buttons.push(ButtonId::Row2(i));
        }
        for i in 0..self.scene_buttons as u8 {
            buttons.push(ButtonId::Scene(i));
        }
        buttons
    }

    /// A frame with every light of the surface switched off
    pub fn blank_lights(&self) -> LightFrame {
        let mut frame = LightFrame::new();
        for i in 0..self.grid_size() {
            frame.set(LightId::Pad(i), LightInfo::OFF);
        }
        for button in self.buttons() {
            frame.set(LightId::Button(button), LightInfo::OFF);
        }
        for i in 0..self.knobs {
            frame.set(LightId::Knob(i), LightInfo::OFF);
        }
        frame
    }

    /// An empty text frame sized for the display
    pub fn blank_text(&self) -> TextFrame {
        TextFrame::new(self.display_rows, self.display_cells, self.cell_width)
    }
}
