//! Modes: knob and display pages.
//!
//! A mode owns the meaning of the knobs, the two button rows under the
//! display and the display itself. Exactly one mode receives events at a
//! time; see [`ModeManager`].

mod device;
mod scale;
mod track;
mod track_param;
mod transport;

pub use device::DeviceMode;
pub use scale::ScaleMode;
pub use track::TrackMode;
pub use track_param::{TrackParamMode, TrackProperty};
pub use transport::TransportMode;

use crate::command::ButtonEvent;
use crate::display::{LightFrame, LightId, TextFrame};
use crate::layer::{Layer, LayerManager};
use crate::model::Model;
use crate::value::KnobInput;

/// Maximum number of send modes registered for a surface
pub const MAX_SENDS: u8 = 8;

/// Modes of the reference surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModeId {
    Volume,
    Pan,
    /// Level of one send across the track bank
    Send(u8),
    Track,
    Device,
    Transport,
    Scales,
}

impl ModeId {
    /// Configuration name
    pub fn name(self) -> String {
        match self {
            ModeId::Volume => "volume".to_string(),
            ModeId::Pan => "pan".to_string(),
            ModeId::Send(n) => format!("send{}", n + 1),
            ModeId::Track => "track".to_string(),
            ModeId::Device => "device".to_string(),
            ModeId::Transport => "transport".to_string(),
            ModeId::Scales => "scales".to_string(),
        }
    }

    /// Parse a configuration name ("volume", "send1", ...)
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        match name.as_str() {
            "volume" => Some(ModeId::Volume),
            "pan" => Some(ModeId::Pan),
            "track" => Some(ModeId::Track),
            "device" => Some(ModeId::Device),
            "transport" => Some(ModeId::Transport),
            "scales" => Some(ModeId::Scales),
            _ => {
                let n: u8 = name.strip_prefix("send")?.parse().ok()?;
                (1..=MAX_SENDS).contains(&n).then(|| ModeId::Send(n - 1))
            }
        }
    }
}

/// Modes that page through a bank with the left/right buttons
pub trait BankNavigable {
    fn can_select_previous(&self, model: &Model) -> bool;
    fn can_select_next(&self, model: &Model) -> bool;
    /// Select the previous item, or page when `page` is set
    fn select_previous(&mut self, model: &mut Model, page: bool) -> bool;
    /// Select the next item, or page when `page` is set
    fn select_next(&mut self, model: &mut Model, page: bool) -> bool;
}

/// A knob/display page.
///
/// Event callbacks receive the model mutably; render callbacks only read it
/// and write into the frame they are given. Every method has a no-op
/// default.
pub trait Mode: Layer<Model> {
    /// Title shown on the display
    fn name(&self) -> String;

    /// A knob moved
    fn on_knob_value(&mut self, _index: usize, _input: KnobInput, _model: &mut Model) {}

    /// A touch-sensitive knob was touched or released
    fn on_knob_touch(&mut self, _index: usize, _touched: bool, _model: &mut Model) {}

    /// A button of row `row` (0 = upper) was pressed, released or held
    fn on_row_button(
        &mut self,
        _row: usize,
        _index: usize,
        _event: ButtonEvent,
        _model: &mut Model,
    ) {
    }

    /// Render the display
    fn update_display(&self, _model: &Model, _text: &mut TextFrame) {}

    /// Render the knob LED rings
    fn update_knob_leds(&self, _model: &Model, _lights: &mut LightFrame) {}

    /// Render the two button rows
    fn update_row_buttons(&self, _model: &Model, _lights: &mut LightFrame) {}

    fn as_bank_navigable(&mut self) -> Option<&mut dyn BankNavigable> {
        None
    }

    fn as_bank_navigable_ref(&self) -> Option<&dyn BankNavigable> {
        None
    }
}

/// Manager for the modes of one surface
pub type ModeManager = LayerManager<ModeId, dyn Mode>;

/// Register every mode of the reference surface.
pub fn register_defaults(modes: &mut ModeManager) {
    modes.register(ModeId::Volume, Box::new(TrackParamMode::new(TrackProperty::Volume)));
    modes.register(ModeId::Pan, Box::new(TrackParamMode::new(TrackProperty::Pan)));
    for n in 0..MAX_SENDS {
        modes.register(ModeId::Send(n), Box::new(TrackParamMode::new(TrackProperty::Send(n))));
    }
    modes.register(ModeId::Track, Box::new(TrackMode::new()));
    modes.register(ModeId::Device, Box::new(DeviceMode::new()));
    modes.register(ModeId::Transport, Box::new(TransportMode::new()));
    modes.register(ModeId::Scales, Box::new(ScaleMode::new()));
}

/// Knob LED ring value for a normalized parameter (0..=127)
pub(crate) fn ring_value(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * 127.0).round() as u8
}

/// Set a knob ring to a normalized value
pub(crate) fn set_ring(lights: &mut LightFrame, index: usize, value: Option<f64>) {
    let color = value.map_or(0, ring_value);
    lights.set_color(LightId::Knob(index), color);
}

/// Format a normalized volume as dB (unity at 0.79)
pub(crate) fn format_volume(value: f64) -> String {
    if value <= 0.0 {
        return "-inf dB".to_string();
    }
    let db = 20.0 * (value / 0.79).powf(3.0).log10();
    format!("{:.1}dB", db)
}

/// Format a normalized pan position
pub(crate) fn format_pan(value: f64) -> String {
    let percent = ((value - 0.5) * 200.0).round() as i32;
    match percent {
        0 => "C".to_string(),
        p if p < 0 => format!("L{}", -p),
        p => format!("R{}", p),
    }
}

/// Format a normalized value as a percentage
pub(crate) fn format_percent(value: f64) -> String {
    format!("{}%", (value * 100.0).round() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_names_roundtrip() {
        for id in [ModeId::Volume, ModeId::Send(3), ModeId::Scales] {
            assert_eq!(ModeId::from_name(&id.name()), Some(id));
        }
        assert_eq!(ModeId::from_name("send0"), None);
        assert_eq!(ModeId::from_name("send9"), None);
        assert_eq!(ModeId::from_name("bogus"), None);
    }

    #[test]
    fn test_formatting() {
        assert_eq!(format_volume(0.79), "0.0dB");
        assert_eq!(format_volume(0.0), "-inf dB");
        assert_eq!(format_pan(0.5), "C");
        assert_eq!(format_pan(0.25), "L50");
        assert_eq!(format_pan(1.0), "R100");
        assert_eq!(format_percent(0.333), "33%");
        assert_eq!(ring_value(1.0), 127);
    }
}
