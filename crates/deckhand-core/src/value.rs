//! Knob value decoding.
//!
//! Controllers report knob movement either as an absolute position or as a
//! relative increment in one of several encodings. [`ValueChanger`] turns the
//! raw wire value into a [`KnobInput`] on the normalized 0.0..=1.0 scale used
//! by the session model.

use serde::{Deserialize, Serialize};

/// How a knob reports its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// 7-bit absolute position (0..=127)
    #[default]
    Absolute,
    /// 14-bit absolute position (0..=16383)
    Absolute14Bit,
    /// Relative, 64 = no change (65 = +1, 63 = -1)
    RelativeOffsetBinary,
    /// Relative, 1..=63 up, 127 = -1, 65 = -63
    RelativeTwosComplement,
    /// Relative, bit 6 is the sign and bits 0..=5 the magnitude
    RelativeSignedBit,
}

impl Encoding {
    /// Whether the encoding reports increments
    pub fn is_relative(self) -> bool {
        !matches!(self, Encoding::Absolute | Encoding::Absolute14Bit)
    }
}

/// A decoded knob movement
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KnobInput {
    /// New normalized position
    Absolute(f64),
    /// Normalized increment
    Delta(f64),
}

impl KnobInput {
    /// Apply the input to a normalized value, clamped to 0.0..=1.0.
    pub fn apply(self, current: f64) -> f64 {
        match self {
            KnobInput::Absolute(value) => value.clamp(0.0, 1.0),
            KnobInput::Delta(delta) => (current + delta).clamp(0.0, 1.0),
        }
    }

    /// Apply the input to an integer range, with `step` units per tick for
    /// relative input and a linear mapping for absolute input.
    pub fn apply_range(self, current: i32, min: i32, max: i32, step: f64) -> i32 {
        match self {
            KnobInput::Absolute(value) => {
                let span = (max - min) as f64;
                min + (value.clamp(0.0, 1.0) * span).round() as i32
            }
            KnobInput::Delta(delta) => {
                let ticks = (delta / DEFAULT_SENSITIVITY).round();
                (current + (ticks * step) as i32).clamp(min, max)
            }
        }
    }

    /// Direction of the movement (-1, 0, 1), for stepping through lists
    pub fn direction(self) -> i32 {
        match self {
            KnobInput::Delta(delta) if delta > 0.0 => 1,
            KnobInput::Delta(delta) if delta < 0.0 => -1,
            _ => 0,
        }
    }
}

/// Normalized change per relative tick
pub const DEFAULT_SENSITIVITY: f64 = 1.0 / 128.0;

/// Factor applied to the sensitivity in fine mode
pub const FINE_FACTOR: f64 = 0.1;

/// Decodes raw knob values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueChanger {
    pub encoding: Encoding,
    /// Normalized change per relative tick
    pub sensitivity: f64,
}

impl Default for ValueChanger {
    fn default() -> Self {
        Self::new(Encoding::Absolute)
    }
}

impl ValueChanger {
    pub fn new(encoding: Encoding) -> Self {
        Self {
            encoding,
            sensitivity: DEFAULT_SENSITIVITY,
        }
    }

    /// Signed tick count of a relative raw value
    pub fn ticks(&self, raw: u16) -> i32 {
        let raw = (raw & 0x7f) as i32;
        match self.encoding {
            Encoding::Absolute | Encoding::Absolute14Bit => 0,
            Encoding::RelativeOffsetBinary => raw - 64,
            Encoding::RelativeTwosComplement => {
                if raw < 64 {
                    raw
                } else {
                    raw - 128
                }
            }
            Encoding::RelativeSignedBit => {
                let magnitude = raw & 0x3f;
                if raw & 0x40 != 0 {
                    -magnitude
                } else {
                    magnitude
                }
            }
        }
    }

    /// Decode a raw value. `fine` scales relative increments down.
    pub fn decode(&self, raw: u16, fine: bool) -> KnobInput {
        match self.encoding {
            Encoding::Absolute => KnobInput::Absolute((raw.min(127)) as f64 / 127.0),
            Encoding::Absolute14Bit => KnobInput::Absolute((raw.min(16383)) as f64 / 16383.0),
            _ => {
                let factor = if fine { FINE_FACTOR } else { 1.0 };
                KnobInput::Delta(self.ticks(raw) as f64 * self.sensitivity * factor)
            }
        }
    }

    /// Decode and apply to a normalized value in one go.
    pub fn apply(&self, raw: u16, current: f64, fine: bool) -> f64 {
        self.decode(raw, fine).apply(current)
    }
}
