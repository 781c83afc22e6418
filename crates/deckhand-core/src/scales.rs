//! Musical scales and the pad layout settings derived from them.

use serde::{Deserialize, Serialize};

/// MIDI note number for C3
pub const C3_MIDI: u8 = 48;

/// First note of the drum pad block (GM kick)
pub const DRUM_START_NOTE: u8 = 36;

/// Pads per drum bank (one 4x4 block)
pub const DRUM_PADS: usize = 16;

/// Octave range reachable with octave up/down
pub const OCTAVE_RANGE: std::ops::RangeInclusive<i8> = -3..=3;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Convert a MIDI note number to a note name
pub fn note_name(note: u8) -> String {
    let octave = (note / 12) as i8 - 1;
    format!("{}{}", NOTE_NAMES[(note % 12) as usize], octave)
}

/// Name of a pitch class (0 = C)
pub fn pitch_class_name(pitch_class: u8) -> &'static str {
    NOTE_NAMES[(pitch_class % 12) as usize]
}

/// Supported scales
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scale {
    Major,
    Minor,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Locrian,
    HarmonicMinor,
    MelodicMinor,
    MajorPentatonic,
    MinorPentatonic,
    Blues,
    WholeTone,
    Chromatic,
}

impl Default for Scale {
    fn default() -> Self {
        Self::Major
    }
}

impl Scale {
    /// All scales in selection order
    pub const ALL: [Scale; 14] = [
        Scale::Major,
        Scale::Minor,
        Scale::Dorian,
        Scale::Phrygian,
        Scale::Lydian,
        Scale::Mixolydian,
        Scale::Locrian,
        Scale::HarmonicMinor,
        Scale::MelodicMinor,
        Scale::MajorPentatonic,
        Scale::MinorPentatonic,
        Scale::Blues,
        Scale::WholeTone,
        Scale::Chromatic,
    ];

    /// Semitone offsets of the scale degrees within one octave
    pub fn intervals(self) -> &'static [u8] {
        match self {
            Scale::Major => &[0, 2, 4, 5, 7, 9, 11],
            Scale::Minor => &[0, 2, 3, 5, 7, 8, 10],
            Scale::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            Scale::Phrygian => &[0, 1, 3, 5, 7, 8, 10],
            Scale::Lydian => &[0, 2, 4, 6, 7, 9, 11],
            Scale::Mixolydian => &[0, 2, 4, 5, 7, 9, 10],
            Scale::Locrian => &[0, 1, 3, 5, 6, 8, 10],
            Scale::HarmonicMinor => &[0, 2, 3, 5, 7, 8, 11],
            Scale::MelodicMinor => &[0, 2, 3, 5, 7, 9, 11],
            Scale::MajorPentatonic => &[0, 2, 4, 7, 9],
            Scale::MinorPentatonic => &[0, 3, 5, 7, 10],
            Scale::Blues => &[0, 3, 5, 6, 7, 10],
            Scale::WholeTone => &[0, 2, 4, 6, 8, 10],
            Scale::Chromatic => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
        }
    }

    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            Scale::Major => "Major",
            Scale::Minor => "Minor",
            Scale::Dorian => "Dorian",
            Scale::Phrygian => "Phrygian",
            Scale::Lydian => "Lydian",
            Scale::Mixolydian => "Mixolydian",
            Scale::Locrian => "Locrian",
            Scale::HarmonicMinor => "Harmonic Minor",
            Scale::MelodicMinor => "Melodic Minor",
            Scale::MajorPentatonic => "Major Pentatonic",
            Scale::MinorPentatonic => "Minor Pentatonic",
            Scale::Blues => "Blues",
            Scale::WholeTone => "Whole Tone",
            Scale::Chromatic => "Chromatic",
        }
    }

    /// Look up a scale by display name or snake_case identifier
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = name.trim().to_lowercase().replace(['_', '-'], " ");
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.name().to_lowercase() == wanted)
    }

    /// Index in [`Scale::ALL`]
    pub fn position(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }

    /// Scale `steps` positions further in selection order (clamped)
    pub fn offset(self, steps: i32) -> Self {
        let index = (self.position() as i32 + steps).clamp(0, Self::ALL.len() as i32 - 1);
        Self::ALL[index as usize]
    }
}

/// Everything the pad note layout depends on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scales {
    /// Selected scale
    pub scale: Scale,
    /// Pitch class of the tonic (0 = C)
    pub base: u8,
    /// Octave shift applied on top of the start note
    pub octave: i8,
    /// Only scale notes on the grid (false = chromatic layout)
    pub in_key: bool,
    /// Note played by the bottom-left pad at octave 0
    pub start_note: u8,
    /// Selected drum bank (16 pads each)
    pub drum_bank: u8,
    /// Grid rows
    pub rows: usize,
    /// Grid columns
    pub cols: usize,
}

impl Default for Scales {
    fn default() -> Self {
        Self {
            scale: Scale::Major,
            base: 0,
            octave: 0,
            in_key: true,
            start_note: C3_MIDI,
            drum_bank: 0,
            rows: 8,
            cols: 8,
        }
    }
}

impl Scales {
    /// Create layout settings for a grid of the given size
    pub fn for_grid(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            ..Self::default()
        }
    }

    /// Number of pads on the grid
    pub fn grid_size(&self) -> usize {
        self.rows * self.cols
    }

    /// Note of the tonic at the current octave
    pub fn root_note(&self) -> i32 {
        self.start_note as i32 + self.base as i32 + self.octave as i32 * 12
    }

    /// Note of scale degree `degree` counted from the current root.
    ///
    /// Chromatic steps are used when not in key.
    pub fn degree_note(&self, degree: usize) -> Option<u8> {
        let note = if self.in_key {
            let intervals = self.scale.intervals();
            let octave = (degree / intervals.len()) as i32;
            self.root_note() + octave * 12 + intervals[degree % intervals.len()] as i32
        } else {
            self.root_note() + degree as i32
        };
        u8::try_from(note).ok().filter(|n| *n <= 127)
    }

    /// Melodic note for a grid index (row-major, row 0 at the bottom).
    ///
    /// Each row starts a fourth above the one below it: three scale degrees
    /// in key, five semitones chromatically.
    pub fn grid_note(&self, index: usize) -> Option<u8> {
        if index >= self.grid_size() {
            return None;
        }
        let row = index / self.cols;
        let col = index % self.cols;
        let step = if self.in_key { 3 } else { 5 };
        self.degree_note(row * step + col)
    }

    /// Drum pad note for a grid index; only the bottom-left 4x4 block maps.
    pub fn drum_note(&self, index: usize) -> Option<u8> {
        if index >= self.grid_size() {
            return None;
        }
        let row = index / self.cols;
        let col = index % self.cols;
        if row >= 4 || col >= 4 {
            return None;
        }
        let note = DRUM_START_NOTE as usize + self.drum_bank as usize * DRUM_PADS + row * 4 + col;
        u8::try_from(note).ok().filter(|n| *n <= 127)
    }

    /// Whether `note` belongs to the selected scale
    pub fn is_in_scale(&self, note: u8) -> bool {
        let pitch_class = (note as i32 - self.base as i32).rem_euclid(12) as u8;
        self.scale.intervals().contains(&pitch_class)
    }

    /// Whether `note` is a tonic of the selected scale
    pub fn is_tonic(&self, note: u8) -> bool {
        (note as i32 - self.base as i32).rem_euclid(12) == 0
    }

    /// Shift the octave, clamped to [`OCTAVE_RANGE`]. Returns true on change.
    pub fn change_octave(&mut self, delta: i8) -> bool {
        let octave = (self.octave + delta).clamp(*OCTAVE_RANGE.start(), *OCTAVE_RANGE.end());
        let changed = octave != self.octave;
        self.octave = octave;
        changed
    }

    /// Move the drum bank, keeping every pad note inside 0..=127.
    pub fn change_drum_bank(&mut self, delta: i8) -> bool {
        let max_bank = ((127 - DRUM_START_NOTE as usize + 1) / DRUM_PADS) as i16 - 1;
        let bank = (self.drum_bank as i16 + delta as i16).clamp(0, max_bank) as u8;
        let changed = bank != self.drum_bank;
        self.drum_bank = bank;
        changed
    }

    /// Select the next/previous scale
    pub fn change_scale(&mut self, steps: i32) -> bool {
        let scale = self.scale.offset(steps);
        let changed = scale != self.scale;
        self.scale = scale;
        changed
    }

    /// Move the tonic by semitones (wraps around the octave)
    pub fn change_base(&mut self, semitones: i32) {
        self.base = (self.base as i32 + semitones).rem_euclid(12) as u8;
    }

    /// Short description, e.g. "C Major"
    pub fn describe(&self) -> String {
        format!("{} {}", pitch_class_name(self.base), self.scale.name())
    }
}
