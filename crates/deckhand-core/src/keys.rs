//! Pad-to-note translation and pressed-key tracking.
//!
//! The translation tables are derived from [`Scales`] and must be rebuilt
//! with [`KeyManager::update_note_mapping`] whenever the scale, base note,
//! octave or drum bank changes. Consumers look up notes through the manager
//! on every use rather than keeping copies of the tables.
//!
//! Pressed state is tracked per absolute MIDI note, not per pad, so a note
//! that is still sounding stays highlighted even after the mapping moved.

use crate::scales::Scales;

/// How a pad should be coloured in a melodic layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadState {
    /// No note mapped to this pad
    Off,
    /// The pad's note is currently held
    Pressed,
    /// The pad plays a tonic
    Tonic,
    /// The pad plays a scale note
    InScale,
    /// The pad plays a note outside the scale (chromatic layout)
    OutOfScale,
}

/// Translation tables and pressed-key state.
#[derive(Debug, Clone)]
pub struct KeyManager {
    pressed: [u8; 128],
    key_translation: Vec<Option<u8>>,
    drum_translation: Vec<Option<u8>>,
}

impl KeyManager {
    /// Create a key manager with tables built from `scales`.
    pub fn new(scales: &Scales) -> Self {
        let mut keys = Self {
            pressed: [0; 128],
            key_translation: Vec::new(),
            drum_translation: Vec::new(),
        };
        keys.update_note_mapping(scales);
        keys
    }

    /// Rebuild both translation tables.
    pub fn update_note_mapping(&mut self, scales: &Scales) {
        let size = scales.grid_size();
        self.key_translation = (0..size).map(|i| scales.grid_note(i)).collect();
        self.drum_translation = (0..size).map(|i| scales.drum_note(i)).collect();
        log::debug!(
            "[KEYS] Note mapping rebuilt for {} (octave {}, drum bank {})",
            scales.describe(),
            scales.octave,
            scales.drum_bank
        );
    }

    /// Grid index → melodic note table
    pub fn key_translation(&self) -> &[Option<u8>] {
        &self.key_translation
    }

    /// Grid index → drum note table
    pub fn drum_translation(&self) -> &[Option<u8>] {
        &self.drum_translation
    }

    /// Melodic note for a pad
    pub fn map(&self, index: usize) -> Option<u8> {
        self.key_translation.get(index).copied().flatten()
    }

    /// Drum note for a pad
    pub fn map_drum(&self, index: usize) -> Option<u8> {
        self.drum_translation.get(index).copied().flatten()
    }

    /// Record the velocity of a note (0 releases it).
    pub fn set_key_pressed(&mut self, note: u8, velocity: u8) {
        if let Some(slot) = self.pressed.get_mut(note as usize) {
            *slot = velocity.min(127);
        }
    }

    /// Whether a note is currently held
    pub fn is_key_pressed(&self, note: u8) -> bool {
        self.velocity(note) > 0
    }

    /// Velocity a note is held with (0 when released)
    pub fn velocity(&self, note: u8) -> u8 {
        self.pressed.get(note as usize).copied().unwrap_or(0)
    }

    /// Notes currently held
    pub fn pressed_notes(&self) -> Vec<u8> {
        (0..128u8).filter(|n| self.is_key_pressed(*n)).collect()
    }

    /// Release every note, returning the ones that were held.
    pub fn clear_pressed_keys(&mut self) -> Vec<u8> {
        let released = self.pressed_notes();
        self.pressed = [0; 128];
        released
    }

    /// Colour class of a pad in the melodic layout
    pub fn pad_state(&self, index: usize, scales: &Scales) -> PadState {
        let Some(note) = self.map(index) else {
            return PadState::Off;
        };
        if self.is_key_pressed(note) {
            PadState::Pressed
        } else if scales.is_tonic(note) {
            PadState::Tonic
        } else if scales.is_in_scale(note) {
            PadState::InScale
        } else {
            PadState::OutOfScale
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scales::{Scale, C3_MIDI};

    #[test]
    fn test_tonic_pad_stable_across_recomputation() {
        let scales = Scales {
            scale: Scale::Major,
            base: 0,
            start_note: C3_MIDI,
            ..Scales::default()
        };
        let mut keys = KeyManager::new(&scales);
        let tonic = keys.key_translation()[0];
        assert_eq!(tonic, Some(C3_MIDI));
        for _ in 0..10 {
            keys.update_note_mapping(&scales);
            assert_eq!(keys.key_translation()[0], tonic);
        }
        assert_eq!(keys.key_translation().len(), 64);
    }

    #[test]
    fn test_mapping_follows_octave() {
        let mut scales = Scales::default();
        let mut keys = KeyManager::new(&scales);
        scales.change_octave(1);
        // stale until rebuilt
        assert_eq!(keys.map(0), Some(48));
        keys.update_note_mapping(&scales);
        assert_eq!(keys.map(0), Some(60));
    }

    #[test]
    fn test_drum_table_ignores_scale() {
        let mut scales = Scales::default();
        let keys_major = KeyManager::new(&scales);
        scales.scale = Scale::Blues;
        scales.base = 5;
        let keys_blues = KeyManager::new(&scales);
        assert_eq!(keys_major.drum_translation(), keys_blues.drum_translation());
        assert_eq!(keys_major.map_drum(0), Some(36));
        assert_eq!(keys_major.map_drum(63), None);
    }

    #[test]
    fn test_pressed_state_survives_remap() {
        let mut scales = Scales::default();
        let mut keys = KeyManager::new(&scales);
        let note = keys.map(0).unwrap();
        keys.set_key_pressed(note, 100);

        scales.change_octave(1);
        keys.update_note_mapping(&scales);
        assert!(keys.is_key_pressed(note));
        assert_eq!(keys.velocity(note), 100);
        assert_ne!(keys.map(0), Some(note));

        assert_eq!(keys.clear_pressed_keys(), vec![note]);
        assert!(!keys.is_key_pressed(note));
    }

    #[test]
    fn test_pad_state() {
        let scales = Scales {
            in_key: false,
            ..Scales::default()
        };
        let mut keys = KeyManager::new(&scales);
        assert_eq!(keys.pad_state(0, &scales), PadState::Tonic);
        assert_eq!(keys.pad_state(1, &scales), PadState::OutOfScale);
        assert_eq!(keys.pad_state(2, &scales), PadState::InScale);
        keys.set_key_pressed(49, 90);
        assert_eq!(keys.pad_state(1, &scales), PadState::Pressed);
        assert_eq!(keys.pad_state(500, &scales), PadState::Off);
    }
}
