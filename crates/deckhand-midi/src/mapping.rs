//! Note/CC layout of the reference surface.
//!
//! Pads and knob touch sensors send notes, knobs and buttons send CCs on
//! the configured channel. Lights are set with the same numbers: the
//! velocity/value is the palette index, and a blinking light gets a
//! second message on the slow or fast blink channel carrying the blink
//! colour. Display cells are written with one SysEx frame each.

use crate::message::MidiMessage;
use deckhand_core::config::MidiSettings;
use deckhand_core::display::{LightId, LightInfo};
use deckhand_core::surface::{ButtonId, ControlEvent, SurfaceLayout};
use std::collections::HashMap;

/// SysEx header of a display cell write (non-commercial manufacturer id)
pub const TEXT_HEADER: [u8; 4] = [0x7D, 0x44, 0x48, 0x10];

/// Blink channel offsets from the base channel
const BLINK_SLOW: u8 = 1;
const BLINK_FAST: u8 = 2;

/// First CC of the upper button row
const ROW1_CC_BASE: u8 = 102;
/// First CC of the lower button row
const ROW2_CC_BASE: u8 = 20;
/// First CC of the scene buttons
const SCENE_CC_BASE: u8 = 36;

const BUTTON_CCS: [(ButtonId, u8); 23] = [
    (ButtonId::Shift, 49),
    (ButtonId::Select, 48),
    (ButtonId::Play, 85),
    (ButtonId::Record, 86),
    (ButtonId::Stop, 29),
    (ButtonId::Up, 46),
    (ButtonId::Down, 47),
    (ButtonId::Left, 44),
    (ButtonId::Right, 45),
    (ButtonId::OctaveUp, 55),
    (ButtonId::OctaveDown, 54),
    (ButtonId::Volume, 114),
    (ButtonId::Pan, 115),
    (ButtonId::Sends, 116),
    (ButtonId::Track, 112),
    (ButtonId::Device, 110),
    (ButtonId::Transport, 111),
    (ButtonId::ScaleSettings, 58),
    (ButtonId::Session, 51),
    (ButtonId::Note, 50),
    (ButtonId::Drum, 53),
    (ButtonId::Sequencer, 56),
    (ButtonId::StepEdit, 60),
];

/// Translation between MIDI and surface events/lights.
#[derive(Debug, Clone)]
pub struct SurfaceMapping {
    channel: u8,
    pad_note_base: u8,
    knob_touch_note_base: u8,
    knob_cc_base: u8,
    layout: SurfaceLayout,
    cc_to_button: HashMap<u8, ButtonId>,
    button_to_cc: HashMap<ButtonId, u8>,
}

impl SurfaceMapping {
    pub fn new(settings: &MidiSettings, layout: &SurfaceLayout) -> Self {
        let mut button_to_cc: HashMap<ButtonId, u8> = BUTTON_CCS.iter().copied().collect();
        for i in 0..layout.row_buttons.min(8) as u8 {
            button_to_cc.insert(ButtonId::Row1(i), ROW1_CC_BASE + i);
            button_to_cc.insert(ButtonId::Row2(i), ROW2_CC_BASE + i);
        }
        for i in 0..layout.scene_buttons.min(8) as u8 {
            button_to_cc.insert(ButtonId::Scene(i), SCENE_CC_BASE + i);
        }
        let cc_to_button = button_to_cc.iter().map(|(id, cc)| (*cc, *id)).collect();

        Self {
            channel: settings.channel & 0x0F,
            pad_note_base: settings.pad_note_base,
            knob_touch_note_base: settings.knob_touch_note_base,
            knob_cc_base: settings.knob_cc_base,
            layout: layout.clone(),
            cc_to_button,
            button_to_cc,
        }
    }

    /// Channel the surface talks on
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// CC number of a button
    pub fn button_cc(&self, id: ButtonId) -> Option<u8> {
        self.button_to_cc.get(&id).copied()
    }

    /// Decode one incoming message. Messages on other channels and
    /// unmapped numbers yield `None`.
    pub fn decode(&self, message: &MidiMessage) -> Option<ControlEvent> {
        match *message {
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } if channel == self.channel => self.decode_note(note, velocity),
            MidiMessage::NoteOff { channel, note } if channel == self.channel => {
                self.decode_note(note, 0)
            }
            MidiMessage::ControlChange {
                channel,
                controller,
                value,
            } if channel == self.channel => self.decode_cc(controller, value),
            MidiMessage::PitchBend { channel, value } if channel == self.channel => {
                Some(ControlEvent::PitchBend { value })
            }
            MidiMessage::ChannelAftertouch { channel, pressure } if channel == self.channel => {
                Some(ControlEvent::ChannelPressure { pressure })
            }
            MidiMessage::PolyAftertouch {
                channel,
                note,
                pressure,
            } if channel == self.channel => self
                .pad_index(note)
                .map(|index| ControlEvent::PolyPressure { index, pressure }),
            _ => None,
        }
    }

    fn pad_index(&self, note: u8) -> Option<usize> {
        let index = (note as usize).checked_sub(self.pad_note_base as usize)?;
        (index < self.layout.grid_size()).then_some(index)
    }

    fn decode_note(&self, note: u8, velocity: u8) -> Option<ControlEvent> {
        if let Some(index) = self.pad_index(note) {
            return Some(ControlEvent::Pad { index, velocity });
        }
        let index = (note as usize).checked_sub(self.knob_touch_note_base as usize)?;
        (index < self.layout.knobs).then_some(ControlEvent::KnobTouch {
            index,
            touched: velocity > 0,
        })
    }

    fn decode_cc(&self, controller: u8, value: u8) -> Option<ControlEvent> {
        if let Some(index) = (controller as usize).checked_sub(self.knob_cc_base as usize) {
            if index < self.layout.knobs {
                return Some(ControlEvent::Knob {
                    index,
                    raw: value as u16,
                });
            }
        }
        let id = *self.cc_to_button.get(&controller)?;
        Some(ControlEvent::Button {
            id,
            pressed: value > 0,
            velocity: value,
        })
    }

    /// Messages that set one light.
    pub fn encode_light(&self, id: LightId, light: LightInfo) -> Vec<MidiMessage> {
        match id {
            LightId::Pad(index) if index < self.layout.grid_size() => {
                let note = self.pad_note_base.saturating_add(index as u8);
                self.with_blink(light, |channel, value| MidiMessage::NoteOn {
                    channel,
                    note,
                    velocity: value,
                })
            }
            LightId::Button(button) => match self.button_cc(button) {
                Some(controller) => self.with_blink(light, |channel, value| {
                    MidiMessage::ControlChange {
                        channel,
                        controller,
                        value,
                    }
                }),
                None => Vec::new(),
            },
            LightId::Knob(index) if index < self.layout.knobs => vec![MidiMessage::ControlChange {
                channel: self.channel,
                controller: self.knob_cc_base.saturating_add(index as u8),
                value: light.color.min(127),
            }],
            _ => Vec::new(),
        }
    }

    fn with_blink<F>(&self, light: LightInfo, make: F) -> Vec<MidiMessage>
    where
        F: Fn(u8, u8) -> MidiMessage,
    {
        let mut messages = vec![make(self.channel, light.color & 0x7F)];
        if light.is_blinking() {
            let offset = if light.fast { BLINK_FAST } else { BLINK_SLOW };
            messages.push(make((self.channel + offset) & 0x0F, light.blink_color & 0x7F));
        }
        messages
    }

    /// SysEx frame that writes one display cell, padded to the cell width.
    /// Characters outside 7-bit ASCII are shown as `?`.
    pub fn encode_text(&self, row: usize, cell: usize, text: &str) -> MidiMessage {
        let width = self.layout.cell_width;
        let mut payload = Vec::with_capacity(TEXT_HEADER.len() + 2 + width);
        payload.extend_from_slice(&TEXT_HEADER);
        payload.push((row & 0x7F) as u8);
        payload.push((cell & 0x7F) as u8);

        let mut chars: Vec<u8> = text
            .chars()
            .take(width)
            .map(|c| if c.is_ascii() && !c.is_ascii_control() { c as u8 } else { b'?' })
            .collect();
        chars.resize(width, b' ');
        payload.extend(chars);
        MidiMessage::SysEx(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deckhand_core::display::colors;

    fn mapping() -> SurfaceMapping {
        SurfaceMapping::new(&MidiSettings::default(), &SurfaceLayout::default())
    }

    #[test]
    fn test_every_button_has_a_unique_cc() {
        let mapping = mapping();
        let layout = SurfaceLayout::default();
        let mut seen = std::collections::HashSet::new();
        for button in layout.buttons() {
            let cc = mapping.button_cc(button).unwrap();
            assert!(seen.insert(cc), "{:?} reuses CC {}", button, cc);
            assert!(!(71..79).contains(&cc), "{:?} collides with knobs", button);
        }
    }

    #[test]
    fn test_decode_pads_and_touch() {
        let mapping = mapping();
        assert_eq!(
            mapping.decode(&MidiMessage::NoteOn {
                channel: 0,
                note: 36,
                velocity: 90
            }),
            Some(ControlEvent::Pad { index: 0, velocity: 90 })
        );
        assert_eq!(
            mapping.decode(&MidiMessage::NoteOff { channel: 0, note: 99 }),
            Some(ControlEvent::Pad { index: 63, velocity: 0 })
        );
        let outside = MidiMessage::NoteOn {
            channel: 0,
            note: 100,
            velocity: 1,
        };
        assert_eq!(mapping.decode(&outside), None);
        assert_eq!(
            mapping.decode(&MidiMessage::NoteOn {
                channel: 0,
                note: 3,
                velocity: 127
            }),
            Some(ControlEvent::KnobTouch {
                index: 3,
                touched: true
            })
        );
    }

    #[test]
    fn test_decode_ccs() {
        let mapping = mapping();
        let cc = |controller, value| MidiMessage::ControlChange {
            channel: 0,
            controller,
            value,
        };
        assert_eq!(mapping.decode(&cc(72, 127)), Some(ControlEvent::Knob { index: 1, raw: 127 }));
        assert_eq!(
            mapping.decode(&cc(85, 127)),
            Some(ControlEvent::Button {
                id: ButtonId::Play,
                pressed: true,
                velocity: 127
            })
        );
        assert_eq!(
            mapping.decode(&cc(38, 0)),
            Some(ControlEvent::Button {
                id: ButtonId::Scene(2),
                pressed: false,
                velocity: 0
            })
        );
        assert_eq!(mapping.decode(&cc(1, 64)), None);
    }

    #[test]
    fn test_other_channels_ignored() {
        let mapping = mapping();
        assert_eq!(
            mapping.decode(&MidiMessage::NoteOn {
                channel: 5,
                note: 36,
                velocity: 90
            }),
            None
        );
        assert_eq!(
            mapping.decode(&MidiMessage::PolyAftertouch {
                channel: 0,
                note: 37,
                pressure: 40
            }),
            Some(ControlEvent::PolyPressure { index: 1, pressure: 40 })
        );
    }

    #[test]
    fn test_blinking_pad_uses_blink_channel() {
        let mapping = mapping();
        let blinking = LightInfo::blinking(colors::RED, colors::DARK_GRAY, true);
        let messages = mapping.encode_light(LightId::Pad(2), blinking);
        assert_eq!(
            messages,
            vec![
                MidiMessage::NoteOn {
                    channel: 0,
                    note: 38,
                    velocity: colors::RED
                },
                MidiMessage::NoteOn {
                    channel: 2,
                    note: 38,
                    velocity: colors::DARK_GRAY
                },
            ]
        );
        let solid = mapping.encode_light(
            LightId::Button(ButtonId::Play),
            LightInfo::solid(colors::GREEN),
        );
        assert_eq!(
            solid,
            vec![MidiMessage::ControlChange {
                channel: 0,
                controller: 85,
                value: colors::GREEN
            }]
        );
    }

    #[test]
    fn test_text_frame_padded_ascii() {
        let mapping = mapping();
        let frame = mapping.encode_text(1, 3, "Vol\u{e9}");
        let mut expected = TEXT_HEADER.to_vec();
        expected.extend_from_slice(&[1, 3]);
        expected.extend_from_slice(b"Vol?    ");
        assert_eq!(frame, MidiMessage::SysEx(expected));
    }
}
