//! MIDI wire format.

/// SysEx start byte
pub const SYSEX_START: u8 = 0xF0;
/// SysEx end byte
pub const SYSEX_END: u8 = 0xF7;

/// Centre of the 14-bit pitch bend range
pub const PITCH_BEND_CENTER: u16 = 8192;

/// A MIDI message as exchanged with a surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note on (channel 0-15, note 0-127, velocity 1-127)
    NoteOn { channel: u8, note: u8, velocity: u8 },
    /// Note off (also decoded from note on with velocity 0)
    NoteOff { channel: u8, note: u8 },
    /// Control change
    ControlChange { channel: u8, controller: u8, value: u8 },
    /// Pitch bend, raw 14-bit value (8192 = centre)
    PitchBend { channel: u8, value: u16 },
    /// Channel pressure
    ChannelAftertouch { channel: u8, pressure: u8 },
    /// Per-note pressure
    PolyAftertouch { channel: u8, note: u8, pressure: u8 },
    /// Program change
    ProgramChange { channel: u8, program: u8 },
    /// System exclusive; payload without the framing bytes
    SysEx(Vec<u8>),
}

impl MidiMessage {
    /// Parse raw MIDI bytes. Returns `None` for truncated or unsupported
    /// messages (clock, active sensing, ...).
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let (&status, data) = bytes.split_first()?;

        if status == SYSEX_START {
            let end = data.iter().position(|b| *b == SYSEX_END)?;
            return Some(MidiMessage::SysEx(data[..end].to_vec()));
        }

        let channel = status & 0x0F;
        match status & 0xF0 {
            0x90 if data.len() >= 2 => {
                if data[1] == 0 {
                    Some(MidiMessage::NoteOff {
                        channel,
                        note: data[0],
                    })
                } else {
                    Some(MidiMessage::NoteOn {
                        channel,
                        note: data[0],
                        velocity: data[1],
                    })
                }
            }
            0x80 if data.len() >= 2 => Some(MidiMessage::NoteOff {
                channel,
                note: data[0],
            }),
            0xA0 if data.len() >= 2 => Some(MidiMessage::PolyAftertouch {
                channel,
                note: data[0],
                pressure: data[1],
            }),
            0xB0 if data.len() >= 2 => Some(MidiMessage::ControlChange {
                channel,
                controller: data[0],
                value: data[1],
            }),
            0xC0 if !data.is_empty() => Some(MidiMessage::ProgramChange {
                channel,
                program: data[0],
            }),
            0xD0 if !data.is_empty() => Some(MidiMessage::ChannelAftertouch {
                channel,
                pressure: data[0],
            }),
            0xE0 if data.len() >= 2 => {
                // LSB first
                let value = ((data[1] as u16 & 0x7F) << 7) | (data[0] as u16 & 0x7F);
                Some(MidiMessage::PitchBend { channel, value })
            }
            _ => None,
        }
    }

    /// Convert to raw MIDI bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => vec![0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
            MidiMessage::NoteOff { channel, note } => vec![0x80 | (channel & 0x0F), note & 0x7F, 0],
            MidiMessage::ControlChange {
                channel,
                controller,
                value,
            } => vec![0xB0 | (channel & 0x0F), controller & 0x7F, value & 0x7F],
            MidiMessage::PitchBend { channel, value } => {
                let value = (*value).min(16383);
                vec![0xE0 | (channel & 0x0F), (value & 0x7F) as u8, (value >> 7) as u8]
            }
            MidiMessage::ChannelAftertouch { channel, pressure } => {
                vec![0xD0 | (channel & 0x0F), pressure & 0x7F]
            }
            MidiMessage::PolyAftertouch {
                channel,
                note,
                pressure,
            } => vec![0xA0 | (channel & 0x0F), note & 0x7F, pressure & 0x7F],
            MidiMessage::ProgramChange { channel, program } => {
                vec![0xC0 | (channel & 0x0F), program & 0x7F]
            }
            MidiMessage::SysEx(payload) => {
                let mut bytes = Vec::with_capacity(payload.len() + 2);
                bytes.push(SYSEX_START);
                bytes.extend(payload.iter().map(|b| b & 0x7F));
                bytes.push(SYSEX_END);
                bytes
            }
        }
    }

    /// Whether this is a SysEx frame
    pub fn is_sysex(&self) -> bool {
        matches!(self, MidiMessage::SysEx(_))
    }
}

/// Whether raw bytes hold a SysEx frame
pub fn is_sysex_bytes(bytes: &[u8]) -> bool {
    bytes.first() == Some(&SYSEX_START)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_on_zero_velocity_is_note_off() {
        assert_eq!(
            MidiMessage::from_bytes(&[0x91, 60, 0]),
            Some(MidiMessage::NoteOff { channel: 1, note: 60 })
        );
    }

    #[test]
    fn test_pitch_bend_is_14_bit() {
        let msg = MidiMessage::from_bytes(&[0xE0, 0x00, 0x40]);
        assert_eq!(
            msg,
            Some(MidiMessage::PitchBend {
                channel: 0,
                value: PITCH_BEND_CENTER
            })
        );
        let max = MidiMessage::PitchBend {
            channel: 2,
            value: 16383,
        };
        assert_eq!(max.to_bytes(), vec![0xE2, 0x7F, 0x7F]);
    }

    #[test]
    fn test_sysex_framing() {
        let msg = MidiMessage::SysEx(vec![0x7D, 0x10, 0x41]);
        let bytes = msg.to_bytes();
        assert_eq!(bytes, vec![0xF0, 0x7D, 0x10, 0x41, 0xF7]);
        assert!(is_sysex_bytes(&bytes));
        assert_eq!(MidiMessage::from_bytes(&bytes), Some(msg));
        // unterminated
        assert_eq!(MidiMessage::from_bytes(&[0xF0, 0x7D]), None);
    }

    #[test]
    fn test_truncated_and_realtime_ignored() {
        assert_eq!(MidiMessage::from_bytes(&[]), None);
        assert_eq!(MidiMessage::from_bytes(&[0x90, 60]), None);
        assert_eq!(MidiMessage::from_bytes(&[0xF8]), None);
    }

    #[test]
    fn test_channel_messages_bytes() {
        let cc = MidiMessage::ControlChange {
            channel: 0,
            controller: 71,
            value: 1,
        };
        assert_eq!(cc.to_bytes(), vec![0xB0, 71, 1]);
        assert_eq!(
            MidiMessage::from_bytes(&[0xD3, 99]),
            Some(MidiMessage::ChannelAftertouch {
                channel: 3,
                pressure: 99
            })
        );
        assert_eq!(
            MidiMessage::from_bytes(&[0xA0, 36, 12]),
            Some(MidiMessage::PolyAftertouch {
                channel: 0,
                note: 36,
                pressure: 12
            })
        );
    }
}
